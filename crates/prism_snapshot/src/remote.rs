//! Remote snapshot store
//!
//! Two endpoints, no authentication:
//! - `POST {server}/set?name=&description=` with a JSON body
//!   `{ name, description, playOnLoad, data }`
//! - `GET {url}` returning a `{ data: <payload> }` envelope
//!
//! Transport failures propagate to the caller; this client never retries.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use prism_runtime::{Reconciler, UpdateReport};

use crate::data::{set_snapshot, SnapshotData};
use crate::error::SnapshotError;

/// Client for a remote snapshot server
pub struct RemoteClient {
    client: Client,
}

impl RemoteClient {
    /// Create a client with sane timeouts
    pub fn new() -> Result<Self, SnapshotError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client })
    }

    /// Upload a payload to `{server}/set`
    ///
    /// The request carries no credentials and no referrer.
    pub async fn upload(
        &self,
        server_url: &str,
        name: &str,
        description: &str,
        play_on_load: bool,
        data: &SnapshotData,
    ) -> Result<(), SnapshotError> {
        let url = set_endpoint(server_url, name, description)?;
        let body = json!({
            "name": name,
            "description": description,
            "playOnLoad": play_on_load,
            "data": data,
        });
        self.client
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Fetch a `{ data }` envelope and apply the payload
    pub async fn fetch(
        &self,
        reconciler: &mut Reconciler,
        url: &str,
    ) -> Result<UpdateReport, SnapshotError> {
        #[derive(Deserialize)]
        struct Envelope {
            data: SnapshotData,
        }

        let response = self.client.get(url).send().await?.error_for_status()?;
        let envelope: Envelope = response.json().await?;
        Ok(set_snapshot(reconciler, envelope.data).await?)
    }
}

fn set_endpoint(server_url: &str, name: &str, description: &str) -> Result<Url, SnapshotError> {
    let base = if server_url.ends_with('/') {
        format!("{}set", server_url)
    } else {
        format!("{}/set", server_url)
    };
    let mut url = Url::parse(&base)?;
    url.query_pairs_mut()
        .append_pair("name", name)
        .append_pair("description", description);
    Ok(url)
}
