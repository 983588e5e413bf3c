//! Error types for the snapshot subsystem

use thiserror::Error;

use prism_runtime::UpdateError;

/// Snapshot subsystem errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The serialized tree failed structural validation
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    /// The payload was written by a newer format version
    #[error("snapshot version {found} is newer than supported version {supported}")]
    VersionMismatch { found: u32, supported: u32 },
    /// A container member is missing or unreadable
    #[error("archive corrupt: {0}")]
    ArchiveCorrupt(String),
    /// Upload or fetch failed at the transport level
    #[error("remote request failed: {0}")]
    RemoteRequestFailed(#[from] reqwest::Error),
    /// A server URL could not be parsed
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Payload (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Applying the restored tree failed
    #[error(transparent)]
    Update(#[from] UpdateError),
}
