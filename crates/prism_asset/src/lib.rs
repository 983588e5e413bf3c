//! # prism_asset - Asset Registry
//!
//! Binary side-assets referenced by transform parameters (structure files,
//! volumes, textures). The registry is shared between the domain layer and
//! the snapshot packager; snapshot restore only ever inserts, never deletes.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Metadata of one registered asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMeta {
    /// Id unique within the registry
    pub id: String,
    /// Logical filename, used when unpacking to disk
    pub name: String,
}

impl AssetMeta {
    /// Create new metadata
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Registry of binary assets, in insertion order
///
/// Interior locking keeps access `&self` so the registry can be shared via
/// `Arc` across the runtime and the snapshot subsystem.
#[derive(Default)]
pub struct AssetRegistry {
    entries: RwLock<Vec<(AssetMeta, Arc<[u8]>)>>,
}

impl AssetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch an asset's bytes by id
    pub fn get(&self, id: &str) -> Option<Arc<[u8]>> {
        self.entries
            .read()
            .iter()
            .find(|(meta, _)| meta.id == id)
            .map(|(_, bytes)| bytes.clone())
    }

    /// Register an asset; an existing entry with the same id is replaced in
    /// place, keeping its position
    pub fn set(&self, meta: AssetMeta, bytes: impl Into<Arc<[u8]>>) {
        let bytes = bytes.into();
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|(m, _)| m.id == meta.id) {
            *entry = (meta, bytes);
        } else {
            entries.push((meta, bytes));
        }
    }

    /// Snapshot of all entries, in registry order
    pub fn entries(&self) -> Vec<(AssetMeta, Arc<[u8]>)> {
        self.entries.read().clone()
    }

    /// Number of registered assets
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Registry handle shared across subsystems
pub type SharedAssets = Arc<AssetRegistry>;
