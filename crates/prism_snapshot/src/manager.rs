//! Snapshot manager
//!
//! An ordered, navigable list of named snapshot entries. At most one entry
//! is current; list operations are synchronous and totally ordered by call
//! sequence.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::data::SnapshotData;

/// Neighbor direction for [`SnapshotManager::move_entry`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Toward the front of the list
    Backward,
    /// Toward the back of the list
    Forward,
}

/// One stored snapshot
#[derive(Clone, Debug)]
pub struct SnapshotEntry {
    /// Identity, assigned by the manager on add
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Creation or last-replace time (Unix seconds)
    pub timestamp: u64,
    /// Start playback when this entry is applied
    pub play_on_load: bool,
    /// The captured payload
    pub data: SnapshotData,
    /// Optional player/camera metadata
    pub metadata: Option<Value>,
}

impl SnapshotEntry {
    /// Create an entry; the manager assigns its id on add
    pub fn new(name: impl Into<String>, data: SnapshotData) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: String::new(),
            timestamp: unix_now(),
            play_on_load: false,
            data,
            metadata: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Start playback when applied
    pub fn with_play_on_load(mut self) -> Self {
        self.play_on_load = true;
        self
    }

    /// Attach player/camera metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Ordered snapshot list with a current entry
#[derive(Default)]
pub struct SnapshotManager {
    entries: Vec<SnapshotEntry>,
    current: Option<String>,
    next_serial: u64,
}

impl SnapshotManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and make it current; returns the assigned id
    pub fn add(&mut self, mut entry: SnapshotEntry) -> String {
        self.next_serial += 1;
        if entry.id.is_empty() {
            entry.id = format!("snap-{}", self.next_serial);
        }
        let id = entry.id.clone();
        self.entries.push(entry);
        self.current = Some(id.clone());
        id
    }

    /// Remove an entry by id
    pub fn remove(&mut self, id: &str) -> Option<SnapshotEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        if self.current.as_deref() == Some(id) {
            self.current = None;
        }
        Some(self.entries.remove(index))
    }

    /// Swap an entry with its neighbor; no-op at a list boundary
    pub fn move_entry(&mut self, id: &str, direction: Direction) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let target = match direction {
            Direction::Backward if index > 0 => index - 1,
            Direction::Forward if index + 1 < self.entries.len() => index + 1,
            _ => return false,
        };
        self.entries.swap(index, target);
        true
    }

    /// Overwrite an entry's payload and timestamp, keeping position and id
    pub fn replace(&mut self, id: &str, data: SnapshotData) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.data = data;
                entry.timestamp = unix_now();
                true
            }
            None => false,
        }
    }

    /// Drop every entry and clear the current id
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
    }

    /// Mark an entry current and return its payload
    pub fn set_current(&mut self, id: &str) -> Option<&SnapshotData> {
        let entry = self.entries.iter().find(|e| e.id == id)?;
        self.current = Some(entry.id.clone());
        self.entries.iter().find(|e| e.id == id).map(|e| &e.data)
    }

    /// The current entry's id
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The current entry
    pub fn current(&self) -> Option<&SnapshotEntry> {
        let id = self.current.as_deref()?;
        self.entries.iter().find(|e| e.id == id)
    }

    /// Advance to the entry after the current one (or the first), mark it
    /// current and return it
    pub fn next(&mut self) -> Option<&SnapshotEntry> {
        let index = match self.current_index() {
            Some(i) if i + 1 < self.entries.len() => i + 1,
            Some(_) => return None,
            None if !self.entries.is_empty() => 0,
            None => return None,
        };
        self.current = Some(self.entries[index].id.clone());
        self.entries.get(index)
    }

    /// Step back to the entry before the current one, mark it current and
    /// return it
    pub fn previous(&mut self) -> Option<&SnapshotEntry> {
        let index = match self.current_index() {
            Some(i) if i > 0 => i - 1,
            _ => return None,
        };
        self.current = Some(self.entries[index].id.clone());
        self.entries.get(index)
    }

    /// All entries, in order
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Look up an entry by id
    pub fn get(&self, id: &str) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn current_index(&self) -> Option<usize> {
        let id = self.current.as_deref()?;
        self.entries.iter().position(|e| e.id == id)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
