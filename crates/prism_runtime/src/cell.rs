//! Cells
//!
//! A cell pairs a tree node with its runtime result: the last computed
//! object, an evaluation status, and display flags. Cells are owned by the
//! reconciler; everything else reads through accessors.

use std::collections::HashMap;
use std::sync::Arc;

use prism_state::NodeRef;
use prism_transform::Object;

/// Evaluation status of a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellStatus {
    /// Not evaluated yet, or skipped after an ancestor failed
    Pending,
    /// Last evaluation succeeded
    Ok,
    /// Last evaluation failed
    Error,
}

/// Runtime record for one tree node
#[derive(Clone, Debug)]
pub struct Cell {
    /// Last computed object, none while pending or errored
    pub object: Option<Arc<Object>>,
    /// Evaluation status
    pub status: CellStatus,
    /// Failure message when status is [`CellStatus::Error`]
    pub error: Option<String>,
    /// Hidden from display
    pub is_hidden: bool,
    /// Collapsed in tree views
    pub is_collapsed: bool,
    /// Decorative node, skipped by cascade deletion
    pub is_ghost: bool,
}

impl Cell {
    /// A cell awaiting its first evaluation
    pub fn pending() -> Self {
        Self {
            object: None,
            status: CellStatus::Pending,
            error: None,
            is_hidden: false,
            is_collapsed: false,
            is_ghost: false,
        }
    }

    /// A cell holding a computed object
    pub fn with_object(object: Arc<Object>) -> Self {
        Self {
            object: Some(object),
            status: CellStatus::Ok,
            ..Self::pending()
        }
    }
}

/// Table of cells, keyed by node reference
#[derive(Default)]
pub struct CellStore {
    cells: HashMap<NodeRef, Cell>,
}

impl CellStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cell
    pub fn get(&self, reference: &NodeRef) -> Option<&Cell> {
        self.cells.get(reference)
    }

    /// Check whether a cell exists
    pub fn contains(&self, reference: &NodeRef) -> bool {
        self.cells.contains_key(reference)
    }

    /// The computed object of a cell, if any
    pub fn object(&self, reference: &NodeRef) -> Option<Arc<Object>> {
        self.cells.get(reference).and_then(|c| c.object.clone())
    }

    /// Iterate over all cells
    pub fn iter(&self) -> impl Iterator<Item = (&NodeRef, &Cell)> {
        self.cells.iter()
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no cells exist
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn get_mut(&mut self, reference: &NodeRef) -> Option<&mut Cell> {
        self.cells.get_mut(reference)
    }

    pub(crate) fn insert(&mut self, reference: NodeRef, cell: Cell) {
        self.cells.insert(reference, cell);
    }

    pub(crate) fn remove(&mut self, reference: &NodeRef) -> Option<Cell> {
        self.cells.remove(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_cell() {
        let cell = Cell::pending();
        assert_eq!(cell.status, CellStatus::Pending);
        assert!(cell.object.is_none());
        assert!(!cell.is_hidden);
    }

    #[test]
    fn test_store_lifecycle() {
        let mut store = CellStore::new();
        let r = NodeRef::new("obj-1");

        store.insert(r.clone(), Cell::with_object(Arc::new(Object::Root)));
        assert!(store.contains(&r));
        assert_eq!(store.get(&r).unwrap().status, CellStatus::Ok);
        assert!(store.object(&r).is_some());

        store.remove(&r);
        assert!(!store.contains(&r));
    }
}
