//! Lifecycle events
//!
//! Published by the reconciler, in exact evaluation order, for every cell
//! whose object is created, removed or replaced.

use std::sync::Arc;

use prism_state::NodeRef;
use prism_transform::Object;

/// How an existing cell's object was replaced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateAction {
    /// The old object was discarded and a new one computed
    Recreate,
    /// The object was re-computed in place, dependents kept
    InPlace,
}

/// A cell's object was computed for the first time
#[derive(Clone, Debug)]
pub struct ObjectCreated {
    pub reference: NodeRef,
    pub object: Arc<Object>,
}

/// A cell was destroyed together with its node
#[derive(Clone, Debug)]
pub struct ObjectRemoved {
    pub reference: NodeRef,
    /// The object the cell held, if it was ever evaluated
    pub object: Option<Arc<Object>>,
}

/// An existing cell's object was replaced
#[derive(Clone, Debug)]
pub struct ObjectUpdated {
    pub reference: NodeRef,
    pub action: UpdateAction,
    pub old: Option<Arc<Object>>,
    pub new: Option<Arc<Object>>,
}
