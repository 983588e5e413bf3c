//! # prism_runtime - State Reconciler
//!
//! Turns an old tree + a new tree into a minimal, dependency-ordered
//! sequence of create/update/recreate/remove operations:
//! - Removals torn down deepest-first, before parents vanish
//! - Additions and updates evaluated strict parent-before-child
//! - Per-branch error isolation; sibling branches are unaffected
//! - Lifecycle events in exact evaluation order
//! - Behavior register/unregister tied to cell creation and removal

pub mod behavior_hook;
pub mod cancel;
pub mod cell;
pub mod events;
pub mod reconciler;

pub use behavior_hook::BehaviorTracker;
pub use cancel::CancelToken;
pub use cell::{Cell, CellStatus, CellStore};
pub use events::{ObjectCreated, ObjectRemoved, ObjectUpdated, UpdateAction};
pub use reconciler::{Reconciler, UpdateError, UpdateOptions, UpdateReport};

/// Prelude
pub mod prelude {
    pub use crate::behavior_hook::BehaviorTracker;
    pub use crate::cancel::CancelToken;
    pub use crate::cell::{Cell, CellStatus, CellStore};
    pub use crate::events::{ObjectCreated, ObjectRemoved, ObjectUpdated, UpdateAction};
    pub use crate::reconciler::{Reconciler, UpdateError, UpdateOptions, UpdateReport};
}
