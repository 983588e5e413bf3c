//! # prism_state - Transform Tree
//!
//! The declarative state tree of a Prism session:
//! - String node references with atomic generation
//! - Immutable tree values (mutations return a new tree)
//! - Add / delete / reparent with structural validation
//! - Pre-order and post-order subtree traversal

pub mod node;
pub mod reference;
pub mod tree;

pub use node::TransformNode;
pub use reference::{NodeRef, RefGenerator, ROOT_REF};
pub use tree::{StateTree, TreeError};

/// Prelude
pub mod prelude {
    pub use crate::node::TransformNode;
    pub use crate::reference::{NodeRef, RefGenerator, ROOT_REF};
    pub use crate::tree::{StateTree, TreeError};
}
