//! Node references
//!
//! Every node in a state tree is addressed by a unique string reference.
//! References are cheap to clone and stable across serialization.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Reference of the tree root. The root's parent is itself.
pub const ROOT_REF: &str = "-=root=-";

/// A unique reference to a node in a state tree
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRef(Box<str>);

impl NodeRef {
    /// Create a reference from a raw string
    pub fn new(raw: impl Into<Box<str>>) -> Self {
        Self(raw.into())
    }

    /// The root reference
    pub fn root() -> Self {
        Self(ROOT_REF.into())
    }

    /// Check whether this is the root reference
    pub fn is_root(&self) -> bool {
        &*self.0 == ROOT_REF
    }

    /// Get the raw string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The generation serial of a generated reference, if it is one
    pub(crate) fn serial(&self) -> Option<u64> {
        self.0.strip_prefix("obj-").and_then(|n| n.parse().ok())
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({:?})", self.0)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeRef {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Thread-safe generator for unique node references
pub struct RefGenerator {
    next: AtomicU64,
}

impl RefGenerator {
    /// Create a new generator
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Generate the next unique reference
    pub fn next(&self) -> NodeRef {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        NodeRef::new(format!("obj-{}", n))
    }
}

impl Default for RefGenerator {
    fn default() -> Self {
        Self::new()
    }
}
