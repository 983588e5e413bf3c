//! Transform nodes
//!
//! A node is a declarative recipe: a transform kind plus its parameters,
//! attached under a parent whose produced object is the transform's input.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::reference::NodeRef;

/// Transform kind of the implicit tree root
pub const ROOT_KIND: &str = "root";

/// A single node of the state tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformNode {
    /// Unique reference of this node
    #[serde(rename = "ref")]
    pub reference: NodeRef,
    /// Parent reference; the root's parent is itself
    pub parent: NodeRef,
    /// Transform kind, resolved against the registry at evaluation time
    pub kind: String,
    /// Opaque transform parameters
    #[serde(default)]
    pub params: Value,
    /// Free-form tags for lookup and grouping
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Transient nodes are rebuilt per session and omitted from snapshots
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub transient: bool,
}

impl TransformNode {
    /// Create a new node
    pub fn new(reference: NodeRef, parent: NodeRef, kind: impl Into<String>) -> Self {
        Self {
            reference,
            parent,
            kind: kind.into(),
            params: Value::Null,
            tags: Vec::new(),
            transient: false,
        }
    }

    /// The implicit root node
    pub fn root() -> Self {
        let root = NodeRef::root();
        Self::new(root.clone(), root, ROOT_KIND)
    }

    /// Set parameters
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Set tags
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Mark as transient
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Check whether this node is the tree root
    pub fn is_root(&self) -> bool {
        self.reference == self.parent
    }
}
