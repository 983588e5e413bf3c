//! Evaluation contract
//!
//! A transform's evaluation is an opaque, possibly long-running operation.
//! It sees only its declared inputs: the node, the parent's current object
//! and the node's own previous object.

use async_trait::async_trait;
use thiserror::Error;

use prism_state::TransformNode;

use crate::object::{Object, ObjectKind};
use crate::registry::RegistryError;

/// Evaluation failure, recorded on the node's cell
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// The transform itself failed
    #[error("evaluation failed: {0}")]
    Failed(String),
    /// The parent object is not an accepted input for this transform
    #[error("transform '{kind}' cannot take {found:?} as input")]
    IncompatibleInput { kind: String, found: ObjectKind },
    /// The node's kind is not in the registry
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Declared inputs of one evaluation
pub struct EvalContext<'a> {
    /// The node being evaluated
    pub node: &'a TransformNode,
    /// The parent cell's current object
    pub parent: &'a Object,
    /// This node's previous object, for in-place updates
    pub previous: Option<&'a Object>,
}

/// Evaluation logic of a transform kind
///
/// Must be pure with respect to anything outside the context.
#[async_trait]
pub trait Evaluate: Send + Sync {
    async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<Object, EvalError>;
}
