//! Object model
//!
//! Everything a transform can produce is one of a closed set of variants.
//! Downstream code matches on the discriminant instead of probing types at
//! runtime.

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use prism_state::NodeRef;

/// Discriminant of an [`Object`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// The implicit root object
    Root,
    /// Raw or parsed data payload
    Data,
    /// A domain structure (molecule, geometry, ...)
    Structure,
    /// Selections over a structure
    StructureSelections,
    /// A visual representation derived from a structure
    Representation3D,
    /// A behavior with register/unregister lifecycle hooks
    Behavior,
}

/// Failure reported by a behavior lifecycle hook
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct BehaviorError(pub String);

/// Lifecycle contract for behavior objects
///
/// Both hooks are called exactly once per lifecycle transition. They must not
/// panic on missing prerequisites; failures are returned and reported by the
/// caller, never propagated into the surrounding tree update.
pub trait Behavior: Send + Sync {
    /// Called when the owning cell's object is created
    fn register(&self, reference: &NodeRef) -> Result<(), BehaviorError>;
    /// Called before the owning cell's object is removed or replaced
    fn unregister(&self) -> Result<(), BehaviorError>;
}

/// An object produced by evaluating a transform
///
/// Domain payloads are opaque to the engine and carried as JSON values; the
/// engine only ever inspects the discriminant.
#[derive(Clone)]
pub enum Object {
    Root,
    Data(serde_json::Value),
    Structure(serde_json::Value),
    StructureSelections(serde_json::Value),
    Representation3D(serde_json::Value),
    Behavior(Arc<dyn Behavior>),
}

impl Object {
    /// The discriminant of this object
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Root => ObjectKind::Root,
            Object::Data(_) => ObjectKind::Data,
            Object::Structure(_) => ObjectKind::Structure,
            Object::StructureSelections(_) => ObjectKind::StructureSelections,
            Object::Representation3D(_) => ObjectKind::Representation3D,
            Object::Behavior(_) => ObjectKind::Behavior,
        }
    }

    /// The behavior hooks, when this object carries them
    pub fn as_behavior(&self) -> Option<&Arc<dyn Behavior>> {
        match self {
            Object::Behavior(behavior) => Some(behavior),
            _ => None,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Behavior(_) => write!(f, "Object::Behavior(..)"),
            other => write!(f, "Object::{:?}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Behavior for Noop {
        fn register(&self, _reference: &NodeRef) -> Result<(), BehaviorError> {
            Ok(())
        }
        fn unregister(&self) -> Result<(), BehaviorError> {
            Ok(())
        }
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Object::Root.kind(), ObjectKind::Root);
        assert_eq!(
            Object::Data(serde_json::json!(1)).kind(),
            ObjectKind::Data
        );
        assert_eq!(
            Object::Behavior(Arc::new(Noop)).kind(),
            ObjectKind::Behavior
        );
    }

    #[test]
    fn test_as_behavior() {
        let obj = Object::Behavior(Arc::new(Noop));
        assert!(obj.as_behavior().is_some());
        assert!(Object::Root.as_behavior().is_none());
    }
}
