//! Transform definition registry
//!
//! Maps a transform kind to its evaluation logic and applicability
//! constraints. The registry is an explicit value constructed by the host and
//! handed to the reconciler; there is no ambient global registration.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::eval::Evaluate;
use crate::object::ObjectKind;

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No definition for this kind
    #[error("unknown transform kind: {0}")]
    UnknownKind(String),
    /// A definition for this kind already exists
    #[error("transform kind already registered: {0}")]
    DuplicateKind(String),
}

/// Definition of a transform kind
pub struct TransformDef {
    /// Unique kind name, referenced by tree nodes
    pub kind: String,
    /// Display name
    pub name: String,
    /// Accepted parent object kinds; empty means any
    pub from: Vec<ObjectKind>,
    /// Produced object kind
    pub to: ObjectKind,
    evaluator: Arc<dyn Evaluate>,
}

impl TransformDef {
    /// Create a new definition
    pub fn new(kind: impl Into<String>, evaluator: Arc<dyn Evaluate>) -> Self {
        let kind = kind.into();
        Self {
            name: kind.clone(),
            kind,
            from: Vec::new(),
            to: ObjectKind::Data,
            evaluator,
        }
    }

    /// Set the display name
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restrict accepted parent object kinds
    pub fn accepts(mut self, from: &[ObjectKind]) -> Self {
        self.from = from.to_vec();
        self
    }

    /// Declare the produced object kind
    pub fn produces(mut self, to: ObjectKind) -> Self {
        self.to = to;
        self
    }

    /// The evaluation logic
    pub fn evaluator(&self) -> &Arc<dyn Evaluate> {
        &self.evaluator
    }

    /// Check whether a parent object kind is an accepted input
    pub fn applicable_to(&self, parent: ObjectKind) -> bool {
        self.from.is_empty() || self.from.contains(&parent)
    }
}

/// Registry of transform definitions, keyed by kind
#[derive(Default)]
pub struct TransformRegistry {
    defs: HashMap<String, TransformDef>,
}

impl TransformRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition; kinds are unique
    pub fn register(&mut self, def: TransformDef) -> Result<(), RegistryError> {
        if self.defs.contains_key(&def.kind) {
            return Err(RegistryError::DuplicateKind(def.kind));
        }
        self.defs.insert(def.kind.clone(), def);
        Ok(())
    }

    /// Look up a definition
    pub fn get(&self, kind: &str) -> Option<&TransformDef> {
        self.defs.get(kind)
    }

    /// Look up a definition, failing on unknown kinds
    pub fn definition(&self, kind: &str) -> Result<&TransformDef, RegistryError> {
        self.defs
            .get(kind)
            .ok_or_else(|| RegistryError::UnknownKind(kind.to_string()))
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
