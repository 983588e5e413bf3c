//! # prism_snapshot - Snapshot Persistence
//!
//! Capture, store, transmit and restore complete session states:
//! - Ordered, navigable snapshot list with one current entry
//! - Tree + cell-flag serialization with round-trip guarantees
//! - Plain JSON export or bundled archives with binary assets
//! - Remote upload/fetch against a snapshot server

pub mod archive;
pub mod data;
pub mod error;
pub mod manager;
pub mod remote;

pub use archive::{export_to_file, open_file, pack_archive, unpack_archive};
pub use data::{get_snapshot, set_snapshot, SnapshotData, SnapshotNode, SnapshotOptions, FORMAT_VERSION};
pub use error::SnapshotError;
pub use manager::{Direction, SnapshotEntry, SnapshotManager};
pub use remote::RemoteClient;

/// Prelude
pub mod prelude {
    pub use crate::archive::{export_to_file, open_file, pack_archive, unpack_archive};
    pub use crate::data::{
        get_snapshot, set_snapshot, SnapshotData, SnapshotNode, SnapshotOptions,
    };
    pub use crate::error::SnapshotError;
    pub use crate::manager::{Direction, SnapshotEntry, SnapshotManager};
    pub use crate::remote::RemoteClient;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use async_trait::async_trait;
    use prism_event::EventBus;
    use prism_runtime::Reconciler;
    use prism_transform::{
        EvalContext, EvalError, Evaluate, Object, ObjectKind, TransformDef, TransformRegistry,
    };

    pub use serde_json::Value;

    struct DataEval;

    #[async_trait]
    impl Evaluate for DataEval {
        async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<Object, EvalError> {
            Ok(Object::Data(ctx.node.params.clone()))
        }
    }

    struct StructureEval;

    #[async_trait]
    impl Evaluate for StructureEval {
        async fn evaluate(&self, ctx: EvalContext<'_>) -> Result<Object, EvalError> {
            Ok(Object::Structure(ctx.node.params.clone()))
        }
    }

    /// A reconciler over a minimal registry, for round-trip tests
    pub fn runtime() -> Reconciler {
        let mut registry = TransformRegistry::new();
        registry
            .register(TransformDef::new("data", Arc::new(DataEval)))
            .unwrap();
        registry
            .register(
                TransformDef::new("structure", Arc::new(StructureEval))
                    .produces(ObjectKind::Structure),
            )
            .unwrap();
        Reconciler::new(Arc::new(registry), Arc::new(EventBus::new()))
    }
}
