//! Command dispatch
//!
//! A command is a request/response pair: exactly one handler serves each
//! command name, and the issuing caller receives that handler's result.
//! Registering a second handler for the same name is a configuration error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

/// Command dispatch errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No handler registered for the command name
    #[error("no handler registered for command '{0}'")]
    NoHandler(String),
    /// The command name already has a handler
    #[error("command '{0}' already has a handler")]
    DuplicateHandler(String),
    /// The handler itself failed
    #[error("command failed: {0}")]
    Failed(String),
}

/// Handler serving one command name
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, payload: Value) -> Result<Value, CommandError>;
}

/// Command bus mapping command names to their single handler
#[derive(Default)]
pub struct CommandBus {
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
}

impl CommandBus {
    /// Create a new command bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a command name
    pub fn register(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<(), CommandError> {
        let name = name.into();
        let mut handlers = self.handlers.write();
        if handlers.contains_key(&name) {
            return Err(CommandError::DuplicateHandler(name));
        }
        handlers.insert(name, handler);
        Ok(())
    }

    /// Remove the handler for a command name
    pub fn unregister(&self, name: &str) {
        self.handlers.write().remove(name);
    }

    /// Dispatch a command, returning the single handler's result
    pub async fn dispatch(&self, name: &str, payload: Value) -> Result<Value, CommandError> {
        let handler = self
            .handlers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CommandError::NoHandler(name.to_string()))?;
        handler.handle(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Double;

    #[async_trait]
    impl CommandHandler for Double {
        async fn handle(&self, payload: Value) -> Result<Value, CommandError> {
            let n = payload
                .as_i64()
                .ok_or_else(|| CommandError::Failed("expected a number".to_string()))?;
            Ok(json!(n * 2))
        }
    }

    #[tokio::test]
    async fn test_dispatch_returns_handler_result() {
        let bus = CommandBus::new();
        bus.register("double", Arc::new(Double)).unwrap();

        let out = bus.dispatch("double", json!(21)).await.unwrap();
        assert_eq!(out, json!(42));
    }

    #[tokio::test]
    async fn test_missing_handler() {
        let bus = CommandBus::new();
        assert_eq!(
            bus.dispatch("nope", Value::Null).await.unwrap_err(),
            CommandError::NoHandler("nope".to_string())
        );
    }

    #[test]
    fn test_duplicate_handler_rejected() {
        let bus = CommandBus::new();
        bus.register("double", Arc::new(Double)).unwrap();
        assert_eq!(
            bus.register("double", Arc::new(Double)).unwrap_err(),
            CommandError::DuplicateHandler("double".to_string())
        );
    }

    #[tokio::test]
    async fn test_handler_failure_propagates() {
        let bus = CommandBus::new();
        bus.register("double", Arc::new(Double)).unwrap();
        assert!(matches!(
            bus.dispatch("double", json!("not a number")).await,
            Err(CommandError::Failed(_))
        ));
    }
}
