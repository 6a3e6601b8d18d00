//! Tool invocation capability — the only doorway to external systems.
//!
//! The dispatcher needs call/result semantics and nothing else; connection
//! lifecycle (connect, list capabilities, call, disconnect) belongs to the
//! collaborator behind `ToolInvoker` and must be scoped to a single call,
//! released even on failure. No retries happen at this layer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Tool transport errors. Captured by the dispatcher as an `error`
/// execution outcome — never re-raised into the workflow.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("Invalid tool name format: {0} (expected service.method)")]
    InvalidToolName(String),

    #[error("Unknown tool service: {0}")]
    UnknownService(String),

    #[error("Tool call failed: {0}")]
    Transport(String),
}

/// External tool-invocation collaborator contract.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke `tool` (in `service.method` form) with assembled arguments.
    async fn invoke(&self, tool: &str, arguments: Map<String, Value>)
    -> Result<Value, InvokeError>;
}

/// One backing service (e.g. "gmail") that handles its own methods.
#[async_trait]
pub trait ToolService: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self, method: &str, arguments: Map<String, Value>)
    -> Result<Value, InvokeError>;
}

/// Split a `service.method` tool name.
pub fn split_tool_name(tool: &str) -> Result<(&str, &str), InvokeError> {
    tool.split_once('.')
        .filter(|(service, method)| !service.is_empty() && !method.is_empty())
        .ok_or_else(|| InvokeError::InvalidToolName(tool.to_string()))
}

/// Routes tool calls to registered services by name.
///
/// Services are registered at startup; each `invoke` looks up the service,
/// drops the registry lock, and delegates — the service connection is the
/// service's own concern and lives only for the call.
pub struct ToolRouter {
    services: RwLock<HashMap<String, Arc<dyn ToolService>>>,
}

impl ToolRouter {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
        }
    }

    /// Register a service under its own name.
    pub async fn register(&self, service: Arc<dyn ToolService>) {
        let name = service.name().to_string();
        self.services.write().await.insert(name.clone(), service);
        tracing::debug!("Registered tool service: {}", name);
    }

    /// Check if a service is registered.
    pub async fn has(&self, name: &str) -> bool {
        self.services.read().await.contains_key(name)
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolInvoker for ToolRouter {
    async fn invoke(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, InvokeError> {
        let (service_name, method) = split_tool_name(tool)?;
        let service = {
            let services = self.services.read().await;
            services
                .get(service_name)
                .cloned()
                .ok_or_else(|| InvokeError::UnknownService(service_name.to_string()))?
        };
        service.call(method, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoService;

    #[async_trait]
    impl ToolService for EchoService {
        fn name(&self) -> &str {
            "echo"
        }

        async fn call(
            &self,
            method: &str,
            arguments: Map<String, Value>,
        ) -> Result<Value, InvokeError> {
            Ok(serde_json::json!({ "method": method, "arguments": arguments }))
        }
    }

    #[test]
    fn splits_service_and_method() {
        assert_eq!(
            split_tool_name("gmail.reply_thread").unwrap(),
            ("gmail", "reply_thread")
        );
        // Only the first dot splits — methods may be dotted.
        assert_eq!(split_tool_name("a.b.c").unwrap(), ("a", "b.c"));
    }

    #[test]
    fn rejects_malformed_tool_names() {
        assert!(matches!(
            split_tool_name("gmail"),
            Err(InvokeError::InvalidToolName(_))
        ));
        assert!(matches!(
            split_tool_name(".method"),
            Err(InvokeError::InvalidToolName(_))
        ));
        assert!(matches!(
            split_tool_name("service."),
            Err(InvokeError::InvalidToolName(_))
        ));
    }

    #[tokio::test]
    async fn routes_call_to_registered_service() {
        let router = ToolRouter::new();
        router.register(Arc::new(EchoService)).await;
        assert!(router.has("echo").await);

        let mut args = Map::new();
        args.insert("x".into(), serde_json::json!(1));
        let result = router.invoke("echo.ping", args).await.unwrap();
        assert_eq!(result["method"], "ping");
        assert_eq!(result["arguments"]["x"], 1);
    }

    #[tokio::test]
    async fn unknown_service_is_an_error() {
        let router = ToolRouter::new();
        let err = router.invoke("calendar.create_event", Map::new()).await;
        assert!(matches!(err, Err(InvokeError::UnknownService(s)) if s == "calendar"));
    }
}
