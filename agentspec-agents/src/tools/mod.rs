//! Tool registry and call/result types (C10). Grounded on the teacher's
//! `LockManager`/agent-registration pattern (`lib.rs`'s concurrency-safe
//! `HashMap` behind a lock, looked up by a string key) generalized from
//! agent IDs onto tool names.

pub mod command;
pub mod executor;
pub mod http;
pub mod inline;
pub mod mcp;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use agentspec_llm::ToolDefinition;
use serde_json::Value;

pub use executor::{ToolError, ToolExecutor, ToolResult as ToolExecResult};

/// One tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// The outcome of one tool invocation, always produced even on failure —
/// callers report failures back to the model as an `is_error` tool result
/// rather than aborting the turn.
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub call_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), content: content.into(), is_error: false }
    }

    pub fn err(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { call_id: call_id.into(), content: content.into(), is_error: true }
    }
}

/// A tool entry: its definition (for the LLM's tool list) plus the executor
/// that actually performs the call.
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub executor: Arc<dyn ToolExecutor>,
}

/// Named tools, keyed by plain name for local executors or `server-name/tool-name`
/// for MCP-discovered ones (§4.10).
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: RwLock::new(HashMap::new()) }
    }

    pub fn register(&self, definition: ToolDefinition, executor: Arc<dyn ToolExecutor>) {
        let name = definition.name.clone();
        self.tools.write().expect("tool registry lock poisoned").insert(name, RegisteredTool { definition, executor });
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.read().expect("tool registry lock poisoned").values().map(|t| t.definition.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.read().expect("tool registry lock poisoned").get(name).map(|t| t.executor.clone())
    }

    /// Dispatch every call in `calls` concurrently; preserves input order in
    /// the result vector regardless of completion order (§4.9 "all tool
    /// calls in the turn concurrently").
    pub async fn execute_concurrent(&self, calls: Vec<ToolCall>) -> Vec<ToolCallResult> {
        let futures = calls.into_iter().map(|call| {
            let executor = self.get(&call.name);
            async move {
                match executor {
                    Some(executor) => match executor.execute(&call).await {
                        Ok(output) => ToolCallResult::ok(call.id, output),
                        Err(e) => ToolCallResult::err(call.id, e.to_string()),
                    },
                    None => ToolCallResult::err(call.id.clone(), format!("unknown tool: {}", call.name)),
                }
            }
        });
        futures_util::future::join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl ToolExecutor for EchoTool {
        async fn execute(&self, call: &ToolCall) -> Result<String, ToolError> {
            Ok(call.arguments.to_string())
        }
    }

    #[tokio::test]
    async fn unknown_tool_reports_an_error_result_without_aborting_the_batch() {
        let registry = ToolRegistry::new();
        registry.register(
            ToolDefinition { name: "echo".to_string(), description: "echoes input".to_string(), input_schema: serde_json::json!({}) },
            Arc::new(EchoTool),
        );
        let results = registry
            .execute_concurrent(vec![
                ToolCall { id: "1".to_string(), name: "echo".to_string(), arguments: serde_json::json!({"a": 1}) },
                ToolCall { id: "2".to_string(), name: "ghost".to_string(), arguments: serde_json::json!({}) },
            ])
            .await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].is_error);
        assert!(results[1].is_error);
    }
}
