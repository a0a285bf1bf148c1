//! The executor contract every tool kind (MCP, HTTP, command, inline)
//! implements. Kept local to this crate, same rationale as `agentspec_llm::LlmError`:
//! a narrowly-scoped error type that stays within one component.

use async_trait::async_trait;
use thiserror::Error;

use super::ToolCall;

pub type ToolResult = Result<String, ToolError>;

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("tool {name} not in command allowlist")]
    NotAllowlisted { name: String },
    #[error("binary {binary} not found on system")]
    BinaryNotFound { binary: String },
    #[error("sandbox violation: {operation} on {target}")]
    SandboxViolation { operation: String, target: String },
    #[error("resource limit exceeded: {resource} (limit {limit})")]
    ResourceLimit { resource: String, limit: String },
    #[error("no sandbox backend available on this platform")]
    SandboxUnavailable,
    #[error("request to {host} rejected: resolves to a private/loopback/link-local address")]
    SsrfBlocked { host: String },
    #[error("mcp server {server} error: {message}")]
    McpServer { server: String, message: String },
    #[error("io error: {0}")]
    Io(String),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}
