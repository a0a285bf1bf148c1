//! MCP tool pool (§4.10). Tools discovered from an MCP server are registered
//! under `server-name/tool-name`; one connection is pooled per server name,
//! and concurrent first-use requests for the same server coalesce into a
//! single connection attempt rather than racing independent dials.
//!
//! Grounded on the teacher's `LockManager` (`lib.rs`) for the
//! concurrency-safe-map-behind-a-lock shape; the singleflight dedup itself
//! is built net-new on `tokio::sync::OnceCell`, since no pack example speaks
//! the Model Context Protocol and none links an MCP client crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};

use super::executor::{ToolError, ToolExecutor, ToolResult};
use super::ToolCall;

/// A live connection to one MCP server. The transport itself (stdio, SSE,
/// whichever the server advertises) is intentionally abstracted behind this
/// trait so the pool doesn't need to know the wire protocol.
#[async_trait]
pub trait McpConnection: Send + Sync {
    async fn call_tool(&self, tool_name: &str, arguments: &serde_json::Value) -> Result<String, ToolError>;
}

/// Connects to a named MCP server, used once per server on first use.
#[async_trait]
pub trait McpDialer: Send + Sync {
    async fn dial(&self, server_name: &str) -> Result<Arc<dyn McpConnection>, ToolError>;
}

struct PooledServer {
    connection: OnceCell<Result<Arc<dyn McpConnection>, String>>,
}

/// Pools one `McpConnection` per server name, deduplicating concurrent
/// first-use dials via `OnceCell`: the first caller for a server name drives
/// the dial, every other concurrent caller awaits the same in-flight result.
pub struct McpPool {
    dialer: Arc<dyn McpDialer>,
    servers: Mutex<HashMap<String, Arc<PooledServer>>>,
}

impl McpPool {
    pub fn new(dialer: Arc<dyn McpDialer>) -> Self {
        Self { dialer, servers: Mutex::new(HashMap::new()) }
    }

    async fn connection_for(&self, server_name: &str) -> Result<Arc<dyn McpConnection>, ToolError> {
        let entry = {
            let mut servers = self.servers.lock().await;
            servers.entry(server_name.to_string()).or_insert_with(|| Arc::new(PooledServer { connection: OnceCell::new() })).clone()
        };

        let dialer = self.dialer.clone();
        let server_name_owned = server_name.to_string();
        let result = entry
            .connection
            .get_or_init(|| async move { dialer.dial(&server_name_owned).await.map_err(|e| e.to_string()) })
            .await;
        result.clone().map_err(|message| ToolError::McpServer { server: server_name.to_string(), message })
    }
}

/// One registered MCP tool; `composite_name` is `server-name/tool-name`.
pub struct McpToolExecutor {
    pool: Arc<McpPool>,
    server_name: String,
    remote_tool_name: String,
}

impl McpToolExecutor {
    pub fn new(pool: Arc<McpPool>, server_name: impl Into<String>, remote_tool_name: impl Into<String>) -> Self {
        Self { pool, server_name: server_name.into(), remote_tool_name: remote_tool_name.into() }
    }

    pub fn composite_name(&self) -> String {
        format!("{}/{}", self.server_name, self.remote_tool_name)
    }
}

#[async_trait]
impl ToolExecutor for McpToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let connection = self.pool.connection_for(&self.server_name).await?;
        connection.call_tool(&self.remote_tool_name, &call.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingDialer {
        dial_count: AtomicU32,
    }

    struct StubConnection;

    #[async_trait]
    impl McpConnection for StubConnection {
        async fn call_tool(&self, tool_name: &str, _arguments: &serde_json::Value) -> Result<String, ToolError> {
            Ok(format!("called {tool_name}"))
        }
    }

    #[async_trait]
    impl McpDialer for CountingDialer {
        async fn dial(&self, _server_name: &str) -> Result<Arc<dyn McpConnection>, ToolError> {
            self.dial_count.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubConnection))
        }
    }

    #[tokio::test]
    async fn concurrent_first_use_dials_once() {
        let dialer = Arc::new(CountingDialer { dial_count: AtomicU32::new(0) });
        let pool = Arc::new(McpPool::new(dialer.clone()));

        let futures = (0..8).map(|_| {
            let pool = pool.clone();
            async move { pool.connection_for("search-server").await.unwrap() }
        });
        futures_util::future::join_all(futures).await;

        assert_eq!(dialer.dial_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn composite_name_joins_server_and_tool() {
        let dialer = Arc::new(CountingDialer { dial_count: AtomicU32::new(0) });
        let pool = Arc::new(McpPool::new(dialer));
        let tool = McpToolExecutor::new(pool, "search-server", "web_search");
        assert_eq!(tool.composite_name(), "search-server/web_search");
    }
}
