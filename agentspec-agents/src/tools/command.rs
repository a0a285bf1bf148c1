//! Allowlisted command executor (§4.10). Grounded on `agentspec-adapters`'s
//! `ProcessAdapter` for the `std::process::Command` shape, but adds the
//! allowlist check and minimal-environment invocation the adapter doesn't
//! need (adapters are configured by the package author, not driven by model
//! output).

use std::collections::BTreeMap;
use std::env;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use super::executor::{ToolError, ToolExecutor, ToolResult};
use super::ToolCall;

#[derive(Debug, Deserialize)]
struct CommandCallArgs {
    binary: String,
    #[serde(default)]
    args: Vec<String>,
}

/// With no allowlist entries, every command is blocked (§4.10: "with no
/// allowlist, block all command execution").
pub struct CommandToolExecutor {
    allowlist: Vec<String>,
    resolved_secrets: BTreeMap<String, String>,
}

impl CommandToolExecutor {
    pub fn new(allowlist: Vec<String>, resolved_secrets: BTreeMap<String, String>) -> Self {
        Self { allowlist, resolved_secrets }
    }

    fn resolve_binary(&self, name: &str) -> Result<std::path::PathBuf, ToolError> {
        if !self.allowlist.iter().any(|allowed| allowed == name) {
            tracing::warn!(binary = name, "command tool call rejected: not in allowlist");
            return Err(ToolError::NotAllowlisted { name: name.to_string() });
        }
        which::which(name).map_err(|_| ToolError::BinaryNotFound { binary: name.to_string() })
    }
}

#[async_trait]
impl ToolExecutor for CommandToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let args: CommandCallArgs =
            serde_json::from_value(call.arguments.clone()).map_err(|e| ToolError::Other(format!("invalid command tool arguments: {e}")))?;
        let binary = self.resolve_binary(&args.binary)?;

        let mut command = Command::new(&binary);
        command.args(&args.args);
        command.env_clear();
        if let Ok(path) = env::var("PATH") {
            command.env("PATH", path);
        }
        if let Ok(home) = env::var("HOME") {
            command.env("HOME", home);
        }
        for (key, value) in &self.resolved_secrets {
            command.env(key, value);
        }
        command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = command.output().await.map_err(|e| ToolError::Io(e.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(ToolError::Other(format!("command exited with {}: {stderr}", output.status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binary_not_in_allowlist_is_rejected_before_lookup() {
        let executor = CommandToolExecutor::new(vec!["ls".to_string()], BTreeMap::new());
        let call = ToolCall { id: "1".to_string(), name: "command".to_string(), arguments: serde_json::json!({"binary": "rm", "args": ["-rf", "/"]}) };
        let err = executor.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotAllowlisted { .. }));
    }

    #[tokio::test]
    async fn empty_allowlist_blocks_everything() {
        let executor = CommandToolExecutor::new(vec![], BTreeMap::new());
        let call = ToolCall { id: "1".to_string(), name: "command".to_string(), arguments: serde_json::json!({"binary": "echo", "args": []}) };
        let err = executor.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotAllowlisted { .. }));
    }
}
