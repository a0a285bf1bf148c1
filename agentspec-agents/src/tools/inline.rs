//! Sandboxed inline script executor (§4.10): runs a user-supplied script in
//! one of {Python, Node, Bash, Ruby} inside a per-invocation temp directory,
//! under a wall-clock timeout and an address-space limit. No pack example
//! sandboxes a subprocess; `nix::sys::resource::setrlimit` (the `nix` crate
//! is grounded on `surrealdb-surrealdb`'s `cfg(unix)` dependency, extended
//! here with its `resource` feature) is the concrete backend on Unix. There
//! is no Windows backend, so construction fails there per §4.10 ("disable
//! inline tools entirely at startup with a precise error").
//!
//! `allow_network = false` only clears the proxy environment variables; it
//! does not put the child in its own network namespace, so a script that
//! opens sockets directly is not actually blocked. Real isolation would need
//! a namespace/seccomp backend this crate doesn't have yet.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::TempDir;
use tokio::process::Command;

use super::executor::{ToolError, ToolExecutor, ToolResult};
use super::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLanguage {
    Python,
    Node,
    Bash,
    Ruby,
}

impl ScriptLanguage {
    fn interpreter(self) -> &'static str {
        match self {
            ScriptLanguage::Python => "python3",
            ScriptLanguage::Node => "node",
            ScriptLanguage::Bash => "bash",
            ScriptLanguage::Ruby => "ruby",
        }
    }

    fn source_filename(self) -> &'static str {
        match self {
            ScriptLanguage::Python => "script.py",
            ScriptLanguage::Node => "script.js",
            ScriptLanguage::Bash => "script.sh",
            ScriptLanguage::Ruby => "script.rb",
        }
    }
}

#[derive(Debug, Deserialize)]
struct InlineCallArgs {
    source: String,
}

#[derive(Debug, Clone)]
pub struct SandboxLimits {
    pub timeout: Duration,
    pub memory_bytes: u64,
    pub allow_network: bool,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(10), memory_bytes: 256 * 1024 * 1024, allow_network: false }
    }
}

pub struct InlineToolExecutor {
    language: ScriptLanguage,
    limits: SandboxLimits,
}

impl InlineToolExecutor {
    /// Fails with `ToolError::SandboxUnavailable` on any platform without a
    /// sandbox backend, per §4.10's "disable inline tools entirely at
    /// startup with a precise error".
    pub fn new(language: ScriptLanguage, limits: SandboxLimits) -> Result<Self, ToolError> {
        if !cfg!(unix) {
            return Err(ToolError::SandboxUnavailable);
        }
        Ok(Self { language, limits })
    }
}

#[cfg(unix)]
fn apply_memory_limit(command: &mut Command, memory_bytes: u64) {
    use std::os::unix::process::CommandExt;
    unsafe {
        command.pre_exec(move || {
            let limit = nix::sys::resource::Resource::RLIMIT_AS;
            nix::sys::resource::setrlimit(limit, memory_bytes, memory_bytes)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            Ok(())
        });
    }
}

#[async_trait]
impl ToolExecutor for InlineToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let args: InlineCallArgs = serde_json::from_value(call.arguments.clone()).map_err(|e| ToolError::Other(format!("invalid inline tool arguments: {e}")))?;

        let workdir = TempDir::new().map_err(|e| ToolError::Io(e.to_string()))?;
        let script_path = workdir.path().join(self.language.source_filename());
        tokio::fs::write(&script_path, &args.source).await.map_err(|e| ToolError::Io(e.to_string()))?;

        let mut command = Command::new(self.language.interpreter());
        command.arg(&script_path);
        command.current_dir(workdir.path());
        command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        command.kill_on_drop(true);

        if !self.limits.allow_network {
            command.env_remove("http_proxy").env_remove("https_proxy");
        }
        #[cfg(unix)]
        apply_memory_limit(&mut command, self.limits.memory_bytes);

        let run = async {
            let output = command.output().await.map_err(|e| ToolError::Io(e.to_string()))?;
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if output.status.code().is_none() {
                    Err(ToolError::SandboxViolation { operation: "exec".to_string(), target: script_path.display().to_string() })
                } else {
                    Err(ToolError::Other(format!("script exited with {}: {stderr}", output.status)))
                }
            }
        };

        match tokio::time::timeout(self.limits.timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::ResourceLimit { resource: "wall_clock".to_string(), limit: format!("{:?}", self.limits.timeout) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_surfaces_as_a_resource_limit_error() {
        let executor = InlineToolExecutor::new(ScriptLanguage::Bash, SandboxLimits { timeout: Duration::from_millis(50), ..Default::default() }).unwrap();
        let call = ToolCall { id: "1".to_string(), name: "inline".to_string(), arguments: serde_json::json!({"source": "sleep 5"}) };
        let err = executor.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::ResourceLimit { .. }));
    }
}
