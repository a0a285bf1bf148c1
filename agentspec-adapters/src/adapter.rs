//! The uniform adapter contract (§4.6). Adapters only ever see `Resource`
//! and return `Result`; they never touch the parser or the state backend.

use std::io::Write;
use std::path::Path;

use agentspec_core::{Action, AgentSpecResult, ApplyResult, Resource};

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub follow: bool,
    pub tail: Option<usize>,
}

pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Platform-specific precondition checks, run before a plan's actions
    /// are dispatched to this adapter.
    fn validate(&self, resources: &[Resource]) -> AgentSpecResult<()>;

    /// Execute `actions` against `resources`. Noops are skipped before this
    /// is called; a failure on one action never aborts the rest — every
    /// action gets its own `ApplyResult`.
    fn apply(&self, actions: &[Action], resources: &[Resource]) -> Vec<ApplyResult>;

    /// Emit platform-specific artifacts for `resources` into `out_dir`
    /// without deploying anything. Byte-identical output for identical
    /// input, same as the canonical formatter's determinism contract.
    fn export(&self, resources: &[Resource], out_dir: &Path) -> AgentSpecResult<()>;

    fn status(&self, resources: &[Resource]) -> AgentSpecResult<String>;

    fn logs(&self, resources: &[Resource], writer: &mut dyn Write, options: &LogOptions) -> AgentSpecResult<()>;

    fn destroy(&self, resources: &[Resource]) -> AgentSpecResult<()>;
}

pub(crate) fn find_resource<'a>(resources: &'a [Resource], fqn: &str) -> Option<&'a Resource> {
    resources.iter().find(|r| r.fqn == fqn)
}
