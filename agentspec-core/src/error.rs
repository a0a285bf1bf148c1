//! Error taxonomy. Each concern gets its own `thiserror` enum; `AgentSpecError`
//! aggregates all of them via `#[from]`. This is the same layered-enum-plus-
//! aggregate-plus-`Result`-alias shape the teacher uses for its own error type,
//! generalized to the error kinds §7 of the spec calls out by name.

use thiserror::Error;

/// Lexing/parsing problems. Parsing never aborts on the first one of these —
/// they accumulate into a `Vec<ParseError>` returned alongside a best-effort AST.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub hint: Option<String>,
}

/// Structural and semantic validation problems (C2). Carries a source
/// position so diagnostics can be sorted and rendered consistently with
/// parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct ValidationError {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub hint: Option<String>,
}

/// Lowering (AST → IR) failures: unresolved references, duplicate `(kind, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("duplicate resource {kind} \"{name}\"")]
    DuplicateResource { kind: String, name: String },
    #[error("unresolved reference {from} -> {to}")]
    UnresolvedReference { from: String, to: String },
}

/// Plan engine failures (C4). The diff itself cannot fail — these surface
/// around it, e.g. an ambiguous deploy-target resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no deploy target resolved: {reason}")]
    NoTargetResolved { reason: String },
    #[error("ambiguous deploy target: {candidates:?}")]
    AmbiguousTarget { candidates: Vec<String> },
}

/// State backend failures (C5). Distinct kinds per §4.5/§7 so the CLI can
/// print the holder PID/host or prompt for manual recovery precisely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state file corrupted at {path} (backup used: {backup_used})")]
    StateCorrupted { path: String, backup_used: bool },
    #[error("both primary and backup state files are corrupted at {path}")]
    BothCorrupted { path: String },
    #[error("state locked by pid {holder_pid} on {hostname} since {locked_at}")]
    StateLocked {
        holder_pid: u32,
        hostname: String,
        locked_at: String,
    },
    #[error("io error: {0}")]
    Io(String),
}

/// Adapter failures (C6). Per-action; never fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("adapter {name} not registered")]
    NotRegistered { name: String },
    #[error("adapter {adapter} validation failed for {fqn}: {reason}")]
    ValidationFailed {
        adapter: String,
        fqn: String,
        reason: String,
    },
    #[error("adapter {adapter} apply failed for {fqn}: {reason}")]
    ApplyFailed {
        adapter: String,
        fqn: String,
        reason: String,
    },
}

/// Plugin host failures (C7). Always carries plugin name and captured stderr
/// so the host can surface it without panicking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("plugin {plugin} declares duplicate resource kind {kind}")]
    DuplicateResourceKind { plugin: String, kind: String },
    #[error("plugin {plugin} capability {capability} failed: {message}\nstderr: {stderr}")]
    CapabilityFailed {
        plugin: String,
        capability: String,
        message: String,
        stderr: String,
    },
    #[error("failed to load plugin module at {path}: {reason}")]
    LoadFailed { path: String, reason: String },
}

/// Security-policy failures (C10/C12): SSRF attempts, disallowed binaries,
/// sandbox violations, resource limits. Never collapsed into a generic error
/// — the tool loop needs the discriminant to report back to the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("SSRF: private network access denied for {address}")]
    Ssrf { address: String },
    #[error("command {binary} not in allowlist")]
    NotInAllowlist { binary: String },
    #[error("command {binary} not found on system")]
    NotFound { binary: String },
    #[error("sandbox violation: {operation} on {target}")]
    SandboxViolation { operation: String, target: String },
    #[error("resource limit exceeded: {resource} limit {limit}")]
    ResourceLimit { resource: String, limit: String },
}

/// Policy engine failures (C12).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("unknown policy requirement: {requirement} (supported: {supported:?})")]
    UnknownRequirement {
        requirement: String,
        supported: Vec<String>,
    },
    #[error("policy violation on {fqn}: {requirement}: {detail}")]
    Violation {
        fqn: String,
        requirement: String,
        detail: String,
    },
}

/// Secret resolution failures (C12).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretsError {
    #[error("secret {name} could not be resolved by any provider")]
    Unresolvable { name: String },
    #[error("secret provider {provider} failed: {reason}")]
    ProviderFailed { provider: String, reason: String },
}

/// Runtime request failures (C8/C9/C11): the HTTP-facing error surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("agent not found: {fqn}")]
    AgentNotFound { fqn: String },
    #[error("session not found: {id}")]
    SessionNotFound { id: String },
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("not ready: {0}")]
    NotReady(String),
}

/// Master error type aggregating every concern above. Library functions
/// return their own narrow error type where it stays local to one component;
/// boundaries that must merge several concerns (the CLI, the runtime) return
/// this instead of a generic `anyhow`-style box.
#[derive(Debug, Clone, Error)]
pub enum AgentSpecError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("lowering error: {0}")]
    Lower(#[from] LowerError),
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("security error: {0}")]
    Security(#[from] SecurityError),
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
    #[error("secrets error: {0}")]
    Secrets(#[from] SecretsError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

pub type AgentSpecResult<T> = Result<T, AgentSpecError>;
