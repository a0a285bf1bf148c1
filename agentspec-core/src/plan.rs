//! The plan/state data model. Diffing lives in `agentspec-storage` (it needs
//! the state backend); the shapes being diffed live here so both the storage
//! crate and the CLI/runtime can share them without a dependency cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a persisted state entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Applied,
    Failed,
}

/// One row of persisted deployment state, keyed by FQN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub fqn: String,
    pub hash: String,
    pub status: Status,
    pub last_applied: DateTime<Utc>,
    pub adapter: String,
    pub error: Option<String>,
}

/// Why an action was produced, carried through to plan output for human-readable `plan`/`diff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionReason {
    New,
    HashChanged,
    RetryPreviouslyFailed,
    RemovedFromSource,
    Unchanged,
}

impl ActionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionReason::New => "new",
            ActionReason::HashChanged => "hash changed",
            ActionReason::RetryPreviouslyFailed => "retry previously failed",
            ActionReason::RemovedFromSource => "removed from source",
            ActionReason::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for ActionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One planned change against a single FQN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub fqn: String,
    pub kind: ActionKind,
    pub reason: ActionReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Noop,
}

/// An ordered, deterministic set of actions. Pure data: it can be
/// serialized and displayed unchanged between runs given identical inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    /// Actions that would actually change something on apply.
    pub fn non_noop(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.kind != ActionKind::Noop)
    }

    pub fn is_empty_change(&self) -> bool {
        self.non_noop().next().is_none()
    }
}

/// Outcome of applying one action, as returned by an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub fqn: String,
    pub kind: ActionKind,
    pub success: bool,
    pub error: Option<String>,
    pub artifact: Option<String>,
}
