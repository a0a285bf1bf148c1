//! Structured lifecycle events (C13). Deliberately flat — unlike the
//! teacher's DAG-shaped event model (forward/backward edges for multi-agent
//! coordination), AgentSpec only needs one emitted record per lifecycle
//! milestone, carried through logs and out to sinks via a single-method
//! emitter interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle events across the apply and invoke paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ApplyStarted,
    ApplyProgress,
    ApplyResource,
    ApplyCompleted,
    ApplyFailed,
    InvokeStarted,
    InvokeToolCall,
    InvokeCompleted,
    InvokeFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    pub data: Value,
}

impl Event {
    pub fn new(event_type: EventType, correlation_id: impl Into<String>, data: Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            correlation_id: correlation_id.into(),
            data,
        }
    }
}

/// Generates a fresh correlation ID for one apply or one invocation.
pub fn new_correlation_id() -> String {
    Uuid::now_v7().to_string()
}

/// One emission sink. Implementations: `NoopEmitter`, `InMemoryEmitter` (for
/// tests), and a webhook/logger sink in `agentspec-events`.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: Event);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
    fn emit(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_ids_are_unique() {
        let a = new_correlation_id();
        let b = new_correlation_id();
        assert_ne!(a, b);
    }
}
