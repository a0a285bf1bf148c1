//! The `Strategy` interface (§4.9): `execute(invocation, llm_client, tool_executor, on_event) -> Response`.
//! Grounded on the teacher's `AgentMessage`/`DelegatedTask` pair (`lib.rs`)
//! for the request/response envelope shape, generalized from inter-agent
//! delegation onto one agentic-loop turn.

use std::time::{Duration, Instant};

use agentspec_llm::{ChatMessage, LlmClientRegistry, TokenUsage};
use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{ToolCallResult, ToolRegistry};

/// One inbound request to an agent: resolved prompt, prior session history,
/// and the loop's governing limits.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub agent_fqn: String,
    pub client_name: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub history: Vec<ChatMessage>,
    pub input: String,
    pub max_turns: u32,
    pub token_budget: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

/// One completed tool call, recorded for the audit trail regardless of
/// success.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub is_error: bool,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub output: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub usage: TokenUsage,
    pub turns: u32,
    pub duration: Duration,
    pub truncated: bool,
}

/// Streaming events forwarded through `on_event`, in order, when streaming
/// is enabled (§4.9).
#[derive(Debug, Clone)]
pub enum LoopEvent {
    ContentDelta { text: String },
    ToolCallStart { call_id: String, tool_name: String },
    ToolCallDelta { call_id: String, partial_arguments: String },
    ToolCallEnd { call_id: String, is_error: bool },
    Thought { text: String },
    Validation { message: String },
    Done,
    Error { message: String },
}

pub trait EventSink: Send + Sync {
    fn on_event(&self, event: LoopEvent);
}

#[derive(Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn on_event(&self, _event: LoopEvent) {}
}

#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        invocation: Invocation,
        llm_clients: &LlmClientRegistry,
        tools: &ToolRegistry,
        on_event: &dyn EventSink,
    ) -> Response;
}

/// Shared bookkeeping every strategy's loop accumulates: turn count, start
/// time, running usage, and whether a limit truncated the run.
pub(crate) struct LoopBudget {
    pub max_turns: u32,
    pub token_budget: Option<u64>,
    pub turns: u32,
    pub usage: TokenUsage,
    pub started_at: Instant,
}

impl LoopBudget {
    pub(crate) fn new(max_turns: u32, token_budget: Option<u64>) -> Self {
        Self { max_turns, token_budget, turns: 0, usage: TokenUsage::default(), started_at: Instant::now() }
    }

    pub(crate) fn record_turn(&mut self, usage: TokenUsage) {
        self.turns += 1;
        self.usage.input_tokens += usage.input_tokens;
        self.usage.output_tokens += usage.output_tokens;
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.turns >= self.max_turns || self.token_budget.is_some_and(|budget| self.usage.total() >= budget)
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

pub(crate) fn record_tool_results(records: &mut Vec<ToolCallRecord>, names: &[(String, String, Value)], results: &[ToolCallResult]) {
    for ((call_id, tool_name, arguments), result) in names.iter().zip(results.iter()) {
        records.push(ToolCallRecord {
            call_id: call_id.clone(),
            tool_name: tool_name.clone(),
            arguments: arguments.clone(),
            is_error: result.is_error,
        });
    }
}
