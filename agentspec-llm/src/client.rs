//! The provider-agnostic chat-completion contract the agentic loop (C9)
//! calls through: one `complete()` per LLM round-trip, tool definitions in,
//! tool calls (if any) out. Grounded on the teacher's `ProviderAdapter`
//! trait shape (`caliber-llm/src/lib.rs`) — async, `Send + Sync`, one method
//! per capability — retargeted from embedding/summarization onto chat
//! completion with tool calling, since that is the only LLM capability C9
//! and C11's summarizing memory strategy actually need.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// LLM call failures. Kept local to this crate rather than folded into
/// `agentspec_core::AgentSpecError` — callers (the agentic loop, the
/// summarizing memory strategy) convert into `RuntimeError` at their own
/// boundary, the same "library functions return their own narrow error type"
/// rule the core error taxonomy documents for itself.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("provider {provider} not configured")]
    ProviderNotConfigured { provider: String },
    #[error("rate limited by provider")]
    RateLimited,
    #[error("invalid api key for provider {provider}")]
    InvalidApiKey { provider: String },
    #[error("provider {provider} error: {message}")]
    ProviderError { provider: String, message: String },
    #[error("malformed tool-call arguments for {tool_name}: {reason}")]
    MalformedToolCallArguments { tool_name: String, reason: String },
}

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One unit of message content. A single turn can carry several of these
/// (e.g. a text block followed by one or more tool calls).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
    ToolResult { tool_use_id: String, content: String, is_error: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<MessageContent>,
}

impl ChatMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: vec![MessageContent::Text { text: text.into() }] }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: vec![MessageContent::Text { text: text.into() }] }
    }

    /// Concatenates every `Text` block; empty string if the message carries
    /// only tool calls or tool results.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                MessageContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_calls(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        self.content
            .iter()
            .filter_map(|c| match c {
                MessageContent::ToolUse { id, name, input } => Some((id.as_str(), name.as_str(), input)),
                _ => None,
            })
            .collect()
    }
}

/// A tool the model may call, derived from an agent's skill set (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: ChatMessage,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;
}
