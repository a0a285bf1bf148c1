//! Chat-completion client abstraction consumed by the agentic loop (C9) and
//! the summarizing memory strategy (C11). Grounded on the teacher's
//! embedding/summarization provider layer, retargeted onto chat completion
//! with tool calling, which is the only LLM capability AgentSpec's runtime
//! needs.

pub mod circuit;
pub mod client;
pub mod providers;
pub mod registry;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmResult, MessageContent, Role, StopReason, TokenUsage,
    ToolDefinition,
};
pub use providers::{AnthropicLlmClient, OllamaLlmClient, OpenAILlmClient};
pub use registry::LlmClientRegistry;
