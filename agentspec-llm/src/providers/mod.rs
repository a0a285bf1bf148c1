//! Concrete `LlmClient` implementations, one per supported chat provider.

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicLlmClient;
pub use ollama::OllamaLlmClient;
pub use openai::OpenAILlmClient;
