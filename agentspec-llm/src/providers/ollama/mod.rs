//! Ollama (local model) chat-completion client.

pub mod client;
pub mod types;

use async_trait::async_trait;

use self::client::OllamaClient;
use self::types::{ChatRequest, ChatResponse, FunctionCall, FunctionSpec, Message, Options, ToolCall, ToolSpec};
use crate::client::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmResult, MessageContent, Role, StopReason, TokenUsage,
};

pub struct OllamaLlmClient {
    client: OllamaClient,
}

impl OllamaLlmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: OllamaClient::new(base_url) }
    }

    pub fn local() -> Self {
        Self { client: OllamaClient::local() }
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    /// Ollama's tool-result messages carry only `role: "tool"` and content,
    /// no `tool_call_id` field — it matches results to calls positionally.
    fn to_wire_messages(message: &ChatMessage) -> Vec<Message> {
        if message.role == Role::Tool {
            return message
                .content
                .iter()
                .filter_map(|c| match c {
                    MessageContent::ToolResult { content, .. } => Some(Message { role: "tool".to_string(), content: Some(content.clone()), tool_calls: vec![] }),
                    _ => None,
                })
                .collect();
        }

        let text = message.text();
        let tool_calls = message
            .tool_calls()
            .into_iter()
            .map(|(_, name, input)| ToolCall { function: FunctionCall { name: name.to_string(), arguments: input.clone() } })
            .collect();
        vec![Message { role: Self::role_str(message.role).to_string(), content: if text.is_empty() { None } else { Some(text) }, tool_calls }]
    }

    fn from_wire_message(message: Message) -> ChatMessage {
        let mut content = Vec::new();
        if let Some(text) = message.content {
            if !text.is_empty() {
                content.push(MessageContent::Text { text });
            }
        }
        for (i, call) in message.tool_calls.into_iter().enumerate() {
            content.push(MessageContent::ToolUse { id: format!("call_{i}"), name: call.function.name, input: call.function.arguments });
        }
        ChatMessage { role: Role::Assistant, content }
    }
}

#[async_trait]
impl LlmClient for OllamaLlmClient {
    fn provider_id(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(Message { role: "system".to_string(), content: Some(system.clone()), tool_calls: vec![] });
        }
        for message in &request.messages {
            messages.extend(Self::to_wire_messages(message));
        }
        let tools = request
            .tools
            .iter()
            .map(|t| ToolSpec { kind: "function".to_string(), function: FunctionSpec { name: t.name.clone(), description: t.description.clone(), parameters: t.input_schema.clone() } })
            .collect();
        let options = Options { temperature: request.temperature, num_predict: Some(request.max_tokens) };
        let body = ChatRequest { model: request.model, messages, tools, stream: false, options: Some(options) };

        let response: ChatResponse = self.client.request("api/chat", body).await?;
        let has_tool_calls = !response.message.tool_calls.is_empty();
        let message = Self::from_wire_message(response.message);
        let stop_reason = if has_tool_calls { StopReason::ToolUse } else { StopReason::EndTurn };
        Ok(CompletionResponse {
            message,
            stop_reason,
            usage: TokenUsage { input_tokens: response.prompt_eval_count, output_tokens: response.eval_count },
        })
    }
}

impl std::fmt::Debug for OllamaLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaLlmClient").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_role_message_splits_per_result() {
        let msg = ChatMessage {
            role: Role::Tool,
            content: vec![MessageContent::ToolResult { tool_use_id: "call_0".to_string(), content: "42".to_string(), is_error: false }],
        };
        let wire = OllamaLlmClient::to_wire_messages(&msg);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "tool");
    }

    #[test]
    fn assistant_tool_call_arguments_stay_as_json_value() {
        let msg = ChatMessage {
            role: Role::Assistant,
            content: vec![MessageContent::ToolUse { id: "call_0".to_string(), name: "calc".to_string(), input: serde_json::json!({"x": 1}) }],
        };
        let wire = OllamaLlmClient::to_wire_messages(&msg);
        assert_eq!(wire[0].tool_calls[0].function.arguments, serde_json::json!({"x": 1}));
    }
}
