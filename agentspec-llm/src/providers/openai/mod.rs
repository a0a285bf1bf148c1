//! OpenAI chat-completion client.

pub mod client;
pub mod types;

use async_trait::async_trait;

use self::client::OpenAIClient;
use self::types::{CompletionRequest as WireRequest, CompletionResponse as WireResponse, FunctionCall, FunctionSpec, Message, ToolCall, ToolSpec};
use crate::client::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmResult, MessageContent, Role, StopReason, TokenUsage,
};

pub struct OpenAILlmClient {
    client: OpenAIClient,
}

impl OpenAILlmClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { client: OpenAIClient::new(api_key, 60) }
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    /// One `ChatMessage` can expand into several wire messages: OpenAI wants
    /// one `role: "tool"` message per tool result, each carrying its own
    /// `tool_call_id`.
    fn to_wire_messages(message: &ChatMessage) -> LlmResult<Vec<Message>> {
        if message.role == Role::Tool {
            return message
                .content
                .iter()
                .filter_map(|c| match c {
                    MessageContent::ToolResult { tool_use_id, content, .. } => {
                        Some(Message { role: "tool".to_string(), content: Some(content.clone()), tool_calls: vec![], tool_call_id: Some(tool_use_id.clone()) })
                    }
                    _ => None,
                })
                .map(Ok)
                .collect();
        }

        let text = message.text();
        let mut tool_calls = Vec::new();
        for (id, name, input) in message.tool_calls() {
            let arguments = serde_json::to_string(input)
                .map_err(|e| LlmError::MalformedToolCallArguments { tool_name: name.to_string(), reason: e.to_string() })?;
            tool_calls.push(ToolCall { id: id.to_string(), kind: "function".to_string(), function: FunctionCall { name: name.to_string(), arguments } });
        }
        Ok(vec![Message {
            role: Self::role_str(message.role).to_string(),
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls,
            tool_call_id: None,
        }])
    }

    fn from_wire_message(message: Message) -> LlmResult<ChatMessage> {
        let mut content = Vec::new();
        if let Some(text) = message.content {
            if !text.is_empty() {
                content.push(MessageContent::Text { text });
            }
        }
        for call in message.tool_calls {
            let input = serde_json::from_str(&call.function.arguments)
                .map_err(|e| LlmError::MalformedToolCallArguments { tool_name: call.function.name.clone(), reason: e.to_string() })?;
            content.push(MessageContent::ToolUse { id: call.id, name: call.function.name, input });
        }
        Ok(ChatMessage { role: Role::Assistant, content })
    }
}

#[async_trait]
impl LlmClient for OpenAILlmClient {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(Message { role: "system".to_string(), content: Some(system.clone()), tool_calls: vec![], tool_call_id: None });
        }
        for message in &request.messages {
            messages.extend(Self::to_wire_messages(message)?);
        }
        let tools = request
            .tools
            .iter()
            .map(|t| ToolSpec { kind: "function".to_string(), function: FunctionSpec { name: t.name.clone(), description: t.description.clone(), parameters: t.input_schema.clone() } })
            .collect();
        let body = WireRequest { model: request.model, messages, max_tokens: Some(request.max_tokens as i32), temperature: request.temperature, tools };

        let response: WireResponse = self.client.request("chat/completions", body).await?;
        let choice = response.choices.into_iter().next().ok_or_else(|| LlmError::ProviderError {
            provider: "openai".to_string(),
            message: "response carried no choices".to_string(),
        })?;
        let stop_reason = match choice.finish_reason.as_str() {
            "tool_calls" => StopReason::ToolUse,
            "length" => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };
        let message = Self::from_wire_message(choice.message)?;
        Ok(CompletionResponse {
            message,
            stop_reason,
            usage: TokenUsage {
                input_tokens: response.usage.prompt_tokens as u64,
                output_tokens: response.usage.completion_tokens.unwrap_or(0) as u64,
            },
        })
    }
}

impl std::fmt::Debug for OpenAILlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAILlmClient").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_tool_use_becomes_a_tool_calls_array() {
        let msg = ChatMessage {
            role: Role::Assistant,
            content: vec![MessageContent::ToolUse { id: "call_1".to_string(), name: "search".to_string(), input: serde_json::json!({"q": "rust"}) }],
        };
        let wire = OpenAILlmClient::to_wire_messages(&msg).unwrap();
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].tool_calls[0].function.name, "search");
        assert_eq!(wire[0].tool_calls[0].function.arguments, r#"{"q":"rust"}"#);
    }

    #[test]
    fn tool_role_message_with_two_results_splits_into_two_wire_messages() {
        let msg = ChatMessage {
            role: Role::Tool,
            content: vec![
                MessageContent::ToolResult { tool_use_id: "call_1".to_string(), content: "ok".to_string(), is_error: false },
                MessageContent::ToolResult { tool_use_id: "call_2".to_string(), content: "fail".to_string(), is_error: true },
            ],
        };
        let wire = OpenAILlmClient::to_wire_messages(&msg).unwrap();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(wire[1].tool_call_id.as_deref(), Some("call_2"));
    }
}
