//! Anthropic (Claude) chat-completion client.

pub mod client;
pub mod types;

use async_trait::async_trait;

use self::client::AnthropicClient;
use self::types::{MessageRequest, MessageResponse, RequestContentBlock, RequestMessage, ResponseContentBlock, ToolSpec};
use crate::client::{ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmResult, MessageContent, Role, StopReason, TokenUsage};

pub struct AnthropicLlmClient {
    client: AnthropicClient,
}

impl AnthropicLlmClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { client: AnthropicClient::new(api_key, 50) }
    }

    /// Anthropic has no `system`/`tool` message role; system goes in the
    /// request's top-level `system` field and tool results ride back in as
    /// `user` messages carrying a `tool_result` content block.
    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System | Role::User | Role::Tool => "user",
            Role::Assistant => "assistant",
        }
    }

    fn to_request_message(message: &ChatMessage) -> RequestMessage {
        let role = Self::role_str(message.role).to_string();
        let content = message
            .content
            .iter()
            .map(|c| match c {
                MessageContent::Text { text } => RequestContentBlock::Text { text: text.clone() },
                MessageContent::ToolUse { id, name, input } => {
                    RequestContentBlock::ToolUse { id: id.clone(), name: name.clone(), input: input.clone() }
                }
                MessageContent::ToolResult { tool_use_id, content, is_error } => {
                    RequestContentBlock::ToolResult { tool_use_id: tool_use_id.clone(), content: content.clone(), is_error: *is_error }
                }
            })
            .collect();
        RequestMessage { role, content }
    }

    fn from_response(response: MessageResponse) -> CompletionResponse {
        let content = response
            .content
            .into_iter()
            .map(|block| match block {
                ResponseContentBlock::Text { text } => MessageContent::Text { text },
                ResponseContentBlock::ToolUse { id, name, input } => MessageContent::ToolUse { id, name, input },
            })
            .collect();
        let stop_reason = match response.stop_reason.as_deref() {
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };
        CompletionResponse {
            message: ChatMessage { role: Role::Assistant, content },
            stop_reason,
            usage: TokenUsage { input_tokens: response.usage.input_tokens, output_tokens: response.usage.output_tokens },
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicLlmClient {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let tools = request
            .tools
            .iter()
            .map(|t| ToolSpec { name: t.name.clone(), description: t.description.clone(), input_schema: t.input_schema.clone() })
            .collect();
        let body = MessageRequest {
            model: request.model,
            messages: request.messages.iter().map(Self::to_request_message).collect(),
            max_tokens: request.max_tokens,
            system: request.system,
            temperature: request.temperature,
            tools,
        };
        let response: MessageResponse = self.client.request("messages", body).await?;
        Ok(Self::from_response(response))
    }
}

impl std::fmt::Debug for AnthropicLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicLlmClient").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_maps_to_user_role() {
        let msg = ChatMessage::user_text("hi");
        let req = AnthropicLlmClient::to_request_message(&msg);
        assert_eq!(req.role, "user");
    }

    #[test]
    fn tool_use_content_block_maps_through() {
        let msg = ChatMessage {
            role: Role::Assistant,
            content: vec![MessageContent::ToolUse { id: "t1".to_string(), name: "search".to_string(), input: serde_json::json!({}) }],
        };
        let req = AnthropicLlmClient::to_request_message(&msg);
        match &req.content[0] {
            RequestContentBlock::ToolUse { name, .. } => assert_eq!(name, "search"),
            other => panic!("expected tool_use, got {other:?}"),
        }
    }
}
