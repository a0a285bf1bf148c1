//! The reference reason/act strategy (§4.9).

use agentspec_llm::{ChatMessage, CompletionRequest, LlmClientRegistry, MessageContent, Role, StopReason};
use async_trait::async_trait;

use crate::strategy::{record_tool_results, EventSink, Invocation, LoopBudget, LoopEvent, Response, Strategy};
use crate::tools::{ToolCall, ToolRegistry};

pub struct ReasonActStrategy;

impl ReasonActStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Drives one reason/act loop to completion. Exposed so `router` and
    /// `map-reduce` can reuse the concurrent-dispatch machinery rather than
    /// duplicating it (§4.9).
    pub(crate) async fn run(
        invocation: &Invocation,
        llm_clients: &LlmClientRegistry,
        tools: &ToolRegistry,
        on_event: &dyn EventSink,
    ) -> Response {
        let mut messages = invocation.history.clone();
        messages.push(ChatMessage::user_text(invocation.input.clone()));

        let mut budget = LoopBudget::new(invocation.max_turns.max(1), invocation.token_budget);
        let mut tool_call_records = Vec::new();
        let mut truncated = false;
        let tool_definitions = tools.definitions();

        loop {
            if budget.exhausted() {
                truncated = true;
                break;
            }

            let request = CompletionRequest {
                model: invocation.model.clone(),
                system: invocation.system_prompt.clone(),
                messages: messages.clone(),
                tools: tool_definitions.clone(),
                max_tokens: invocation.max_tokens,
                temperature: invocation.temperature,
            };

            let completion = match llm_clients.complete(&invocation.client_name, request).await {
                Ok(completion) => completion,
                Err(e) => {
                    on_event.on_event(LoopEvent::Error { message: e.to_string() });
                    return Response {
                        output: String::new(),
                        tool_calls: tool_call_records,
                        usage: budget.usage,
                        turns: budget.turns,
                        duration: budget.elapsed(),
                        truncated: true,
                    };
                }
            };
            budget.record_turn(completion.usage);

            let text = completion.message.text();
            if !text.is_empty() {
                on_event.on_event(LoopEvent::ContentDelta { text: text.clone() });
            }

            let calls: Vec<(String, String, serde_json::Value)> =
                completion.message.tool_calls().into_iter().map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone())).collect();

            messages.push(completion.message.clone());

            if calls.is_empty() || completion.stop_reason != StopReason::ToolUse {
                return Response {
                    output: text,
                    tool_calls: tool_call_records,
                    usage: budget.usage,
                    turns: budget.turns,
                    duration: budget.elapsed(),
                    truncated: false,
                };
            }

            for (id, name, _) in &calls {
                on_event.on_event(LoopEvent::ToolCallStart { call_id: id.clone(), tool_name: name.clone() });
            }

            let tool_calls: Vec<ToolCall> = calls.iter().map(|(id, name, input)| ToolCall { id: id.clone(), name: name.clone(), arguments: input.clone() }).collect();
            let results = tools.execute_concurrent(tool_calls).await;

            for result in &results {
                on_event.on_event(LoopEvent::ToolCallEnd { call_id: result.call_id.clone(), is_error: result.is_error });
            }

            record_tool_results(&mut tool_call_records, &calls, &results);

            let tool_result_content = results
                .into_iter()
                .map(|r| MessageContent::ToolResult { tool_use_id: r.call_id, content: r.content, is_error: r.is_error })
                .collect();
            messages.push(ChatMessage { role: Role::Tool, content: tool_result_content });
        }

        on_event.on_event(LoopEvent::Done);
        Response {
            output: messages.iter().rev().find_map(|m| if m.role == Role::Assistant { Some(m.text()) } else { None }).unwrap_or_default(),
            tool_calls: tool_call_records,
            usage: budget.usage,
            turns: budget.turns,
            duration: budget.elapsed(),
            truncated,
        }
    }
}

impl Default for ReasonActStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for ReasonActStrategy {
    fn name(&self) -> &'static str {
        "reason-act"
    }

    async fn execute(&self, invocation: Invocation, llm_clients: &LlmClientRegistry, tools: &ToolRegistry, on_event: &dyn EventSink) -> Response {
        Self::run(&invocation, llm_clients, tools, on_event).await
    }
}
