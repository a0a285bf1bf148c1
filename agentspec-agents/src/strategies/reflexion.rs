//! Reflexion strategy (§4.9): after the reference loop produces an answer,
//! ask the model to critique its own output and, if the critique is not a
//! clean approval, run one revision pass that folds the critique back in.
//! Reuses the reference strategy rather than re-implementing turn management.

use agentspec_llm::{ChatMessage, LlmClientRegistry};
use async_trait::async_trait;

use crate::strategy::{EventSink, Invocation, LoopEvent, Response, Strategy};
use crate::strategies::reason_act::ReasonActStrategy;
use crate::tools::ToolRegistry;

const APPROVAL_MARKER: &str = "LGTM";

pub struct ReflexionStrategy;

impl ReflexionStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReflexionStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for ReflexionStrategy {
    fn name(&self) -> &'static str {
        "reflexion"
    }

    async fn execute(&self, invocation: Invocation, llm_clients: &LlmClientRegistry, tools: &ToolRegistry, on_event: &dyn EventSink) -> Response {
        let mut response = ReasonActStrategy::run(&invocation, llm_clients, tools, on_event).await;

        let mut critique_history = invocation.history.clone();
        critique_history.push(ChatMessage::assistant_text(response.output.clone()));
        let critique_invocation = Invocation {
            history: critique_history,
            input: format!("Critique the answer above against the original task. Reply with exactly `{APPROVAL_MARKER}` if it's correct and complete, otherwise explain what's wrong."),
            max_turns: 1,
            ..invocation.clone()
        };
        let critique = ReasonActStrategy::run(&critique_invocation, llm_clients, tools, on_event).await;
        on_event.on_event(LoopEvent::Validation { message: critique.output.clone() });

        if critique.output.trim() != APPROVAL_MARKER {
            let mut revise_history = invocation.history.clone();
            revise_history.push(ChatMessage::assistant_text(response.output.clone()));
            revise_history.push(ChatMessage::user_text(format!("Revise your answer to address this feedback: {}", critique.output)));
            let revise_invocation = Invocation { history: revise_history, input: invocation.input.clone(), ..invocation };
            let revised = ReasonActStrategy::run(&revise_invocation, llm_clients, tools, on_event).await;
            response.turns += revised.turns;
            response.usage.input_tokens += revised.usage.input_tokens;
            response.usage.output_tokens += revised.usage.output_tokens;
            response.duration += revised.duration;
            response.output = revised.output;
            response.truncated = response.truncated || revised.truncated;
            response.tool_calls.extend(revised.tool_calls);
        }

        response.turns += critique.turns;
        response.usage.input_tokens += critique.usage.input_tokens;
        response.usage.output_tokens += critique.usage.output_tokens;
        response.duration += critique.duration;
        response
    }
}
