//! Plan-execute strategy (§4.9): a first turn asks the model for a plan
//! (not executed as tool calls, just a content message the reference loop
//! can read back), then a second reason/act pass executes it. Reuses the
//! reference strategy's loop rather than re-implementing turn management.

use agentspec_llm::LlmClientRegistry;
use async_trait::async_trait;

use crate::strategy::{EventSink, Invocation, LoopEvent, Response, Strategy};
use crate::strategies::reason_act::ReasonActStrategy;
use crate::tools::ToolRegistry;

pub struct PlanExecuteStrategy;

impl PlanExecuteStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlanExecuteStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for PlanExecuteStrategy {
    fn name(&self) -> &'static str {
        "plan-execute"
    }

    async fn execute(&self, invocation: Invocation, llm_clients: &LlmClientRegistry, tools: &ToolRegistry, on_event: &dyn EventSink) -> Response {
        let plan_invocation = Invocation {
            input: format!("Produce a short numbered plan before acting. Task: {}", invocation.input),
            max_turns: 1,
            ..invocation.clone()
        };
        let plan = ReasonActStrategy::run(&plan_invocation, llm_clients, tools, on_event).await;
        on_event.on_event(LoopEvent::Thought { text: plan.output.clone() });

        let mut execute_invocation = invocation;
        execute_invocation.history.push(agentspec_llm::ChatMessage::assistant_text(format!("Plan:\n{}", plan.output)));

        let mut response = ReasonActStrategy::run(&execute_invocation, llm_clients, tools, on_event).await;
        response.turns += plan.turns;
        response.usage.input_tokens += plan.usage.input_tokens;
        response.usage.output_tokens += plan.usage.output_tokens;
        response.duration += plan.duration;
        response
    }
}
