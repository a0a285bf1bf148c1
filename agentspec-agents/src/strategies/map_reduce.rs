//! Map-reduce strategy (§4.9): fans a single input across a skill set (one
//! reason/act run per mapped invocation, dispatched concurrently via the
//! same machinery the reference loop uses for tool calls) and reduces the
//! results with one final LLM call.

use agentspec_llm::{ChatMessage, LlmClientRegistry};
use async_trait::async_trait;

use crate::strategy::{EventSink, Invocation, Response, Strategy};
use crate::strategies::reason_act::ReasonActStrategy;
use crate::tools::ToolRegistry;

pub struct MapReduceStrategy {
    /// One invocation per mapped skill/sub-agent; each receives the same
    /// input but can carry its own `client_name`/`model`/`system_prompt`.
    map_invocations: Vec<Invocation>,
}

impl MapReduceStrategy {
    pub fn new(map_invocations: Vec<Invocation>) -> Self {
        Self { map_invocations }
    }
}

#[async_trait]
impl Strategy for MapReduceStrategy {
    fn name(&self) -> &'static str {
        "map-reduce"
    }

    async fn execute(&self, invocation: Invocation, llm_clients: &LlmClientRegistry, tools: &ToolRegistry, on_event: &dyn EventSink) -> Response {
        let mapped: Vec<Invocation> = self
            .map_invocations
            .iter()
            .map(|template| {
                let mut mapped = template.clone();
                mapped.input = invocation.input.clone();
                mapped.history = invocation.history.clone();
                mapped
            })
            .collect();

        let futures = mapped.iter().map(|mapped| ReasonActStrategy::run(mapped, llm_clients, tools, on_event));
        let map_results = futures_util::future::join_all(futures).await;

        let mut reduce_history = invocation.history.clone();
        for (i, result) in map_results.iter().enumerate() {
            reduce_history.push(ChatMessage::assistant_text(format!("[branch {i}] {}", result.output)));
        }
        let reduce_invocation = Invocation {
            history: reduce_history,
            input: format!("Synthesize the branch outputs above into one answer for: {}", invocation.input),
            max_turns: 1,
            ..invocation
        };
        let mut response = ReasonActStrategy::run(&reduce_invocation, llm_clients, tools, on_event).await;

        for result in &map_results {
            response.turns += result.turns;
            response.usage.input_tokens += result.usage.input_tokens;
            response.usage.output_tokens += result.usage.output_tokens;
            response.duration += result.duration;
            response.truncated = response.truncated || result.truncated;
        }
        response.tool_calls.extend(map_results.into_iter().flat_map(|r| r.tool_calls));
        response
    }
}
