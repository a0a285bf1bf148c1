//! Router strategy (§4.9): dispatches to a delegate agent chosen by a
//! routing rule. Grounded on the teacher's `DelegatedTask`/`DelegationResult`
//! pair (`lib.rs`) for the "hand this off to another agent, get back its
//! result" shape, generalized from inter-agent delegation onto picking which
//! `Invocation` to actually run through the reference loop.

use agentspec_llm::LlmClientRegistry;
use async_trait::async_trait;

use crate::strategy::{EventSink, Invocation, Response, Strategy};
use crate::strategies::reason_act::ReasonActStrategy;
use crate::tools::ToolRegistry;

/// Picks a delegate invocation (typically a different `client_name`/`model`/
/// `system_prompt` representing a specialized sub-agent) for the given
/// input. Implementations range from a static keyword match to another LLM
/// call that classifies the input.
pub trait RoutingRule: Send + Sync {
    fn route(&self, invocation: &Invocation) -> Invocation;
}

/// Routes by the first matching keyword in the input, falling back to the
/// original invocation when nothing matches.
pub struct KeywordRouter {
    routes: Vec<(String, Invocation)>,
}

impl KeywordRouter {
    pub fn new(routes: Vec<(String, Invocation)>) -> Self {
        Self { routes }
    }
}

impl RoutingRule for KeywordRouter {
    fn route(&self, invocation: &Invocation) -> Invocation {
        let lower = invocation.input.to_lowercase();
        for (keyword, delegate) in &self.routes {
            if lower.contains(&keyword.to_lowercase()) {
                let mut chosen = delegate.clone();
                chosen.input = invocation.input.clone();
                chosen.history = invocation.history.clone();
                return chosen;
            }
        }
        invocation.clone()
    }
}

pub struct RouterStrategy {
    rule: Box<dyn RoutingRule>,
}

impl RouterStrategy {
    pub fn new(rule: Box<dyn RoutingRule>) -> Self {
        Self { rule }
    }
}

#[async_trait]
impl Strategy for RouterStrategy {
    fn name(&self) -> &'static str {
        "router"
    }

    async fn execute(&self, invocation: Invocation, llm_clients: &LlmClientRegistry, tools: &ToolRegistry, on_event: &dyn EventSink) -> Response {
        let delegate = self.rule.route(&invocation);
        ReasonActStrategy::run(&delegate, llm_clients, tools, on_event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_invocation(input: &str) -> Invocation {
        Invocation {
            agent_fqn: "demo/agent/main".to_string(),
            client_name: "anthropic".to_string(),
            model: "claude".to_string(),
            system_prompt: None,
            history: vec![],
            input: input.to_string(),
            max_turns: 5,
            token_budget: None,
            temperature: None,
            max_tokens: 100,
        }
    }

    #[test]
    fn keyword_match_swaps_in_the_delegate_client() {
        let mut billing = base_invocation("");
        billing.client_name = "billing-specialist".to_string();
        let router = KeywordRouter::new(vec![("refund".to_string(), billing)]);
        let routed = router.route(&base_invocation("I need a refund for order 42"));
        assert_eq!(routed.client_name, "billing-specialist");
        assert_eq!(routed.input, "I need a refund for order 42");
    }

    #[test]
    fn no_match_falls_back_to_the_original_invocation() {
        let router = KeywordRouter::new(vec![]);
        let original = base_invocation("general question");
        let routed = router.route(&original);
        assert_eq!(routed.client_name, original.client_name);
    }
}
