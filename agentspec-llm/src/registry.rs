//! Registry of configured LLM clients, keyed by the name a `client`
//! resource declares (§3's `Client` kind). Grounded on the teacher's
//! `ProviderRegistry` (`caliber-llm/src/lib.rs`), trimmed of its
//! capability-based auto-routing (`RoundRobin`/`LeastLatency`/...): an
//! AgentSpec agent always names its client explicitly, so there is nothing
//! to route between. What transfers is the register-by-name-then-look-up
//! shape, plus a circuit breaker per client for resilience.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::circuit::{CircuitBreaker, CircuitBreakerConfig};
use crate::client::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmResult};

pub struct LlmClientRegistry {
    clients: RwLock<HashMap<String, Arc<dyn LlmClient>>>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl LlmClientRegistry {
    pub fn new() -> Self {
        Self { clients: RwLock::new(HashMap::new()), breakers: RwLock::new(HashMap::new()) }
    }

    pub fn register(&self, client: Arc<dyn LlmClient>) {
        let id = client.provider_id().to_string();
        self.clients.write().expect("llm client registry lock poisoned").insert(id.clone(), client);
        self.breakers
            .write()
            .expect("llm client registry lock poisoned")
            .insert(id, Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())));
    }

    pub fn get(&self, name: &str) -> LlmResult<Arc<dyn LlmClient>> {
        self.clients
            .read()
            .expect("llm client registry lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| LlmError::ProviderNotConfigured { provider: name.to_string() })
    }

    pub fn names(&self) -> Vec<String> {
        self.clients.read().expect("llm client registry lock poisoned").keys().cloned().collect()
    }

    /// Dispatch through the named client, tripping its circuit breaker on
    /// failure and short-circuiting with `ProviderNotConfigured` while open.
    pub async fn complete(&self, name: &str, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let client = self.get(name)?;
        let breaker = self.breakers.read().expect("llm client registry lock poisoned").get(name).cloned();

        if let Some(breaker) = &breaker {
            if !breaker.is_allowed() {
                return Err(LlmError::ProviderError {
                    provider: name.to_string(),
                    message: "circuit open".to_string(),
                });
            }
        }

        let result = client.complete(request).await;
        if let Some(breaker) = &breaker {
            match &result {
                Ok(_) => breaker.record_success(),
                Err(_) => breaker.record_failure(),
            }
        }
        result
    }
}

impl Default for LlmClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatMessage, Role, StopReason, TokenUsage};
    use async_trait::async_trait;

    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        fn provider_id(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
            Ok(CompletionResponse {
                message: ChatMessage { role: Role::Assistant, content: request.messages.last().unwrap().content.clone() },
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        }
    }

    #[tokio::test]
    async fn registered_client_is_reachable_by_name() {
        let registry = LlmClientRegistry::new();
        registry.register(Arc::new(EchoClient));
        assert_eq!(registry.names(), vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn unknown_client_is_an_error() {
        let registry = LlmClientRegistry::new();
        assert!(registry.get("ghost").is_err());
    }

    #[tokio::test]
    async fn complete_routes_through_the_named_client() {
        let registry = LlmClientRegistry::new();
        registry.register(Arc::new(EchoClient));
        let request = CompletionRequest {
            model: "echo-1".to_string(),
            system: None,
            messages: vec![ChatMessage::user_text("hi")],
            tools: vec![],
            max_tokens: 10,
            temperature: None,
        };
        let response = registry.complete("echo", request).await.unwrap();
        assert_eq!(response.message.text(), "hi");
    }
}
