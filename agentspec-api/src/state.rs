//! Shared application state for the runtime HTTP server (§4.8). Grounded on
//! the teacher's `AppState` (`state.rs`): one `Clone`-able struct handed to
//! every Axum route, holding everything a handler needs besides the
//! request itself. Routes here take `State<AppState>` directly rather than
//! per-field `FromRef` extraction — the teacher's `impl_from_ref!` macro
//! existed to let a dozen unrelated route modules each pull one field out
//! independently; this server's routes all live in one module and share the
//! whole state.

use std::sync::Arc;
use std::time::Instant;

use agentspec_agents::strategies::{MapReduceStrategy, PlanExecuteStrategy, ReasonActStrategy, ReflexionStrategy};
use agentspec_agents::{Strategy, ToolRegistry};
use agentspec_core::event::EventEmitter;
use agentspec_llm::LlmClientRegistry;

use crate::agent_registry::{AgentRegistry, PipelineRegistry};
use crate::config::RuntimeConfig;
use crate::rate_limit::AuthFailureLimiter;
use crate::session::{MemoryStrategy, SessionStore};

/// Looks a `Strategy` implementation up by the name an `agent` resource's
/// `strategy` attribute names. Unknown names fall back to `reason_act`
/// rather than failing the request — an agent with a typo'd strategy name
/// still runs, just not the way its author intended, which is easier to
/// notice in a trace than a 500.
pub fn strategy_by_name(name: &str) -> Arc<dyn Strategy> {
    match name {
        "plan_execute" => Arc::new(PlanExecuteStrategy::new()),
        "reflexion" => Arc::new(ReflexionStrategy::new()),
        "map_reduce" => Arc::new(MapReduceStrategy::new()),
        _ => Arc::new(ReasonActStrategy::new()),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RuntimeConfig>,
    pub agents: Arc<AgentRegistry>,
    pub pipelines: Arc<PipelineRegistry>,
    pub llm_clients: Arc<LlmClientRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub sessions: Arc<dyn SessionStore>,
    pub memory: Arc<dyn MemoryStrategy>,
    pub events: Arc<dyn EventEmitter>,
    pub rate_limiter: Arc<AuthFailureLimiter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn agent_strategy(&self, strategy_name: &str) -> Arc<dyn Strategy> {
        strategy_by_name(strategy_name)
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
