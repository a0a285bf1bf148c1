//! The runtime HTTP server (C8) and session/memory layer (C11): the
//! process started by `agentspec run` that serves invocations against a
//! loaded package over HTTP.

pub mod agent_registry;
pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod session;
pub mod state;

pub use agent_registry::{AgentDescriptor, AgentRegistry, PipelineRegistry};
pub use auth::authenticate;
pub use config::{Clock, FixedClock, RuntimeConfig, SystemClock};
pub use error::{ApiError, ApiResult};
pub use rate_limit::AuthFailureLimiter;
pub use routes::create_api_router;
pub use session::{InMemorySessionStore, MemoryStrategy, SessionId, SessionRecord, SessionStore, SlidingWindowMemory, SummarizingMemory};
pub use state::AppState;
