//! The agentic loop (C9) and tool registry + executors (C10). Grounded on
//! the teacher's multi-agent coordination crate (`caliber-agents`): its
//! concurrency-safe-registry and delegation/handoff shapes generalize onto
//! strategy dispatch and tool lookup, even though none of its multi-agent
//! coordination primitives (memory regions, distributed locks, conflict
//! resolution) have a counterpart here — an agentic invocation runs one
//! strategy against one tool registry, it does not coordinate a swarm.

pub mod bridge;
pub mod strategies;
pub mod strategy;
pub mod tools;

pub use bridge::{command_allowlist, register_command_executor};
pub use strategies::{KeywordRouter, MapReduceStrategy, PlanExecuteStrategy, ReasonActStrategy, ReflexionStrategy, RouterStrategy, RoutingRule};
pub use strategy::{EventSink, Invocation, LoopEvent, NoopEventSink, Response, Strategy, ToolCallRecord};
pub use tools::{ToolCall, ToolCallResult, ToolRegistry};
