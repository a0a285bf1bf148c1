//! Event emitter implementations (§4.13).
//!
//! `agentspec_core::event` defines the event model and the `EventEmitter`
//! contract (and ships the trivial `NoopEmitter`). This crate provides the
//! sinks that perform actual I/O: an in-memory collector for tests, a
//! `tracing`-backed logger sink, and a retrying webhook sink.

mod sink;

pub use sink::{InMemoryEmitter, LoggerEmitter, WebhookEmitter};

pub use agentspec_core::event::{new_correlation_id, Event, EventEmitter, EventType, NoopEmitter};
