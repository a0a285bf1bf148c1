//! Event emitter implementations (§4.13). `agentspec_core::event` defines the
//! `Event`/`EventEmitter` contract and ships `NoopEmitter`; this crate owns the
//! sinks that actually do I/O.

use std::sync::Mutex;
use std::time::Duration;

use agentspec_core::event::{Event, EventEmitter};

/// Collects every emitted event in memory, for test assertions. Mirrors how
/// the teacher's webhook store keeps delivery stats in an in-process
/// `RwLock`/`Mutex`-guarded `Vec` rather than external storage.
#[derive(Default)]
pub struct InMemoryEmitter {
    events: Mutex<Vec<Event>>,
}

impl InMemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("in-memory emitter lock poisoned").clone()
    }

    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().expect("in-memory emitter lock poisoned"))
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("in-memory emitter lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventEmitter for InMemoryEmitter {
    fn emit(&self, event: Event) {
        self.events.lock().expect("in-memory emitter lock poisoned").push(event);
    }
}

/// Emits each event as a structured `tracing` record at `info` level.
pub struct LoggerEmitter;

impl EventEmitter for LoggerEmitter {
    fn emit(&self, event: Event) {
        tracing::info!(
            event_type = ?event.event_type,
            correlation_id = %event.correlation_id,
            timestamp = %event.timestamp,
            data = %event.data,
            "lifecycle event"
        );
    }
}

/// POSTs each event as JSON to a fixed URL, retrying with exponential backoff
/// on failure (1s, 2s, 4s — three attempts total), matching the teacher's own
/// `deliver_webhook` delivery loop
/// (`caliber-api/src/routes/webhooks.rs`). `EventEmitter::emit` is
/// synchronous, so delivery itself runs on a detached `tokio::spawn` task;
/// emit never blocks the caller on network I/O and a delivery failure is
/// only ever logged, never surfaced back to the emitting code path.
pub struct WebhookEmitter {
    client: reqwest::Client,
    url: String,
}

impl WebhookEmitter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder().timeout(Duration::from_secs(10)).build().expect("failed to build webhook http client"),
            url: url.into(),
        }
    }
}

impl EventEmitter for WebhookEmitter {
    fn emit(&self, event: Event) {
        let client = self.client.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            deliver(&client, &url, &event).await;
        });
    }
}

async fn deliver(client: &reqwest::Client, url: &str, event: &Event) {
    let mut delay = Duration::from_secs(1);
    let max_attempts = 3;

    for attempt in 1..=max_attempts {
        match client.post(url).json(event).send().await {
            Ok(response) if response.status().is_success() => return,
            Ok(response) => {
                tracing::warn!(status = %response.status(), url, attempt, "webhook event delivery returned a non-success status");
            }
            Err(e) => {
                tracing::warn!(error = %e, url, attempt, "webhook event delivery failed");
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }

    tracing::error!(url, correlation_id = %event.correlation_id, "webhook event delivery exhausted all retries");
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::event::{new_correlation_id, EventType};

    #[test]
    fn in_memory_emitter_collects_events() {
        let sink = InMemoryEmitter::new();
        sink.emit(Event::new(EventType::ApplyStarted, new_correlation_id(), serde_json::json!({})));
        sink.emit(Event::new(EventType::ApplyCompleted, new_correlation_id(), serde_json::json!({})));
        assert_eq!(sink.len(), 2);
        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert!(sink.is_empty());
    }
}
