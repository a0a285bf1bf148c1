//! Session lifecycle and conversation memory (§4.11). Grounded on the
//! teacher's concurrency-safe registry shape (`DashMap`-backed, as in
//! `rate_limit.rs`) rather than its `LockData`/typestate machinery, which
//! models cross-agent resource locks — a different problem from one
//! session's own conversation history.
//!
//! This pass implements `SessionStore` in-memory only. The remote
//! key-value-store backing described by the spec (atomic list-append with
//! TTL refresh, single-blob-to-list migration on first read) is left as a
//! trait boundary: `SessionStore` already speaks in terms of "append a
//! message, read the whole list back", which is exactly the contract a
//! remote-backed implementation would also satisfy. No remote store crate
//! is wired up in this pass; see DESIGN.md.

use std::collections::VecDeque;
use std::sync::Arc;

use agentspec_llm::{ChatMessage, CompletionRequest, LlmClientRegistry};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::DashMap;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::{ApiError, ApiResult};

/// An opaque, secret-bearing session identifier: 16 cryptographically random
/// bytes, base64url (no padding), prefixed `sess_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        let encoded = URL_SAFE_NO_PAD.encode(bytes);
        Self(format!("sess_{encoded}"))
    }

    pub fn parse(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SessionId {
    /// Constant-time: session IDs are secrets, per §4.11.
    fn eq(&self, other: &str) -> bool {
        let a = self.0.as_bytes();
        let b = other.as_bytes();
        a.len() == b.len() && bool::from(a.ct_eq(b))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub agent_fqn: String,
    pub created_at: i64,
    pub last_touched_at: i64,
}

/// Session-level CRUD, independent of what memory strategy the session
/// uses. Every operation must be safe under concurrent callers.
pub trait SessionStore: Send + Sync {
    fn create(&self, agent_fqn: &str, now: i64) -> SessionRecord;
    fn get(&self, id: &SessionId) -> Option<SessionRecord>;
    fn list(&self, agent_fqn: &str) -> Vec<SessionRecord>;
    fn touch(&self, id: &SessionId, now: i64) -> ApiResult<()>;
    fn delete(&self, id: &SessionId) -> ApiResult<()>;
}

pub struct InMemorySessionStore {
    records: DashMap<SessionId, SessionRecord>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self { records: DashMap::new() }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, agent_fqn: &str, now: i64) -> SessionRecord {
        let id = SessionId::generate();
        let record = SessionRecord { id: id.clone(), agent_fqn: agent_fqn.to_string(), created_at: now, last_touched_at: now };
        self.records.insert(id, record.clone());
        record
    }

    fn get(&self, id: &SessionId) -> Option<SessionRecord> {
        self.records.get(id).map(|entry| entry.clone())
    }

    fn list(&self, agent_fqn: &str) -> Vec<SessionRecord> {
        self.records.iter().filter(|entry| entry.agent_fqn == agent_fqn).map(|entry| entry.clone()).collect()
    }

    fn touch(&self, id: &SessionId, now: i64) -> ApiResult<()> {
        match self.records.get_mut(id) {
            Some(mut entry) => {
                entry.last_touched_at = now;
                Ok(())
            }
            None => Err(ApiError::session_not_found(id.as_str())),
        }
    }

    fn delete(&self, id: &SessionId) -> ApiResult<()> {
        self.records.remove(id).map(|_| ()).ok_or_else(|| ApiError::session_not_found(id.as_str()))
    }
}

/// The `{Load, Save, Clear}` contract both memory strategies implement
/// (§4.11). `Save` appends; it does not replace the stored history.
#[async_trait::async_trait]
pub trait MemoryStrategy: Send + Sync {
    async fn load(&self, session: &SessionId) -> Vec<ChatMessage>;
    async fn save(&self, session: &SessionId, message: ChatMessage);
    async fn clear(&self, session: &SessionId);
}

/// Backing storage shared by both memory strategies: a plain per-session
/// message list, each behind its own `tokio::sync::Mutex` so a whole
/// save — including, for `SummarizingMemory`, the `await` on an LLM call in
/// the middle of it — runs as one critical section. Two lock acquisitions
/// (append, then separately replace) would let a concurrent save's message
/// land in between and then be silently overwritten; holding one lock for
/// the full read-modify-write is what actually serializes concurrent saves
/// against the same session.
#[derive(Default)]
struct MemoryBackend {
    sessions: DashMap<SessionId, Arc<tokio::sync::Mutex<VecDeque<ChatMessage>>>>,
}

impl MemoryBackend {
    fn session_lock(&self, session: &SessionId) -> Arc<tokio::sync::Mutex<VecDeque<ChatMessage>>> {
        self.sessions.entry(session.clone()).or_default().clone()
    }

    async fn load(&self, session: &SessionId) -> Vec<ChatMessage> {
        let Some(lock) = self.sessions.get(session).map(|entry| entry.clone()) else {
            return Vec::new();
        };
        lock.lock().await.iter().cloned().collect()
    }

    fn clear(&self, session: &SessionId) {
        self.sessions.remove(session);
    }
}

/// Drops the oldest messages once the conversation exceeds `cap` entries.
pub struct SlidingWindowMemory {
    backend: MemoryBackend,
    cap: usize,
}

impl SlidingWindowMemory {
    pub fn new(cap: usize) -> Self {
        Self { backend: MemoryBackend::default(), cap }
    }
}

#[async_trait::async_trait]
impl MemoryStrategy for SlidingWindowMemory {
    async fn load(&self, session: &SessionId) -> Vec<ChatMessage> {
        self.backend.load(session).await
    }

    async fn save(&self, session: &SessionId, message: ChatMessage) {
        let lock = self.backend.session_lock(session);
        let mut messages = lock.lock().await;
        messages.push_back(message);
        while messages.len() > self.cap {
            messages.pop_front();
        }
    }

    async fn clear(&self, session: &SessionId) {
        self.backend.clear(session);
    }
}

/// Once the conversation crosses `threshold` messages, asks the LLM to
/// summarize everything but the most recent `keep_recent` messages and
/// replaces that oldest segment with the single summary message.
pub struct SummarizingMemory {
    backend: MemoryBackend,
    threshold: usize,
    keep_recent: usize,
    llm_clients: Arc<LlmClientRegistry>,
    client_name: String,
    model: String,
}

impl SummarizingMemory {
    pub fn new(threshold: usize, keep_recent: usize, llm_clients: Arc<LlmClientRegistry>, client_name: impl Into<String>, model: impl Into<String>) -> Self {
        Self { backend: MemoryBackend::default(), threshold, keep_recent, llm_clients, client_name: client_name.into(), model: model.into() }
    }

    async fn summarize(&self, segment: &[ChatMessage]) -> ChatMessage {
        let transcript = segment.iter().map(|m| format!("{:?}: {}", m.role, m.text())).collect::<Vec<_>>().join("\n");
        let request = CompletionRequest {
            model: self.model.clone(),
            system: Some("Summarize this conversation segment concisely, preserving facts the assistant will need later.".to_string()),
            messages: vec![ChatMessage::user_text(transcript)],
            tools: vec![],
            max_tokens: 512,
            temperature: None,
        };

        match self.llm_clients.complete(&self.client_name, request).await {
            Ok(response) => ChatMessage::assistant_text(format!("[summary of earlier conversation] {}", response.message.text())),
            Err(error) => {
                tracing::warn!(%error, "summarization call failed, retaining unsummarized segment marker");
                ChatMessage::assistant_text("[summary unavailable: earlier conversation omitted]")
            }
        }
    }
}

#[async_trait::async_trait]
impl MemoryStrategy for SummarizingMemory {
    async fn load(&self, session: &SessionId) -> Vec<ChatMessage> {
        self.backend.load(session).await
    }

    /// Holds the session's lock for the whole operation, including the
    /// `await` on `summarize()` — releasing it between the append and the
    /// rebuilt-list write-back would let a concurrent `save()` land in
    /// between and then be overwritten once this call finishes summarizing.
    async fn save(&self, session: &SessionId, message: ChatMessage) {
        let lock = self.backend.session_lock(session);
        let mut messages = lock.lock().await;
        messages.push_back(message);

        if messages.len() <= self.threshold {
            return;
        }

        let split_at = messages.len().saturating_sub(self.keep_recent);
        let oldest: Vec<ChatMessage> = messages.iter().take(split_at).cloned().collect();
        let recent: Vec<ChatMessage> = messages.iter().skip(split_at).cloned().collect();

        let summary = self.summarize(&oldest).await;
        messages.clear();
        messages.push_back(summary);
        messages.extend(recent);
    }

    async fn clear(&self, session: &SessionId) {
        self.backend.clear(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_carry_the_expected_prefix() {
        let id = SessionId::generate();
        assert!(id.as_str().starts_with("sess_"));
    }

    #[test]
    fn session_id_equality_is_exact() {
        let id = SessionId::generate();
        assert_eq!(&id, id.as_str());
        assert_ne!(&id, "sess_not-it");
    }

    #[test]
    fn store_create_get_touch_delete_round_trip() {
        let store = InMemorySessionStore::new();
        let record = store.create("pkg/agent/helper", 100);
        assert!(store.get(&record.id).is_some());
        assert!(store.touch(&record.id, 200).is_ok());
        assert_eq!(store.get(&record.id).unwrap().last_touched_at, 200);
        assert!(store.delete(&record.id).is_ok());
        assert!(store.get(&record.id).is_none());
    }

    #[test]
    fn double_delete_is_an_error_not_a_silent_noop() {
        let store = InMemorySessionStore::new();
        let record = store.create("pkg/agent/helper", 100);
        assert!(store.delete(&record.id).is_ok());
        assert!(store.delete(&record.id).is_err());
    }

    #[tokio::test]
    async fn sliding_window_drops_oldest_past_cap() {
        let memory = SlidingWindowMemory::new(2);
        let session = SessionId::generate();
        memory.save(&session, ChatMessage::user_text("one")).await;
        memory.save(&session, ChatMessage::user_text("two")).await;
        memory.save(&session, ChatMessage::user_text("three")).await;
        let loaded = memory.load(&session).await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].text(), "two");
        assert_eq!(loaded[1].text(), "three");
    }

    #[tokio::test]
    async fn clear_empties_the_conversation() {
        let memory = SlidingWindowMemory::new(10);
        let session = SessionId::generate();
        memory.save(&session, ChatMessage::user_text("hi")).await;
        memory.clear(&session).await;
        assert!(memory.load(&session).await.is_empty());
    }
}
