//! The runtime HTTP API (§4.8, §6). Grounded on the teacher's
//! `create_api_router` (`routes/mod.rs`) for the overall "build one `Router`,
//! layer auth/CORS/trace/body-limit around it" shape, trimmed from a few
//! dozen resource routers onto the handful of agent/session endpoints this
//! spec actually names.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use agentspec_agents::strategy::{EventSink, LoopEvent, NoopEventSink, Response as StrategyResponse};
use agentspec_core::event::{new_correlation_id, Event, EventType};
use agentspec_llm::ChatMessage;

use crate::auth::authenticate;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionId;
use crate::state::AppState;

pub fn create_api_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;

    let protected = Router::new()
        .route("/v1/agents", get(list_agents))
        .route("/v1/agents/:name", get(get_agent))
        .route("/v1/agents/:name/invoke", post(invoke_agent))
        .route("/v1/agents/:name/stream", post(stream_agent))
        .route("/v1/agents/:name/sessions", post(create_session))
        .route("/v1/agents/:name/sessions/:id", post(continue_session).delete(close_session))
        .route("/v1/pipelines/:name/run", post(run_pipeline))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(RequestBodyLimitLayer::new(max_body_bytes)),
        )
        .with_state(state)
}

/// CORS allowlist from `RuntimeConfig::cors_origins` (§4.16). An empty list
/// denies all cross-origin requests rather than defaulting open, matching
/// the teacher's `ApiConfig::is_origin_allowed` fail-closed default.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new();
    }
    let allowed: Vec<axum::http::HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
        .allow_origin(AllowOrigin::list(allowed))
}

async fn auth_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let ip = addr.ip().to_string();
    let now = Instant::now();

    if let Some(retry_after) = state.rate_limiter.check(&ip, now) {
        return ApiError::rate_limited(retry_after).into_response();
    }

    let header = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok());

    match authenticate(&state.config, header) {
        Ok(()) => {
            state.rate_limiter.record_success(&ip, now);
            next.run(request).await
        }
        Err(error) => {
            if let Some(block_secs) = state.rate_limiter.record_failure(&ip, now) {
                tracing::warn!(%ip, block_secs, "ip blocked after repeated auth failures");
            }
            error.into_response()
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    agents: Vec<String>,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let agents = state.agents.list().into_iter().map(|a| a.fqn.clone()).collect();
    Json(HealthResponse { status: "ok", uptime_secs: state.uptime().as_secs(), agents })
}

#[derive(Serialize)]
struct AgentSummary {
    fqn: String,
    name: String,
    model: String,
    strategy: String,
}

async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentSummary>> {
    let agents = state
        .agents
        .list()
        .into_iter()
        .map(|a| AgentSummary { fqn: a.fqn.clone(), name: a.name.clone(), model: a.model.clone(), strategy: a.strategy.clone() })
        .collect();
    Json(agents)
}

async fn get_agent(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<AgentSummary>> {
    let agent = state.agents.resolve(&name)?;
    Ok(Json(AgentSummary { fqn: agent.fqn.clone(), name: agent.name.clone(), model: agent.model.clone(), strategy: agent.strategy.clone() }))
}

#[derive(Deserialize)]
struct InvokeRequest {
    input: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct InvokeResponse {
    output: String,
    turns: u32,
    truncated: bool,
    correlation_id: String,
}

async fn invoke_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<InvokeRequest>,
) -> ApiResult<Json<InvokeResponse>> {
    let correlation_id = new_correlation_id();
    let agent = state.agents.resolve(&name)?.clone();

    let history = match &request.session_id {
        Some(id) => state.memory.load(&SessionId::parse(id.clone())).await,
        None => Vec::new(),
    };

    state.events.emit(Event::new(EventType::InvokeStarted, correlation_id.clone(), json!({ "agent_fqn": agent.fqn })));

    let invocation = agent.seed_invocation(request.input.clone(), history);
    let strategy = state.agent_strategy(&agent.strategy);
    let response = strategy.execute(invocation, &state.llm_clients, &state.tools, &NoopEventSink).await;

    if let Some(id) = &request.session_id {
        let session = SessionId::parse(id.clone());
        state.memory.save(&session, ChatMessage::user_text(request.input)).await;
        state.memory.save(&session, ChatMessage::assistant_text(response.output.clone())).await;
    }

    state.events.emit(Event::new(
        EventType::InvokeCompleted,
        correlation_id.clone(),
        json!({ "agent_fqn": agent.fqn, "turns": response.turns, "truncated": response.truncated }),
    ));

    Ok(Json(InvokeResponse { output: response.output, turns: response.turns, truncated: response.truncated, correlation_id }))
}

/// Forwards each `LoopEvent` a `Strategy` emits onto an unbounded channel so
/// `stream_agent` can turn them into SSE frames as they happen, instead of
/// buffering the whole invocation and emitting one event at the end.
/// `send` on an unbounded channel never blocks, so `on_event` (a sync
/// trait method invoked from inside the loop, not an async context) can call
/// it directly; a dropped receiver (client disconnected) just makes it a
/// no-op.
struct ChannelEventSink {
    tx: tokio::sync::mpsc::UnboundedSender<StreamItem>,
}

impl EventSink for ChannelEventSink {
    fn on_event(&self, event: LoopEvent) {
        let _ = self.tx.send(StreamItem::Loop(event));
    }
}

/// What arrives on `stream_agent`'s channel: either a `LoopEvent` as the
/// strategy emits it, or the strategy's final `Response` once `execute`
/// returns. The two are threaded through the same channel so ordering
/// between the last loop event and the final payload is preserved.
enum StreamItem {
    Loop(LoopEvent),
    Finished(StrategyResponse),
}

fn loop_event_to_sse(event: LoopEvent) -> Option<SseEvent> {
    let sse = match event {
        LoopEvent::Thought { text } => SseEvent::default().event("thought").json_data(json!({ "text": text })).ok()?,
        LoopEvent::ToolCallStart { call_id, tool_name } => {
            SseEvent::default().event("tool_call_start").json_data(json!({ "call_id": call_id, "tool_name": tool_name })).ok()?
        }
        LoopEvent::ToolCallDelta { call_id, partial_arguments } => {
            SseEvent::default().event("tool_call_delta").json_data(json!({ "call_id": call_id, "partial_arguments": partial_arguments })).ok()?
        }
        LoopEvent::ToolCallEnd { call_id, is_error } => {
            SseEvent::default().event("tool_call_end").json_data(json!({ "call_id": call_id, "is_error": is_error })).ok()?
        }
        LoopEvent::ContentDelta { text } => SseEvent::default().event("token").json_data(json!({ "text": text })).ok()?,
        LoopEvent::Validation { message } => SseEvent::default().event("validation").json_data(json!({ "message": message })).ok()?,
        LoopEvent::Error { message } => SseEvent::default().event("error").json_data(json!({ "message": message })).ok()?,
        // `Done` carries no payload; the final `done` event is built from the
        // strategy's `Response` once `execute` returns, not from this marker.
        LoopEvent::Done => return None,
    };
    Some(sse)
}

/// Streams the invocation as Server-Sent Events (§6: named event types,
/// `data:` line carrying JSON, ordered `thought*, tool_call_start,
/// tool_call_delta*, tool_call_end, token*, validation?, done`). Runs the
/// strategy in a background task wired to a `ChannelEventSink` so each
/// `LoopEvent` reaches the client as the loop produces it, rather than
/// buffering the whole invocation and emitting a single `done` at the end.
async fn stream_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<InvokeRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let correlation_id = new_correlation_id();
    let agent = state.agents.resolve(&name)?.clone();

    let history = match &request.session_id {
        Some(id) => state.memory.load(&SessionId::parse(id.clone())).await,
        None => Vec::new(),
    };

    let invocation = agent.seed_invocation(request.input.clone(), history);
    let strategy = state.agent_strategy(&agent.strategy);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let loop_tx = tx.clone();

    let llm_clients = state.llm_clients.clone();
    let tools = state.tools.clone();
    let memory = state.memory.clone();
    let session_id = request.session_id.clone();
    let input = request.input;

    tokio::spawn(async move {
        let sink = ChannelEventSink { tx: loop_tx };
        let response = strategy.execute(invocation, &llm_clients, &tools, &sink).await;

        if let Some(id) = session_id {
            let session = SessionId::parse(id);
            memory.save(&session, ChatMessage::user_text(input)).await;
            memory.save(&session, ChatMessage::assistant_text(response.output.clone())).await;
        }

        let _ = tx.send(StreamItem::Finished(response));
    });

    let stream = UnboundedReceiverStream::new(rx).filter_map(move |item| {
        let correlation_id = correlation_id.clone();
        async move {
            match item {
                StreamItem::Loop(event) => loop_event_to_sse(event).map(Ok),
                StreamItem::Finished(response) => {
                    let payload = json!({
                        "output": response.output,
                        "turns": response.turns,
                        "truncated": response.truncated,
                        "correlation_id": correlation_id,
                    });
                    let event =
                        SseEvent::default().event("done").json_data(payload).unwrap_or_else(|_| SseEvent::default().event("error").data("serialization failed"));
                    Some(Ok(event))
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(axum::response::sse::KeepAlive::new().interval(Duration::from_secs(15))))
}

#[derive(Deserialize)]
struct PipelineRunRequest {
    input: String,
}

#[derive(Serialize)]
struct PipelineRunResponse {
    output: String,
    steps_run: usize,
    correlation_id: String,
}

/// Runs a pipeline's steps sequentially, feeding each step's output in as
/// the next step's input (§3's `pipeline` resource carries no other
/// composition mode). Failure on any step aborts the remaining steps
/// rather than running them against stale input.
async fn run_pipeline(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<PipelineRunRequest>,
) -> ApiResult<Json<PipelineRunResponse>> {
    let correlation_id = new_correlation_id();
    let steps = state.pipelines.steps(&name)?.to_vec();

    let mut current_input = request.input;
    let mut steps_run = 0;

    for step_agent in &steps {
        let agent = state.agents.resolve(step_agent)?.clone();
        let invocation = agent.seed_invocation(current_input.clone(), Vec::new());
        let strategy = state.agent_strategy(&agent.strategy);
        let response = strategy.execute(invocation, &state.llm_clients, &state.tools, &NoopEventSink).await;
        current_input = response.output;
        steps_run += 1;
    }

    Ok(Json(PipelineRunResponse { output: current_input, steps_run, correlation_id }))
}

#[derive(Serialize)]
struct SessionResponse {
    id: String,
}

async fn create_session(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<SessionResponse>> {
    let agent = state.agents.resolve(&name)?;
    let record = state.sessions.create(&agent.fqn, state.config.clock.now_epoch_secs());
    Ok(Json(SessionResponse { id: record.id.to_string() }))
}

async fn continue_session(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(request): Json<InvokeRequest>,
) -> ApiResult<Json<InvokeResponse>> {
    let mut request = request;
    request.session_id = Some(id.clone());
    let session = SessionId::parse(id);
    state.sessions.touch(&session, state.config.clock.now_epoch_secs())?;
    invoke_agent(State(state), Path(name), Json(request)).await
}

async fn close_session(State(state): State<AppState>, Path((_name, id)): Path<(String, String)>) -> ApiResult<StatusCode> {
    let session = SessionId::parse(id);

    // Clear conversation memory first; if the session-record delete then
    // fails, the caller must still see an error rather than a silent
    // partial close (§4.11).
    state.memory.clear(&session).await;
    state.sessions.delete(&session)?;
    Ok(StatusCode::NO_CONTENT)
}
