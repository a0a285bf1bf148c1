//! HTTP error mapping for the runtime server (§4.8/§7). Wraps
//! `agentspec_core::error::AgentSpecError` rather than defining a parallel
//! error type, since every failure this crate can produce already has a
//! variant there (`RuntimeError` for request-facing failures, `Policy`/
//! `Secrets`/`Security` for failures surfaced from the agentic loop).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use agentspec_core::error::{AgentSpecError, RuntimeError};

#[derive(Debug, Clone)]
pub struct ApiError(pub AgentSpecError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self(AgentSpecError::Runtime(RuntimeError::InvalidInput(message.into())))
    }

    pub fn agent_not_found(fqn: impl Into<String>) -> Self {
        Self(AgentSpecError::Runtime(RuntimeError::AgentNotFound { fqn: fqn.into() }))
    }

    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self(AgentSpecError::Runtime(RuntimeError::SessionNotFound { id: id.into() }))
    }

    pub fn authentication_required() -> Self {
        Self(AgentSpecError::Runtime(RuntimeError::AuthenticationRequired))
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self(AgentSpecError::Runtime(RuntimeError::RateLimited { retry_after_secs }))
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self(AgentSpecError::Runtime(RuntimeError::NotReady(message.into())))
    }
}

impl From<AgentSpecError> for ApiError {
    fn from(e: AgentSpecError) -> Self {
        Self(e)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after_secs) = match &self.0 {
            AgentSpecError::Runtime(RuntimeError::AgentNotFound { .. }) => (StatusCode::NOT_FOUND, None),
            AgentSpecError::Runtime(RuntimeError::SessionNotFound { .. }) => (StatusCode::NOT_FOUND, None),
            AgentSpecError::Runtime(RuntimeError::AuthenticationRequired) => (StatusCode::UNAUTHORIZED, None),
            AgentSpecError::Runtime(RuntimeError::RateLimited { retry_after_secs }) => (StatusCode::TOO_MANY_REQUESTS, Some(*retry_after_secs)),
            AgentSpecError::Runtime(RuntimeError::InvalidInput(_)) => (StatusCode::BAD_REQUEST, None),
            AgentSpecError::Runtime(RuntimeError::ValidationFailed(_)) => (StatusCode::BAD_REQUEST, None),
            AgentSpecError::Runtime(RuntimeError::NotReady(_)) => (StatusCode::SERVICE_UNAVAILABLE, None),
            AgentSpecError::Policy(_) => (StatusCode::FORBIDDEN, None),
            AgentSpecError::Secrets(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
            AgentSpecError::Security(_) => (StatusCode::FORBIDDEN, None),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error serving request");
        }

        let mut response = (status, Json(ErrorBody { error: self.0.to_string(), retry_after_secs })).into_response();
        if let Some(secs) = retry_after_secs {
            if let Ok(value) = axum::http::HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}
