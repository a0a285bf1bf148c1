//! Runtime server configuration (§4.16), grounded on the teacher's
//! `AuthConfig::from_env`/`validate_for_production` split
//! (`caliber-api/src/auth.rs`) and `ApiConfig::from_env`
//! (`caliber-api/src/config.rs`) for CORS/hardening defaults — generalized
//! from JWT/API-key/tenant auth onto a single bearer key, and from a
//! request-volume rate limiter onto the auth-failure-only limiter §4.8 calls
//! for.

use std::sync::Arc;
use std::time::Duration;

use agentspec_secrets::Secret;

use crate::error::{ApiError, ApiResult};

/// Abstraction over wall-clock time so lock staleness, rate-limiter windows,
/// and session TTL refresh can be tested without sleeping. Mirrors the
/// teacher's `JwtClock` trait, generalized beyond JWT validation.
pub trait Clock: Send + Sync {
    fn now_epoch_secs(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

const INSECURE_DEFAULT_KEY: &str = "INSECURE_DEFAULT_KEY_CHANGE_IN_PRODUCTION";

/// Server-wide configuration for the runtime HTTP server (§4.8).
#[derive(Clone)]
pub struct RuntimeConfig {
    /// The configured bearer key. `None` only when `no_auth` is also set.
    pub bearer_key: Option<Secret>,
    /// Allows unauthenticated access when `bearer_key` is empty. Must be set
    /// explicitly; an empty key without this flag rejects every request.
    pub no_auth: bool,

    pub cors_origins: Vec<String>,

    pub read_header_timeout: Duration,
    pub read_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_body_bytes: usize,

    pub auth_failure_threshold: u32,
    pub auth_failure_window: Duration,
    pub auth_block_duration: Duration,

    pub bind_addr: String,

    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("bearer_key", &self.bearer_key.as_ref().map(|_| "[REDACTED]"))
            .field("no_auth", &self.no_auth)
            .field("cors_origins", &self.cors_origins)
            .field("read_header_timeout", &self.read_header_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("auth_failure_threshold", &self.auth_failure_threshold)
            .field("auth_failure_window", &self.auth_failure_window)
            .field("auth_block_duration", &self.auth_block_duration)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bearer_key: Some(Secret::new(INSECURE_DEFAULT_KEY)),
            no_auth: false,
            cors_origins: Vec::new(),
            read_header_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(120),
            max_body_bytes: 10 * 1024 * 1024,
            auth_failure_threshold: 10,
            auth_failure_window: Duration::from_secs(60),
            auth_block_duration: Duration::from_secs(5 * 60),
            bind_addr: "127.0.0.1:8787".to_string(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl RuntimeConfig {
    /// Reads configuration from the environment.
    ///
    /// - `AGENTSPEC_BEARER_KEY`: the bearer key clients must present.
    /// - `AGENTSPEC_NO_AUTH`: `"true"` to allow unauthenticated access when no key is set.
    /// - `AGENTSPEC_CORS_ORIGINS`: comma-separated allowed origins (empty = deny all).
    /// - `AGENTSPEC_BIND_ADDR`: listen address (default `127.0.0.1:8787`).
    /// - `AGENTSPEC_MAX_BODY_BYTES`: request body cap (default 10 MiB).
    pub fn from_env() -> Self {
        let no_auth = std::env::var("AGENTSPEC_NO_AUTH").ok().map(|s| s.eq_ignore_ascii_case("true")).unwrap_or(false);

        let bearer_key = match std::env::var("AGENTSPEC_BEARER_KEY") {
            Ok(key) if !key.is_empty() => Some(Secret::new(key)),
            _ if no_auth => None,
            _ => Some(Secret::new(INSECURE_DEFAULT_KEY)),
        };

        let cors_origins = std::env::var("AGENTSPEC_CORS_ORIGINS")
            .ok()
            .map(|s| s.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect())
            .unwrap_or_default();

        Self {
            bearer_key,
            no_auth,
            cors_origins,
            max_body_bytes: std::env::var("AGENTSPEC_MAX_BODY_BYTES").ok().and_then(|s| s.parse().ok()).unwrap_or(10 * 1024 * 1024),
            bind_addr: std::env::var("AGENTSPEC_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8787".to_string()),
            ..Default::default()
        }
    }

    /// Hard-fails on insecure defaults when `AGENTSPEC_ENVIRONMENT=production`;
    /// otherwise only warns. Same split as the teacher's
    /// `AuthConfig::validate_for_production`.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let is_production = std::env::var("AGENTSPEC_ENVIRONMENT").map(|v| v.eq_ignore_ascii_case("production")).unwrap_or(false);

        match &self.bearer_key {
            None if !self.no_auth => {
                return Err(ApiError::invalid_input("no bearer key configured and AGENTSPEC_NO_AUTH is not set; the server would reject every request"));
            }
            Some(key) if key.expose() == INSECURE_DEFAULT_KEY => {
                if is_production {
                    return Err(ApiError::invalid_input("cannot start in production with the insecure default bearer key; set AGENTSPEC_BEARER_KEY"));
                }
                tracing::warn!("using the insecure default bearer key; set AGENTSPEC_BEARER_KEY before deploying");
            }
            None if is_production => {
                tracing::warn!("AGENTSPEC_NO_AUTH is set in a production environment; every endpoint is unauthenticated");
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_warns_but_does_not_fail_outside_production() {
        let config = RuntimeConfig::default();
        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn no_key_without_no_auth_flag_is_always_rejected() {
        let config = RuntimeConfig { bearer_key: None, no_auth: false, ..Default::default() };
        assert!(config.validate_for_production().is_err());
    }
}
