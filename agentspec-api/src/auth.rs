//! Bearer-key authentication (§4.8). Every protected endpoint requires
//! `Authorization: Bearer <key>`. Grounded on the teacher's `auth.rs` for the
//! overall shape (a config-held secret, a dedicated authenticate function,
//! `AuthConfig`'s "empty secret is still a secret, compare it anyway" care
//! about not short-circuiting) but reduced to a single shared key — the spec
//! has no JWT, API-key-per-user, tenant, or WorkOS concept. Constant-time
//! comparison uses `subtle::ConstantTimeEq`, the same crate the pack's
//! `surrealdb-surrealdb` uses for its own bearer-grant comparison
//! (`core/src/iam/signin.rs`), rather than `==` or a length-short-circuiting
//! loop.

use subtle::ConstantTimeEq;

use crate::config::RuntimeConfig;
use crate::error::ApiError;

/// Extracts the bearer token from an `Authorization` header value, if the
/// header uses the `Bearer` scheme.
pub fn extract_bearer_token(header_value: Option<&str>) -> Option<&str> {
    header_value?.strip_prefix("Bearer ")
}

/// Checks `presented` against the configured key. A length mismatch still
/// costs one constant-time comparison (against a same-length reduction of
/// `presented`) before returning, so the total work done doesn't vary with
/// how close a guess's length is to the real key's.
fn constant_time_eq(expected: &str, presented: &str) -> bool {
    let expected = expected.as_bytes();
    let presented = presented.as_bytes();
    if expected.len() != presented.len() {
        let padded: Vec<u8> = presented.iter().cycle().take(expected.len()).copied().collect();
        let _ = expected.ct_eq(&padded);
        return false;
    }
    expected.ct_eq(presented).into()
}

/// Authenticates a request against the configured bearer key.
///
/// Returns `Ok(())` on success. When `config.no_auth` is set and no key is
/// configured, every request is accepted (the caller is responsible for
/// having logged the startup warning `RuntimeConfig::validate_for_production`
/// would have raised in production).
pub fn authenticate(config: &RuntimeConfig, authorization_header: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = &config.bearer_key else {
        if config.no_auth {
            return Ok(());
        }
        return Err(ApiError::authentication_required());
    };

    let Some(presented) = extract_bearer_token(authorization_header) else {
        return Err(ApiError::authentication_required());
    };

    if constant_time_eq(expected.expose(), presented) {
        Ok(())
    } else {
        Err(ApiError::authentication_required())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_secrets::Secret;

    fn config_with_key(key: &str) -> RuntimeConfig {
        RuntimeConfig { bearer_key: Some(Secret::new(key)), no_auth: false, ..Default::default() }
    }

    #[test]
    fn correct_key_authenticates() {
        let config = config_with_key("top-secret");
        assert!(authenticate(&config, Some("Bearer top-secret")).is_ok());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let config = config_with_key("top-secret");
        assert!(authenticate(&config, Some("Bearer wrong")).is_err());
    }

    #[test]
    fn missing_header_is_rejected() {
        let config = config_with_key("top-secret");
        assert!(authenticate(&config, None).is_err());
    }

    #[test]
    fn no_auth_flag_allows_unauthenticated_access() {
        let config = RuntimeConfig { bearer_key: None, no_auth: true, ..Default::default() };
        assert!(authenticate(&config, None).is_ok());
    }

    #[test]
    fn different_length_keys_are_rejected() {
        let config = config_with_key("a-long-secret-key");
        assert!(authenticate(&config, Some("Bearer short")).is_err());
    }
}
