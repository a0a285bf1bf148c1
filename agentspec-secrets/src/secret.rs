//! A resolved secret value. Wrapped so `Debug`/`Display` never leak it by
//! accident, matching the teacher's `JwtSecret` wrapper
//! (`caliber-api/src/auth.rs`) — same `secrecy::SecretString` backing, same
//! "never format the inner value" discipline, generalized from one JWT
//! signing key onto any secret a package declares.

use secrecy::{ExposeSecret, SecretString};

#[derive(Clone)]
pub struct Secret(SecretString);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::new(value.into().into()))
    }

    /// Use sparingly — only at the point the value is actually needed
    /// (an HTTP header, a subprocess environment variable).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED, {} chars])", self.len())
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// How a secret is declared in source (a `secret` resource's `provider`/`key`
/// attributes, per the DSL's `Kind::Secret` schema): by environment variable
/// name, or by a path into an external store. Never a literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef {
    Env { var: String },
    ExternalStore { path: String },
}

impl SecretRef {
    pub fn name(&self) -> &str {
        match self {
            SecretRef::Env { var } => var,
            SecretRef::ExternalStore { path } => path,
        }
    }

    /// Builds a reference from a `secret` resource's `provider`/`key`
    /// attributes. Returns `None` if either is missing or `provider` names
    /// something other than `env`/`external_store`.
    pub fn from_attrs(provider: &str, key: &str) -> Option<Self> {
        match provider {
            "env" => Some(SecretRef::Env { var: key.to_string() }),
            "external_store" | "vault" | "file" => Some(SecretRef::ExternalStore { path: key.to_string() }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_never_print_the_value() {
        let secret = Secret::new("super-secret-value");
        assert!(!format!("{secret:?}").contains("super-secret-value"));
        assert!(!format!("{secret}").contains("super-secret-value"));
    }

    #[test]
    fn unknown_provider_is_not_a_ref() {
        assert_eq!(SecretRef::from_attrs("carrier-pigeon", "k"), None);
    }
}
