//! Chained secret resolution (§4.12): a secret reference is tried against
//! each configured provider in turn, first success wins. Declared-by-reference
//! secrets (an env var name, or an external-store path) are never persisted
//! as literal values anywhere in IR, state, or exports — only the reference
//! is, resolution happens at call time.

use std::path::PathBuf;
use std::sync::Arc;

use agentspec_core::error::SecretsError;
use async_trait::async_trait;

use crate::secret::{Secret, SecretRef};

#[async_trait]
pub trait SecretProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self, reference: &SecretRef) -> Option<Secret>;
}

/// Reads `SecretRef::Env` references from the process environment.
pub struct EnvProvider;

#[async_trait]
impl SecretProvider for EnvProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn resolve(&self, reference: &SecretRef) -> Option<Secret> {
        match reference {
            SecretRef::Env { var } => std::env::var(var).ok().filter(|v| !v.is_empty()).map(Secret::new),
            SecretRef::ExternalStore { .. } => None,
        }
    }
}

/// Reads `SecretRef::ExternalStore` references from files under `base_dir`,
/// the convention Kubernetes Secret volumes and Docker secrets
/// (`/run/secrets/<name>`) both use. Trailing newlines are trimmed, matching
/// how those mounts are typically written.
pub struct FileStoreProvider {
    base_dir: PathBuf,
}

impl FileStoreProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

#[async_trait]
impl SecretProvider for FileStoreProvider {
    fn name(&self) -> &str {
        "file-store"
    }

    async fn resolve(&self, reference: &SecretRef) -> Option<Secret> {
        match reference {
            SecretRef::ExternalStore { path } => {
                let full_path = self.base_dir.join(path);
                let contents = tokio::fs::read_to_string(&full_path).await.ok()?;
                Some(Secret::new(contents.trim_end_matches(['\n', '\r']).to_string()))
            }
            SecretRef::Env { .. } => None,
        }
    }
}

/// Tries each provider in registration order, returning the first resolved
/// value. A reference that no provider resolves is `SecretsError::Unresolvable`.
pub struct ChainedResolver {
    providers: Vec<Arc<dyn SecretProvider>>,
}

impl ChainedResolver {
    pub fn new(providers: Vec<Arc<dyn SecretProvider>>) -> Self {
        Self { providers }
    }

    pub async fn resolve(&self, reference: &SecretRef) -> Result<Secret, SecretsError> {
        for provider in &self.providers {
            if let Some(secret) = provider.resolve(reference).await {
                return Ok(secret);
            }
        }
        Err(SecretsError::Unresolvable { name: reference.name().to_string() })
    }

    /// Resolves every `secret` resource in `resources`, keyed by its short
    /// name. A secret whose `provider`/`key` attributes don't form a valid
    /// reference, or that no provider resolves, is simply absent from the
    /// result — the policy engine is what turns an unresolvable *required*
    /// secret into a hard failure; this is used by callers (the command
    /// tool executor's environment, in particular) that only want whatever
    /// resolved.
    pub async fn resolve_declared(&self, resources: &[agentspec_core::resource::Resource]) -> std::collections::BTreeMap<String, String> {
        let mut resolved = std::collections::BTreeMap::new();
        for secret in resources.iter().filter(|r| r.kind == agentspec_core::resource::Kind::Secret) {
            let provider = secret.attributes.get("provider").and_then(|v| v.as_str());
            let key = secret.attributes.get("key").and_then(|v| v.as_str());
            let Some(reference) = provider.zip(key).and_then(|(p, k)| SecretRef::from_attrs(p, k)) else {
                continue;
            };
            if let Ok(value) = self.resolve(&reference).await {
                resolved.insert(secret.name.clone(), value.expose().to_string());
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverResolves;

    #[async_trait]
    impl SecretProvider for NeverResolves {
        fn name(&self) -> &str {
            "never"
        }

        async fn resolve(&self, _reference: &SecretRef) -> Option<Secret> {
            None
        }
    }

    #[tokio::test]
    async fn env_provider_resolves_a_set_variable() {
        std::env::set_var("AGENTSPEC_TEST_SECRET_ENV_PROVIDER", "shh");
        let resolver = ChainedResolver::new(vec![Arc::new(EnvProvider)]);
        let secret = resolver.resolve(&SecretRef::Env { var: "AGENTSPEC_TEST_SECRET_ENV_PROVIDER".to_string() }).await.unwrap();
        assert_eq!(secret.expose(), "shh");
        std::env::remove_var("AGENTSPEC_TEST_SECRET_ENV_PROVIDER");
    }

    #[tokio::test]
    async fn unresolved_reference_is_an_error() {
        let resolver = ChainedResolver::new(vec![Arc::new(NeverResolves)]);
        let err = resolver.resolve(&SecretRef::Env { var: "GHOST".to_string() }).await.unwrap_err();
        assert!(matches!(err, SecretsError::Unresolvable { .. }));
    }

    #[tokio::test]
    async fn chain_falls_through_to_the_second_provider() {
        let resolver = ChainedResolver::new(vec![Arc::new(NeverResolves), Arc::new(EnvProvider)]);
        std::env::set_var("AGENTSPEC_TEST_SECRET_CHAIN_FALLTHROUGH", "value");
        let secret = resolver.resolve(&SecretRef::Env { var: "AGENTSPEC_TEST_SECRET_CHAIN_FALLTHROUGH".to_string() }).await.unwrap();
        assert_eq!(secret.expose(), "value");
        std::env::remove_var("AGENTSPEC_TEST_SECRET_CHAIN_FALLTHROUGH");
    }
}
