//! Process-wide adapter registry, keyed by adapter name. Grounded on the
//! teacher's `ProviderRegistry` (`caliber-llm/src/lib.rs`) — an
//! `Arc<dyn Trait>` behind a reader-preferred lock, looked up by string key.
//! That registry is async (providers are called from async handlers);
//! adapters here are invoked from blocking CLI code, so this uses
//! `std::sync::RwLock` instead of `tokio::sync::RwLock`, but the shape —
//! register once, clone the `Arc` out on every lookup — is the same.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use agentspec_core::{AdapterError, AgentSpecResult};

use crate::Adapter;

#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<String, Arc<dyn Adapter>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, adapter: Arc<dyn Adapter>) {
        let name = adapter.name().to_string();
        self.adapters.write().expect("adapter registry lock poisoned").insert(name, adapter);
    }

    pub fn get(&self, name: &str) -> AgentSpecResult<Arc<dyn Adapter>> {
        self.adapters
            .read()
            .expect("adapter registry lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| AdapterError::NotRegistered { name: name.to_string() }.into())
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.read().expect("adapter registry lock poisoned").keys().cloned().collect()
    }
}

/// Builds a registry with every built-in adapter registered under its
/// canonical name (`process`, `docker`, `docker-compose`, `kubernetes`).
pub fn builtin_registry() -> AdapterRegistry {
    let registry = AdapterRegistry::new();
    registry.register(Arc::new(crate::process::ProcessAdapter::new()));
    registry.register(Arc::new(crate::docker::DockerAdapter::new()));
    registry.register(Arc::new(crate::compose::ComposeAdapter::new()));
    registry.register(Arc::new(crate::kubernetes::KubernetesAdapter::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_all_four_adapters() {
        let registry = builtin_registry();
        let mut names = registry.names();
        names.sort();
        assert_eq!(names, vec!["docker", "docker-compose", "kubernetes", "process"]);
    }

    #[test]
    fn unregistered_name_is_an_error() {
        let registry = AdapterRegistry::new();
        assert!(registry.get("ghost").is_err());
    }
}
