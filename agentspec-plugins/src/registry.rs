//! Loads every resolvable plugin, runs conflict detection across the
//! whole set before any of them dispatch, and looks capabilities up by
//! resource kind / stage / transform input.

use std::collections::HashMap;
use std::path::Path;

use agentspec_core::{AgentSpecResult, PluginError};

use crate::host::LoadedPlugin;
use crate::resolve::resolve_plugin_sources;

pub struct PluginRegistry {
    plugins: Vec<LoadedPlugin>,
}

impl PluginRegistry {
    /// Resolves every `.wasm` module under the project-local, user-cache,
    /// and legacy directories, loads each one, and runs conflict detection
    /// over the combined set. Legacy-path hits are logged as a warning.
    pub fn load(project_root: &Path) -> AgentSpecResult<Self> {
        let mut plugins = Vec::new();
        for source in resolve_plugin_sources(project_root) {
            if source.is_legacy() {
                tracing::warn!(path = %source.path().display(), "loading plugin from deprecated legacy path");
            }
            plugins.push(LoadedPlugin::load(source.path())?);
        }
        check_conflicts(&plugins)?;
        Ok(Self { plugins })
    }

    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    /// Validators whose `applies_to` matches `kind` (or declares `"*"`).
    pub fn validators_for(&self, kind: &str) -> Vec<(&LoadedPlugin, &str)> {
        self.plugins
            .iter()
            .flat_map(|p| p.manifest.capabilities.validators.iter().map(move |v| (p, v)))
            .filter(|(_, v)| v.applies_to.iter().any(|k| k == kind || k == "*"))
            .map(|(p, v)| (p, v.name.as_str()))
            .collect()
    }

    /// Transforms registered for a given lifecycle stage and input kind.
    pub fn transforms_for(&self, stage: &str, input_kind: &str) -> Vec<(&LoadedPlugin, &str)> {
        self.plugins
            .iter()
            .flat_map(|p| p.manifest.capabilities.transforms.iter().map(move |t| (p, t)))
            .filter(|(_, t)| t.stage == stage && t.input_kind == input_kind)
            .map(|(p, t)| (p, t.name.as_str()))
            .collect()
    }

    /// Plugins with a hook registered for `stage`.
    pub fn hooks_for(&self, stage: &str) -> Vec<&LoadedPlugin> {
        self.plugins.iter().filter(|p| p.manifest.capabilities.hooks.iter().any(|h| h == stage)).collect()
    }
}

fn check_conflicts(plugins: &[LoadedPlugin]) -> Result<(), PluginError> {
    let mut kind_owner: HashMap<&str, &str> = HashMap::new();
    let mut compile_owner: HashMap<&str, &str> = HashMap::new();

    for plugin in plugins {
        for kind in &plugin.manifest.capabilities.resource_types {
            if let Some(owner) = kind_owner.insert(kind.as_str(), plugin.name.as_str()) {
                if owner != plugin.name {
                    return Err(PluginError::DuplicateResourceKind { plugin: plugin.name.clone(), kind: kind.clone() });
                }
            }
        }
        if let Some(compile) = &plugin.manifest.capabilities.compile {
            if let Some(owner) = compile_owner.insert(compile.target.as_str(), plugin.name.as_str()) {
                if owner != plugin.name {
                    return Err(PluginError::DuplicateResourceKind {
                        plugin: plugin.name.clone(),
                        kind: format!("compile target {}", compile.target),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Capabilities, CompileCapability, PluginManifest, WasmRequirements};

    fn manifest_with_kind(name: &str, kind: &str) -> PluginManifest {
        PluginManifest {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            capabilities: Capabilities { resource_types: vec![kind.to_string()], ..Default::default() },
            wasm: WasmRequirements { min_memory_pages: 1, max_memory_pages: 4, capabilities: vec![] },
        }
    }

    fn fake_plugin(manifest: PluginManifest) -> LoadedPlugin {
        // LoadedPlugin::load requires a real compiled module; conflict
        // detection only reads the manifest field, so tests build plugins
        // through the private struct shape via a test-only constructor.
        LoadedPlugin::for_test(manifest)
    }

    #[test]
    fn two_plugins_declaring_the_same_resource_kind_conflict() {
        let a = fake_plugin(manifest_with_kind("a", "retry_policy"));
        let b = fake_plugin(manifest_with_kind("b", "retry_policy"));
        assert!(check_conflicts(&[a, b]).is_err());
    }

    #[test]
    fn distinct_resource_kinds_do_not_conflict() {
        let a = fake_plugin(manifest_with_kind("a", "retry_policy"));
        let b = fake_plugin(manifest_with_kind("b", "circuit_breaker"));
        assert!(check_conflicts(&[a, b]).is_ok());
    }

    #[test]
    fn two_plugins_declaring_the_same_compile_target_conflict() {
        let mut a = manifest_with_kind("a", "kind_a");
        a.capabilities.compile = Some(CompileCapability { target: "wasm32-wasi".to_string() });
        let mut b = manifest_with_kind("b", "kind_b");
        b.capabilities.compile = Some(CompileCapability { target: "wasm32-wasi".to_string() });
        assert!(check_conflicts(&[fake_plugin(a), fake_plugin(b)]).is_err());
    }
}
