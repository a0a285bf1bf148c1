//! The JSON shape every guest module's `manifest()` export must return
//! (§4.7). Parsed once at load time, before any capability is dispatched.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub capabilities: Capabilities,
    pub wasm: WasmRequirements,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub resource_types: Vec<String>,
    #[serde(default)]
    pub validators: Vec<ValidatorCapability>,
    #[serde(default)]
    pub transforms: Vec<TransformCapability>,
    #[serde(default)]
    pub hooks: Vec<String>,
    #[serde(default)]
    pub compile: Option<CompileCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorCapability {
    pub name: String,
    /// Resource kinds this validator applies to; `"*"` matches every kind.
    pub applies_to: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformCapability {
    pub name: String,
    pub stage: String,
    pub input_kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileCapability {
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WasmRequirements {
    pub min_memory_pages: u32,
    pub max_memory_pages: u32,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Every lifecycle stage a hook can register for (§4.7).
pub const HOOK_STAGES: &[&str] =
    &["pre-validate", "post-validate", "pre-plan", "post-plan", "pre-apply", "post-apply", "pre-invoke", "post-invoke", "runtime"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_round_trips_through_json() {
        let json = r#"{
            "name": "retry-policy",
            "version": "1.0.0",
            "description": "adds a retry backoff validator",
            "capabilities": {
                "resource_types": ["retry_policy"],
                "validators": [{"name": "retry_bounds", "applies_to": ["agent", "*"]}],
                "transforms": [],
                "hooks": ["pre-apply"]
            },
            "wasm": {"min_memory_pages": 2, "max_memory_pages": 16, "capabilities": []}
        }"#;
        let manifest: PluginManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.name, "retry-policy");
        assert_eq!(manifest.capabilities.validators[0].applies_to, vec!["agent", "*"]);
    }
}
