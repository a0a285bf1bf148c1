//! Maps a lowered `Package`'s `agent` resources onto the defaults an
//! `Invocation` starts from (§4.8's agent endpoints, §4.9's invocation
//! envelope). Grounded on the teacher's `ProviderRegistry`
//! (`agentspec-llm/src/registry.rs`) for the register-then-look-up-by-name
//! shape, applied here to agent resources instead of LLM clients.

use std::collections::HashMap;

use agentspec_agents::Invocation;
use agentspec_core::resource::{Kind, Package, Resource};

use crate::error::ApiError;

/// Fixed defaults used where an `agent` resource doesn't declare an
/// attribute (§4.9 lists these as the invocation envelope's required
/// fields; the DSL schema treats all but `model` as optional).
const DEFAULT_MAX_TURNS: u32 = 10;
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// One resolved agent, ready to seed an `Invocation`. Built once per
/// loaded package rather than re-walked per request.
#[derive(Debug, Clone)]
pub struct AgentDescriptor {
    pub fqn: String,
    pub name: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub max_turns: u32,
    pub max_tokens: u32,
    pub token_budget: Option<u64>,
    pub temperature: Option<f32>,
    pub stream: bool,
    pub strategy: String,
}

impl AgentDescriptor {
    /// Seeds an `Invocation` for a fresh turn. `client_name` has no
    /// corresponding DSL attribute today — the `agent` block's attribute
    /// schema (`agentspec-dsl/src/validator.rs`) covers `model` but not
    /// which registered `client` resource serves it, so this defaults to
    /// the agent's own short name, which only resolves if a `client`
    /// resource of the same name is registered. Revisit once the DSL grows
    /// an explicit `uses_client` attribute.
    pub fn seed_invocation(&self, input: String, history: Vec<agentspec_llm::ChatMessage>) -> Invocation {
        Invocation {
            agent_fqn: self.fqn.clone(),
            client_name: self.name.clone(),
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            history,
            input,
            max_turns: self.max_turns,
            token_budget: self.token_budget,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Resolves every `agent` resource in a package into an `AgentDescriptor`,
/// keyed by fully-qualified name.
pub struct AgentRegistry {
    agents: HashMap<String, AgentDescriptor>,
}

impl AgentRegistry {
    pub fn from_package(package: &Package) -> Self {
        let agents = package
            .of_kind(Kind::Agent)
            .map(|resource| (resource.fqn.clone(), build_descriptor(package, resource)))
            .collect();
        Self { agents }
    }

    pub fn get(&self, fqn: &str) -> Result<&AgentDescriptor, ApiError> {
        self.agents.get(fqn).ok_or_else(|| ApiError::agent_not_found(fqn))
    }

    pub fn resolve(&self, agent_name: &str) -> Result<&AgentDescriptor, ApiError> {
        if let Some(descriptor) = self.agents.get(agent_name) {
            return Ok(descriptor);
        }
        self.agents
            .values()
            .find(|descriptor| descriptor.name == agent_name)
            .ok_or_else(|| ApiError::agent_not_found(agent_name))
    }

    pub fn list(&self) -> Vec<&AgentDescriptor> {
        let mut all: Vec<&AgentDescriptor> = self.agents.values().collect();
        all.sort_by(|a, b| a.fqn.cmp(&b.fqn));
        all
    }
}

/// Resolves every `pipeline` resource into an ordered list of agent short
/// names (`steps`, the only attribute `Kind::Pipeline` carries per
/// `agentspec-dsl`'s validator). A pipeline run feeds each step's output in
/// as the next step's input, starting from the caller-supplied input.
pub struct PipelineRegistry {
    pipelines: HashMap<String, Vec<String>>,
}

impl PipelineRegistry {
    pub fn from_package(package: &Package) -> Self {
        let pipelines = package
            .of_kind(Kind::Pipeline)
            .map(|resource| {
                let steps = resource
                    .attributes
                    .get("steps")
                    .and_then(|v| v.as_list())
                    .map(|items| items.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
                    .unwrap_or_default();
                (resource.name.clone(), steps)
            })
            .collect();
        Self { pipelines }
    }

    pub fn steps(&self, name: &str) -> Result<&[String], ApiError> {
        self.pipelines.get(name).map(|s| s.as_slice()).ok_or_else(|| ApiError::agent_not_found(name))
    }
}

fn build_descriptor(package: &Package, resource: &Resource) -> AgentDescriptor {
    let model = resource.attributes.get("model").and_then(|v| v.as_str()).unwrap_or_default().to_string();

    let system_prompt = resource
        .attributes
        .get("uses_prompt")
        .and_then(|v| v.as_str())
        .and_then(|prompt_name| package.find(&format!("{}/prompt/{prompt_name}", package.name)))
        .and_then(|prompt_resource| prompt_resource.attributes.get("content"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let max_turns = resource.attributes.get("max_turns").and_then(|v| v.as_f64()).map(|n| n as u32).unwrap_or(DEFAULT_MAX_TURNS);

    let token_budget = resource.attributes.get("token_budget").and_then(|v| v.as_f64()).map(|n| n as u64);

    let temperature = resource.attributes.get("temperature").and_then(|v| v.as_f64()).map(|n| n as f32);

    let stream = resource.attributes.get("stream").and_then(|v| v.as_bool()).unwrap_or(false);

    let strategy = resource.attributes.get("strategy").and_then(|v| v.as_str()).unwrap_or("reason_act").to_string();

    AgentDescriptor {
        fqn: resource.fqn.clone(),
        name: resource.name.clone(),
        model,
        system_prompt,
        max_turns,
        max_tokens: DEFAULT_MAX_TOKENS,
        token_budget,
        temperature,
        stream,
        strategy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::resource::{AttrValue, Attributes, ResourceMetadata};

    fn agent_resource(package: &str, name: &str, model: &str) -> Resource {
        let mut attrs: Attributes = Attributes::new();
        attrs.insert("model".to_string(), AttrValue::String(model.to_string()));
        Resource::new(package, Kind::Agent, name, attrs, vec![], ResourceMetadata::default())
    }

    #[test]
    fn resolves_agent_by_fqn_or_short_name() {
        let package = Package { name: "demo".to_string(), version: "1.0.0".to_string(), lang_version: "1".to_string(), resources: vec![agent_resource("demo", "helper", "gpt-5")] };
        let registry = AgentRegistry::from_package(&package);
        assert!(registry.get("demo/agent/helper").is_ok());
        assert!(registry.resolve("helper").is_ok());
        assert!(registry.resolve("ghost").is_err());
    }

    #[test]
    fn missing_optional_attributes_fall_back_to_defaults() {
        let package = Package { name: "demo".to_string(), version: "1.0.0".to_string(), lang_version: "1".to_string(), resources: vec![agent_resource("demo", "helper", "gpt-5")] };
        let registry = AgentRegistry::from_package(&package);
        let descriptor = registry.resolve("helper").unwrap();
        assert_eq!(descriptor.max_turns, DEFAULT_MAX_TURNS);
        assert!(!descriptor.stream);
        assert_eq!(descriptor.strategy, "reason_act");
    }

    #[test]
    fn pipeline_steps_resolve_in_declared_order() {
        let mut attrs: Attributes = Attributes::new();
        attrs.insert("steps".to_string(), AttrValue::List(vec![AttrValue::String("drafter".to_string()), AttrValue::String("reviewer".to_string())]));
        let pipeline = Resource::new("demo", Kind::Pipeline, "review", attrs, vec![], ResourceMetadata::default());
        let package = Package { name: "demo".to_string(), version: "1.0.0".to_string(), lang_version: "1".to_string(), resources: vec![pipeline] };
        let registry = PipelineRegistry::from_package(&package);
        assert_eq!(registry.steps("review").unwrap(), &["drafter".to_string(), "reviewer".to_string()]);
        assert!(registry.steps("ghost").is_err());
    }
}
