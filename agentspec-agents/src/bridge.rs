//! Wires a package's `skill` resources onto a live `ToolRegistry` (§4.9's
//! "tool definitions derived from the agent's skill set", §4.10's command
//! allowlist). Grounded on `agentspec-api`'s `AgentRegistry::from_package`
//! (`agent_registry.rs`) for the resource-walk-then-build shape.
//!
//! Only the `command` executor needs a registry-wide instance: HTTP, inline,
//! and MCP skills each carry the information their call needs in the call
//! arguments, but a `command` skill's allowlist is a property of the whole
//! deployed package, not of one call, so it's built once up front.

use std::collections::BTreeMap;

use agentspec_core::resource::{AttrValue, Attributes, Kind, Package};

use crate::tools::command::CommandToolExecutor;
use crate::tools::ToolRegistry;

/// Every binary base-name referenced by a `command`-bound skill's `handler`
/// block, in declaration order with duplicates removed. A package that
/// declares no command skills yields an empty allowlist, which blocks all
/// command execution (§4.10) rather than silently allowing everything.
pub fn command_allowlist(package: &Package) -> Vec<String> {
    let mut seen = Vec::new();
    for skill in package.of_kind(Kind::Skill) {
        collect_binaries(&skill.attributes, &mut seen);
    }
    seen
}

fn collect_binaries(attrs: &Attributes, out: &mut Vec<String>) {
    for (key, value) in attrs {
        if key == "binary" {
            if let Some(name) = value.as_str() {
                if !out.iter().any(|b| b == name) {
                    out.push(name.to_string());
                }
            }
        }
        collect_nested(value, out);
    }
}

fn collect_nested(value: &AttrValue, out: &mut Vec<String>) {
    match value {
        AttrValue::Map(map) => collect_binaries(map, out),
        AttrValue::List(items) => {
            for item in items {
                collect_nested(item, out);
            }
        }
        _ => {}
    }
}

/// Registers the `command` tool executor against `registry`, allowlisted to
/// exactly the binaries the package's own skills declare. Called once at
/// server startup (`run`/`dev`) after the policy engine has already rejected
/// any package that references a `deny`-listed binary, so every name that
/// reaches the allowlist has already cleared policy.
pub fn register_command_executor(registry: &ToolRegistry, package: &Package, resolved_secrets: BTreeMap<String, String>) {
    use agentspec_llm::ToolDefinition;

    let allowlist = command_allowlist(package);
    let definition = ToolDefinition {
        name: "command".to_string(),
        description: "Invoke an allowlisted command-line binary.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "binary": {"type": "string"},
                "args": {"type": "array", "items": {"type": "string"}},
            },
            "required": ["binary"],
        }),
    };
    registry.register(definition, std::sync::Arc::new(CommandToolExecutor::new(allowlist, resolved_secrets)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::resource::{Resource, ResourceMetadata};

    fn skill_with_binary(name: &str, binary: &str) -> Resource {
        let mut handler = BTreeMap::new();
        handler.insert("binary".to_string(), AttrValue::String(binary.to_string()));
        let mut attrs: Attributes = Attributes::new();
        attrs.insert("handler".to_string(), AttrValue::Map(handler));
        Resource::new("demo", Kind::Skill, name, attrs, vec![], ResourceMetadata::default())
    }

    #[test]
    fn allowlist_collects_every_distinct_command_binary() {
        let package = Package {
            name: "demo".to_string(),
            version: "0.1.0".to_string(),
            lang_version: "2.0".to_string(),
            resources: vec![skill_with_binary("greet", "greet-tool"), skill_with_binary("greet2", "greet-tool"), skill_with_binary("other", "curl")],
        };
        let allowlist = command_allowlist(&package);
        assert_eq!(allowlist, vec!["greet-tool".to_string(), "curl".to_string()]);
    }

    #[test]
    fn package_with_no_command_skills_yields_empty_allowlist() {
        let package = Package { name: "demo".to_string(), version: "0.1.0".to_string(), lang_version: "2.0".to_string(), resources: vec![] };
        assert!(command_allowlist(&package).is_empty());
    }
}
