//! Policy engine (§4.12): evaluates `require`/`deny` rule strings declared on
//! `policy` resources (`Kind::Policy`'s `require`/`deny` attributes, per
//! `agentspec-dsl`'s validator schema) against the resolved resource graph.
//! Complements (does not replace) `agentspec-dsl`'s AST-time
//! `check_pinned_imports` pass: that one gives early author-facing feedback
//! before lowering, this one is the authoritative gate run against the fully
//! lowered package — including anything pulled in transitively through
//! imports the AST-level pass can't see — right before `apply`/`run`.

use agentspec_core::error::PolicyError;
use agentspec_core::resource::{AttrValue, Kind, Resource};

use crate::resolver::ChainedResolver;
use crate::secret::SecretRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    /// Any violation blocks apply (default).
    Enforce,
    /// Violations are logged; apply proceeds.
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    PinnedImports,
    Secret { name: String },
    DenyCommand { binary: String },
    SignedPackages,
}

impl Requirement {
    const SUPPORTED: &'static [&'static str] = &["pinned imports", "secret <name>", "deny command <binary>", "signed packages"];

    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        let trimmed = raw.trim();
        if trimmed == "pinned imports" {
            return Ok(Requirement::PinnedImports);
        }
        if trimmed == "signed packages" {
            return Ok(Requirement::SignedPackages);
        }
        if let Some(name) = trimmed.strip_prefix("secret ") {
            let name = name.trim().trim_matches('"');
            return Ok(Requirement::Secret { name: name.to_string() });
        }
        if let Some(binary) = trimmed.strip_prefix("deny command ") {
            let binary = binary.trim().trim_matches('"');
            return Ok(Requirement::DenyCommand { binary: binary.to_string() });
        }
        Err(PolicyError::UnknownRequirement {
            requirement: raw.to_string(),
            supported: Requirement::SUPPORTED.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub fqn: String,
    pub requirement: &'static str,
    pub detail: String,
}

pub struct PolicyEngine {
    mode: PolicyMode,
}

impl PolicyEngine {
    pub fn new(mode: PolicyMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    /// Collects every `require`/`deny` rule from every `policy` resource in
    /// `resources` and evaluates it. Never short-circuits on the first
    /// violation: all violations across all resources are collected and
    /// returned together, grouped implicitly by `Violation::fqn`.
    pub async fn evaluate(&self, resources: &[Resource], resolver: &ChainedResolver) -> Result<Vec<Violation>, PolicyError> {
        let mut requirements = Vec::new();
        for policy in resources.iter().filter(|r| r.kind == Kind::Policy) {
            for key in ["require", "deny"] {
                if let Some(AttrValue::List(items)) = policy.attributes.get(key) {
                    for item in items {
                        if let Some(raw) = item.as_str() {
                            requirements.push(Requirement::parse(raw)?);
                        }
                    }
                }
            }
        }

        let mut violations = Vec::new();
        for requirement in &requirements {
            violations.extend(self.check(requirement, resources, resolver).await);
        }
        Ok(violations)
    }

    async fn check(&self, requirement: &Requirement, resources: &[Resource], resolver: &ChainedResolver) -> Vec<Violation> {
        match requirement {
            Requirement::PinnedImports => check_pinned_imports(resources),
            Requirement::Secret { name } => check_secret(name, resources, resolver).await,
            Requirement::DenyCommand { binary } => check_deny_command(binary, resources),
            Requirement::SignedPackages => {
                tracing::warn!("\"signed packages\" policy requirement is not yet implemented; treating every package as unverified rather than silently passing");
                resources
                    .iter()
                    .filter(|r| r.kind == Kind::Import)
                    .map(|r| Violation {
                        fqn: r.fqn.clone(),
                        requirement: "signed packages",
                        detail: "signature verification is not implemented yet".to_string(),
                    })
                    .collect()
            }
        }
    }
}

fn check_pinned_imports(resources: &[Resource]) -> Vec<Violation> {
    resources
        .iter()
        .filter(|r| r.kind == Kind::Import)
        .filter(|r| !r.attributes.contains_key("version") && !r.attributes.contains_key("hash"))
        .map(|r| Violation { fqn: r.fqn.clone(), requirement: "pinned imports", detail: format!("import \"{}\" has no version or content-hash pin", r.name) })
        .collect()
}

async fn check_secret(name: &str, resources: &[Resource], resolver: &ChainedResolver) -> Vec<Violation> {
    let Some(secret_resource) = resources.iter().find(|r| r.kind == Kind::Secret && r.name == name) else {
        return vec![Violation {
            fqn: format!("secret/{name}"),
            requirement: "secret",
            detail: format!("no secret named \"{name}\" is declared"),
        }];
    };

    let provider = secret_resource.attributes.get("provider").and_then(AttrValue::as_str);
    let key = secret_resource.attributes.get("key").and_then(AttrValue::as_str);
    let reference = match (provider, key) {
        (Some(provider), Some(key)) => SecretRef::from_attrs(provider, key),
        _ => None,
    };

    match reference {
        None => vec![Violation {
            fqn: secret_resource.fqn.clone(),
            requirement: "secret",
            detail: format!("secret \"{name}\" has no resolvable provider/key"),
        }],
        Some(reference) => match resolver.resolve(&reference).await {
            Ok(_) => vec![],
            Err(e) => vec![Violation { fqn: secret_resource.fqn.clone(), requirement: "secret", detail: e.to_string() }],
        },
    }
}

/// Recursively scans every resource's attribute tree for a `binary` key
/// matching `binary` — the tool-binding shape for a `command` executor isn't
/// fixed to one nesting depth, so this walks the whole attribute value tree
/// rather than assuming where `binary` lives.
fn check_deny_command(binary: &str, resources: &[Resource]) -> Vec<Violation> {
    resources
        .iter()
        .filter(|r| attrs_reference_binary(&r.attributes, binary))
        .map(|r| Violation { fqn: r.fqn.clone(), requirement: "deny command", detail: format!("uses denied command binary \"{binary}\"") })
        .collect()
}

fn attrs_reference_binary(attrs: &agentspec_core::resource::Attributes, binary: &str) -> bool {
    attrs.iter().any(|(key, value)| (key == "binary" && value.as_str() == Some(binary)) || value_references_binary(value, binary))
}

fn value_references_binary(value: &AttrValue, binary: &str) -> bool {
    match value {
        AttrValue::Map(map) => attrs_reference_binary(map, binary),
        AttrValue::List(items) => items.iter().any(|item| value_references_binary(item, binary)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_four_canonical_requirement_strings() {
        assert_eq!(Requirement::parse("pinned imports").unwrap(), Requirement::PinnedImports);
        assert_eq!(Requirement::parse("signed packages").unwrap(), Requirement::SignedPackages);
        assert_eq!(Requirement::parse("secret \"OPENAI_API_KEY\"").unwrap(), Requirement::Secret { name: "OPENAI_API_KEY".to_string() });
        assert_eq!(Requirement::parse("deny command rm").unwrap(), Requirement::DenyCommand { binary: "rm".to_string() });
    }

    #[test]
    fn unknown_requirement_lists_supported_types() {
        let err = Requirement::parse("teleport to mars").unwrap_err();
        match err {
            PolicyError::UnknownRequirement { supported, .. } => assert_eq!(supported.len(), Requirement::SUPPORTED.len()),
            _ => panic!("expected UnknownRequirement"),
        }
    }
}
