//! AST → IR lowering (C3). Walks a validated `File` and emits one
//! `agentspec_core::Resource` per declaration, with references resolved to
//! FQNs and attributes hashed canonically.

use std::collections::{BTreeMap, HashSet};

use agentspec_core::{
    hash_attributes, AttrValue, Attributes, Kind, LowerError, Package, Resource, ResourceMetadata,
};

use crate::parser::{AttrLine, File, Statement, Value};

/// Names of attributes that hold references to other resources, keyed by the
/// declaring statement's kind. Values name the kind being referenced.
fn reference_attrs(kind: Kind) -> &'static [(&'static str, Kind)] {
    match kind {
        Kind::Agent => &[
            ("uses_prompt", Kind::Prompt),
            ("uses_skills", Kind::Skill),
            ("fallback", Kind::Agent),
            ("delegates_to", Kind::Agent),
        ],
        Kind::Skill => &[("input_type", Kind::Type), ("output_type", Kind::Type)],
        Kind::Client => &[("servers", Kind::Server)],
        _ => &[],
    }
}

fn fqn(package: &str, kind: Kind, name: &str) -> String {
    format!("{package}/{}/{name}", kind.as_str())
}

fn value_to_attr(value: &Value) -> AttrValue {
    match value {
        Value::String(s) => AttrValue::String(s.clone()),
        Value::Number(n) => AttrValue::Number(*n),
        Value::Bool(b) => AttrValue::Bool(*b),
        // Duration literals are kept as their literal source text; lowering
        // does not parse `30s` into a numeric duration, so `fmt(fmt(x))`
        // round-trips byte for byte and the hash only ever depends on what
        // the author wrote.
        Value::Duration(d) => AttrValue::String(d.clone()),
        Value::List(items) => AttrValue::List(items.iter().map(value_to_attr).collect()),
        Value::Block(attrs) => AttrValue::Map(attr_lines_to_map(attrs)),
    }
}

fn attr_lines_to_map(attrs: &[AttrLine]) -> BTreeMap<String, AttrValue> {
    attrs.iter().map(|a| (a.key.clone(), value_to_attr(&a.value))).collect()
}

fn references_for(package: &str, stmt: &Statement) -> Vec<String> {
    let mut refs = Vec::new();
    for (attr_name, target_kind) in reference_attrs(stmt.kind) {
        match stmt.get(attr_name) {
            Some(Value::String(name)) => refs.push(fqn(package, *target_kind, name)),
            Some(Value::List(items)) => {
                for item in items {
                    if let Some(name) = item.as_str() {
                        refs.push(fqn(package, *target_kind, name));
                    }
                }
            }
            _ => {}
        }
    }
    refs
}

/// The lowered IR document: the canonical resource list plus derived views
/// over it. The views are not separately stored data — every resource they
/// surface still lives in `package.resources`, so there is exactly one
/// canonical representation to hash and diff against state.
pub struct IrDocument {
    pub package: Package,
}

impl IrDocument {
    pub fn policies(&self) -> Vec<&Resource> {
        self.package.of_kind(Kind::Policy).collect()
    }

    pub fn deploy_targets(&self) -> Vec<&Resource> {
        self.package.of_kind(Kind::Deploy).collect()
    }

    /// Every (resource, referenced FQN) edge in the package, the "bindings"
    /// collection the IR document exposes alongside resources and policies.
    pub fn bindings(&self) -> Vec<(&Resource, &str)> {
        self.package
            .resources
            .iter()
            .flat_map(|r| r.references.iter().map(move |to| (r, to.as_str())))
            .collect()
    }
}

/// Lower a validated AST into an `IrDocument`. Errors here are lowering-
/// specific (duplicate resources, references that still don't resolve after
/// validation) — callers normally run the validator first so this list is
/// empty in practice, but lowering re-checks independently since it can run
/// standalone (e.g. from a plugin transform pipeline).
pub fn lower(file: &str, ast: &File) -> Result<IrDocument, Vec<LowerError>> {
    let _ = file;
    let mut errors = Vec::new();
    let mut seen: HashSet<(Kind, &str)> = HashSet::new();
    let mut resources = Vec::new();
    let declared: HashSet<(Kind, &str)> = ast.statements.iter().map(|s| (s.kind, s.name.as_str())).collect();

    for stmt in &ast.statements {
        if !seen.insert((stmt.kind, stmt.name.as_str())) {
            errors.push(LowerError::DuplicateResource {
                kind: stmt.kind.to_string(),
                name: stmt.name.clone(),
            });
            continue;
        }

        let attributes: Attributes = attr_lines_to_map(&stmt.attrs);
        let references = references_for(&ast.package.name, stmt);

        for (attr_name, target_kind) in reference_attrs(stmt.kind) {
            let names: Vec<&str> = match stmt.get(attr_name) {
                Some(Value::String(name)) => vec![name.as_str()],
                Some(Value::List(items)) => items.iter().filter_map(|v| v.as_str()).collect(),
                _ => Vec::new(),
            };
            for name in names {
                if !declared.contains(&(*target_kind, name)) {
                    errors.push(LowerError::UnresolvedReference {
                        from: fqn(&ast.package.name, stmt.kind, &stmt.name),
                        to: fqn(&ast.package.name, *target_kind, name),
                    });
                }
            }
        }

        let hash = hash_attributes(&attributes);
        let resource_fqn = fqn(&ast.package.name, stmt.kind, &stmt.name);
        resources.push(Resource {
            kind: stmt.kind,
            name: stmt.name.clone(),
            fqn: resource_fqn,
            attributes,
            references,
            hash,
            metadata: ResourceMetadata {
                source_file: Some(file.to_string()),
                source_line: Some(stmt.span.line),
                doc_comment: None,
            },
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    resources.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));

    Ok(IrDocument {
        package: Package {
            name: ast.package.name.clone(),
            version: ast.package.version.clone(),
            lang_version: ast.package.lang.clone(),
            resources,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lower_ok(src: &str) -> IrDocument {
        let (ast, errors) = parse("p.ias", src);
        assert!(errors.is_empty(), "{errors:?}");
        lower("p.ias", &ast).expect("lowering should succeed")
    }

    #[test]
    fn lowers_one_resource_per_declaration() {
        let doc = lower_ok(
            r#"
package "hello" version "0.1.0" lang "2.0"

agent "greeter" {
    model "gpt-4"
}
"#,
        );
        assert_eq!(doc.package.resources.len(), 1);
        assert_eq!(doc.package.resources[0].fqn, "hello/agent/greeter");
    }

    #[test]
    fn references_become_fqns() {
        let doc = lower_ok(
            r#"
package "hello" version "0.1.0" lang "2.0"

prompt "greet" {
    content "Hello {{name}}"
}
agent "greeter" {
    model "gpt-4"
    uses_prompt "greet"
}
"#,
        );
        let agent = doc.package.find("hello/agent/greeter").unwrap();
        assert_eq!(agent.references, vec!["hello/prompt/greet".to_string()]);
    }

    #[test]
    fn two_semantically_equal_files_hash_identically_regardless_of_attribute_order() {
        let a = lower_ok(
            r#"
package "hello" version "0.1.0" lang "2.0"

agent "x" {
    model "gpt-4"
    max_turns 5
}
"#,
        );
        let b = lower_ok(
            r#"
package "hello" version "0.1.0" lang "2.0"

agent "x" {
    max_turns 5
    model "gpt-4"
}
"#,
        );
        assert_eq!(a.package.resources[0].hash, b.package.resources[0].hash);
    }

    #[test]
    fn unresolved_reference_is_reported() {
        let (ast, _) = parse(
            "p.ias",
            r#"
package "p" version "0.1.0" lang "2.0"

agent "a" {
    model "gpt-4"
    uses_prompt "ghost"
}
"#,
        );
        let errors = lower("p.ias", &ast).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, LowerError::UnresolvedReference { to, .. } if to == "p/prompt/ghost")));
    }

    #[test]
    fn policies_and_deploy_targets_are_exposed_as_views() {
        let doc = lower_ok(
            r#"
package "p" version "0.1.0" lang "2.0"

policy "strict" {
    require ["pinned imports"]
}
deploy "prod" {
    adapter "kubernetes"
}
"#,
        );
        assert_eq!(doc.policies().len(), 1);
        assert_eq!(doc.deploy_targets().len(), 1);
    }
}
