//! Two-pass validation over a parsed `File`: structural (attribute shape per
//! block kind) then semantic (cross-reference resolution, acyclicity,
//! policy requirements). Like the parser, a validator pass never aborts on
//! the first problem — every issue is collected and the caller decides
//! whether to continue to lowering.

use std::collections::{HashMap, HashSet};

use agentspec_core::{Kind, ValidationError};

use crate::parser::{AttrLine, File, Statement, Value};

/// Declared attribute set per block kind, used both to reject unknown
/// attributes and to require specific ones. Not exhaustive of every legal
/// attribute (nested blocks carry their own unchecked sub-keys) — this is
/// the top-level surface the "did you mean?" suggestion is computed against.
fn known_attrs(kind: Kind) -> &'static [&'static str] {
    match kind {
        Kind::Prompt => &["content", "variables"],
        Kind::Skill => &["description", "input_type", "output_type", "handler"],
        Kind::Agent => &[
            "model",
            "strategy",
            "uses_prompt",
            "uses_skills",
            "max_turns",
            "timeout",
            "token_budget",
            "temperature",
            "stream",
            "on_error",
            "max_retries",
            "fallback",
            "delegates_to",
        ],
        Kind::Type => &["fields"],
        Kind::Pipeline => &["steps"],
        Kind::Server => &["command", "args", "env", "transport"],
        Kind::Client => &["servers"],
        Kind::Secret => &["provider", "key"],
        Kind::Environment => &["variables"],
        Kind::Policy => &["require", "deny"],
        Kind::Deploy => &["adapter", "target", "default"],
        Kind::Plugin => &["path", "capabilities"],
        Kind::Import => &["path", "version", "hash"],
    }
}

fn required_attrs(kind: Kind) -> &'static [&'static str] {
    match kind {
        Kind::Prompt => &["content"],
        Kind::Agent => &["model"],
        Kind::Server => &["command"],
        Kind::Secret => &["provider"],
        Kind::Deploy => &["adapter"],
        Kind::Import => &["path"],
        _ => &[],
    }
}

/// Cheap Levenshtein distance, used only for "did you mean" suggestions over
/// small attribute-name sets, not in any hot path.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut prev = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let tmp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev
            } else {
                1 + prev.min(row[j]).min(row[j - 1])
            };
            prev = tmp;
        }
    }
    row[b.len()]
}

fn suggest(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, edit_distance(unknown, k)))
        .filter(|(_, d)| *d <= 2)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| k.to_string())
}

struct Validator {
    file: String,
    errors: Vec<ValidationError>,
}

impl Validator {
    fn error(&mut self, stmt: &Statement, message: String, hint: Option<String>) {
        self.errors.push(ValidationError {
            file: self.file.clone(),
            line: stmt.span.line,
            column: stmt.span.column,
            message,
            hint,
        });
    }

    fn error_at(&mut self, line: usize, column: usize, message: String, hint: Option<String>) {
        self.errors.push(ValidationError {
            file: self.file.clone(),
            line,
            column,
            message,
            hint,
        });
    }

    fn structural_pass(&mut self, ast: &File) {
        for stmt in &ast.statements {
            let known = known_attrs(stmt.kind);
            for attr in &stmt.attrs {
                if !known.contains(&attr.key.as_str()) {
                    let hint = suggest(&attr.key, known).map(|s| format!("did you mean: {s}?"));
                    self.error_at(
                        attr.span.line,
                        attr.span.column,
                        format!("unknown attribute \"{}\" on {} \"{}\"", attr.key, stmt.kind, stmt.name),
                        hint,
                    );
                }
            }
            for req in required_attrs(stmt.kind) {
                if stmt.get(req).is_none() {
                    self.error(
                        stmt,
                        format!("{} \"{}\" is missing required attribute \"{req}\"", stmt.kind, stmt.name),
                        None,
                    );
                }
            }
        }
    }

    fn semantic_pass(&mut self, ast: &File) {
        let mut names: HashMap<(Kind, &str), &Statement> = HashMap::new();
        for stmt in &ast.statements {
            names.insert((stmt.kind, stmt.name.as_str()), stmt);
        }

        for stmt in &ast.statements {
            match stmt.kind {
                Kind::Agent => self.check_agent_references(stmt, &names),
                Kind::Skill => self.check_skill_references(stmt, &names),
                _ => {}
            }
        }

        self.check_acyclic(ast, &names, "delegates_to");
        self.check_acyclic(ast, &names, "fallback");
        self.check_pinned_imports(ast);
    }

    fn check_agent_references(&mut self, stmt: &Statement, names: &HashMap<(Kind, &str), &Statement>) {
        if let Some(Value::String(prompt)) = stmt.get("uses_prompt") {
            if !names.contains_key(&(Kind::Prompt, prompt.as_str())) {
                self.error(stmt, format!("agent \"{}\" uses undeclared prompt \"{prompt}\"", stmt.name), None);
            }
        }
        if let Some(Value::List(items)) = stmt.get("uses_skills") {
            for item in items {
                if let Some(skill) = item.as_str() {
                    if !names.contains_key(&(Kind::Skill, skill)) {
                        self.error(stmt, format!("agent \"{}\" uses undeclared skill \"{skill}\"", stmt.name), None);
                    }
                }
            }
        }
        if let Some(Value::String(fallback)) = stmt.get("fallback") {
            if !names.contains_key(&(Kind::Agent, fallback.as_str())) {
                self.error(stmt, format!("agent \"{}\" falls back to undeclared agent \"{fallback}\"", stmt.name), None);
            }
        }
        if let Some(Value::List(items)) = stmt.get("delegates_to") {
            for item in items {
                if let Some(target) = item.as_str() {
                    if !names.contains_key(&(Kind::Agent, target)) {
                        self.error(stmt, format!("agent \"{}\" delegates to undeclared agent \"{target}\"", stmt.name), None);
                    }
                }
            }
        }
    }

    fn check_skill_references(&mut self, stmt: &Statement, names: &HashMap<(Kind, &str), &Statement>) {
        for key in ["input_type", "output_type"] {
            if let Some(Value::String(ty)) = stmt.get(key) {
                if !names.contains_key(&(Kind::Type, ty.as_str())) {
                    self.error(stmt, format!("skill \"{}\" references undeclared type \"{ty}\" in {key}", stmt.name), None);
                }
            }
        }
    }

    /// Depth-first color marking over the graph formed by `attr_name` edges
    /// between agents. Reports the first cycle found per connected component.
    fn check_acyclic(&mut self, ast: &File, names: &HashMap<(Kind, &str), &Statement>, attr_name: &str) {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn edges<'a>(stmt: &'a Statement, attr_name: &str) -> Vec<&'a str> {
            match stmt.get(attr_name) {
                Some(Value::String(s)) => vec![s.as_str()],
                Some(Value::List(items)) => items.iter().filter_map(|v| v.as_str()).collect(),
                _ => Vec::new(),
            }
        }

        let agents: Vec<&Statement> = ast.statements.iter().filter(|s| s.kind == Kind::Agent).collect();
        let mut color: HashMap<&str, Color> = agents.iter().map(|a| (a.name.as_str(), Color::White)).collect();
        let mut cycle_reported: HashSet<&str> = HashSet::new();

        fn visit<'a>(
            node: &'a Statement,
            names: &HashMap<(Kind, &str), &'a Statement>,
            color: &mut HashMap<&'a str, Color>,
            path: &mut Vec<&'a str>,
            attr_name: &str,
            cycle_reported: &mut HashSet<&'a str>,
            errors: &mut Vec<(String, usize, usize, String)>,
        ) {
            color.insert(node.name.as_str(), Color::Gray);
            path.push(node.name.as_str());
            for target in edges(node, attr_name) {
                if let Some(next) = names.get(&(Kind::Agent, target)) {
                    match color.get(target) {
                        Some(Color::Gray) => {
                            if cycle_reported.insert(node.name.as_str()) {
                                errors.push((
                                    node.name.to_string(),
                                    node.span.line,
                                    node.span.column,
                                    format!(
                                        "cycle detected in {attr_name} graph: {} -> {}",
                                        path.join(" -> "),
                                        target
                                    ),
                                ));
                            }
                        }
                        Some(Color::Black) => {}
                        _ => visit(next, names, color, path, attr_name, cycle_reported, errors),
                    }
                }
            }
            path.pop();
            color.insert(node.name.as_str(), Color::Black);
        }

        let mut collected = Vec::new();
        for agent in &agents {
            if color.get(agent.name.as_str()) == Some(&Color::White) {
                let mut path = Vec::new();
                visit(agent, names, &mut color, &mut path, attr_name, &mut cycle_reported, &mut collected);
            }
        }
        for (_, line, column, message) in collected {
            self.error_at(line, column, message, None);
        }
    }

    fn check_pinned_imports(&mut self, ast: &File) {
        let requires_pinning = ast.statements.iter().any(|s| {
            s.kind == Kind::Policy
                && matches!(s.get("require"), Some(Value::List(items)) if items.iter().any(|v| v.as_str() == Some("pinned imports")))
        });
        if !requires_pinning {
            return;
        }
        for stmt in ast.statements.iter().filter(|s| s.kind == Kind::Import) {
            let pinned = attr_line(&stmt.attrs, "version").is_some() || attr_line(&stmt.attrs, "hash").is_some();
            if !pinned {
                self.error(
                    stmt,
                    format!("import \"{}\" is not pinned (policy requires \"pinned imports\")", stmt.name),
                    Some("add a version or content hash to this import".to_string()),
                );
            }
        }
    }
}

fn attr_line<'a>(attrs: &'a [AttrLine], key: &str) -> Option<&'a AttrLine> {
    attrs.iter().find(|a| a.key == key)
}

/// Validate a parsed file. Returns every structural and semantic issue found,
/// sorted by source position for stable diagnostic output.
pub fn validate(file: &str, ast: &File) -> Vec<ValidationError> {
    let mut v = Validator {
        file: file.to_string(),
        errors: Vec::new(),
    };
    v.structural_pass(ast);
    v.semantic_pass(ast);
    v.errors.sort_by(|a, b| (a.line, a.column).cmp(&(b.line, b.column)));
    v.errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn unknown_attribute_gets_a_suggestion() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

agent "a" {
    modle "gpt-4"
}
"#;
        let (ast, parse_errors) = parse("p.ias", src);
        assert!(parse_errors.is_empty());
        let errors = validate("p.ias", &ast);
        assert!(errors.iter().any(|e| e.hint.as_deref() == Some("did you mean: model?")));
    }

    #[test]
    fn missing_required_attribute_is_reported() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

agent "a" { }
"#;
        let (ast, _) = parse("p.ias", src);
        let errors = validate("p.ias", &ast);
        assert!(errors.iter().any(|e| e.message.contains("missing required attribute \"model\"")));
    }

    #[test]
    fn undeclared_prompt_reference_is_reported() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

agent "a" {
    model "gpt-4"
    uses_prompt "missing"
}
"#;
        let (ast, _) = parse("p.ias", src);
        let errors = validate("p.ias", &ast);
        assert!(errors.iter().any(|e| e.message.contains("undeclared prompt \"missing\"")));
    }

    #[test]
    fn delegation_cycle_is_detected() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

agent "a" {
    model "gpt-4"
    delegates_to ["b"]
}
agent "b" {
    model "gpt-4"
    delegates_to ["a"]
}
"#;
        let (ast, _) = parse("p.ias", src);
        let errors = validate("p.ias", &ast);
        assert!(errors.iter().any(|e| e.message.contains("cycle detected in delegates_to graph")));
    }

    #[test]
    fn pinned_imports_policy_flags_unpinned_import() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

policy "strict" {
    require ["pinned imports"]
}
import "some-lib" {
    path "github.com/example/some-lib"
}
"#;
        let (ast, _) = parse("p.ias", src);
        let errors = validate("p.ias", &ast);
        assert!(errors.iter().any(|e| e.message.contains("is not pinned")));
    }

    #[test]
    fn pinned_import_with_version_passes() {
        let src = r#"
package "p" version "0.1.0" lang "2.0"

policy "strict" {
    require ["pinned imports"]
}
import "some-lib" {
    path "github.com/example/some-lib"
    version "1.2.3"
}
"#;
        let (ast, _) = parse("p.ias", src);
        let errors = validate("p.ias", &ast);
        assert!(!errors.iter().any(|e| e.message.contains("is not pinned")));
    }
}
