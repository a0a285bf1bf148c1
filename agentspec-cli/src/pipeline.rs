//! The shared front-end pipeline every source-consuming command drives:
//! read, parse, validate, lower. Grounded on `agentspec-dsl`'s own
//! `lower` doctest chain (`parse` -> `validate` -> `lower`), just wired
//! across possibly many files into one merged package.

use std::path::Path;

use agentspec_core::resource::{Kind, Package};
use agentspec_dsl::{lower, parse, validate};

use crate::diagnostics::Diagnostic;

/// Everything collected while compiling one or more source files: the
/// merged package (resources from every file that lowered cleanly) plus
/// every diagnostic raised along the way, parse and validation alike.
pub struct CompileOutcome {
    pub package: Package,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutcome {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Compiles `files` into a single merged `Package`. Every file is parsed
/// and validated independently (so one broken file doesn't stop diagnostics
/// from the rest); a file that fails to lower contributes no resources but
/// still reports its diagnostics.
pub fn compile_files(files: &[impl AsRef<Path>], default_package_name: &str) -> CompileOutcome {
    let mut diagnostics = Vec::new();
    let mut resources = Vec::new();
    let mut name = default_package_name.to_string();
    let mut version = "0.1.0".to_string();
    let mut lang_version = "2.0".to_string();
    let mut named = false;

    for path in files {
        let path = path.as_ref();
        let file_label = path.to_string_lossy().to_string();
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                diagnostics.push(Diagnostic::error(&file_label, 0, 0, &format!("could not read file: {e}"), &None));
                continue;
            }
        };

        let (ast, parse_errors) = parse(&file_label, &source);
        diagnostics.extend(parse_errors.iter().map(Diagnostic::from));

        let validation_errors = validate(&file_label, &ast);
        diagnostics.extend(validation_errors.iter().map(Diagnostic::from));

        if !validation_errors.is_empty() {
            continue;
        }

        if !named {
            name = ast.package.name.clone();
            named = true;
        }
        version = ast.package.version.clone();
        lang_version = ast.package.lang.clone();

        match lower(&file_label, &ast) {
            Ok(doc) => resources.extend(doc.package.resources),
            Err(lower_errors) => {
                for e in lower_errors {
                    diagnostics.push(Diagnostic::error(&file_label, 0, 0, &e.to_string(), &None));
                }
            }
        }
    }

    resources.sort_by(|a, b| (a.kind, &a.name).cmp(&(b.kind, &b.name)));

    CompileOutcome {
        package: Package { name, version, lang_version, resources },
        diagnostics,
    }
}

pub fn deploy_targets(package: &Package) -> Vec<&agentspec_core::resource::Resource> {
    package.of_kind(Kind::Deploy).collect()
}
