//! Plugin resolution paths (§4.7): project-local, then the user cache
//! directory, then a deprecated legacy path kept for compatibility and
//! flagged with a warning, mirroring the `.agentspec.state.json` /
//! `.agentz.state.json` legacy-name convention used by the state backend.

use std::path::{Path, PathBuf};

/// One directory a `.wasm` module was found under, tagged with where it
/// came from so the caller can log a warning for legacy hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    ProjectLocal(PathBuf),
    UserCache(PathBuf),
    Legacy(PathBuf),
}

impl PluginSource {
    pub fn path(&self) -> &Path {
        match self {
            PluginSource::ProjectLocal(p) | PluginSource::UserCache(p) | PluginSource::Legacy(p) => p,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, PluginSource::Legacy(_))
    }
}

fn project_local_dir(project_root: &Path) -> PathBuf {
    project_root.join(".agentspec").join("plugins")
}

fn user_cache_dir() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg).join("agentspec").join("plugins"));
        }
    }
    std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".cache").join("agentspec").join("plugins"))
}

fn legacy_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".agentz").join("plugins"))
}

/// Search resolution directories in priority order and return every
/// `.wasm` file found, annotated with which directory produced it. Later
/// directories never shadow earlier ones by name; callers see every hit.
pub fn resolve_plugin_sources(project_root: &Path) -> Vec<PluginSource> {
    let mut sources = Vec::new();
    collect_wasm_files(&project_local_dir(project_root), PluginSource::ProjectLocal, &mut sources);
    if let Some(dir) = user_cache_dir() {
        collect_wasm_files(&dir, PluginSource::UserCache, &mut sources);
    }
    if let Some(dir) = legacy_dir() {
        collect_wasm_files(&dir, PluginSource::Legacy, &mut sources);
    }
    sources
}

fn collect_wasm_files(dir: &Path, wrap: impl Fn(PathBuf) -> PluginSource, out: &mut Vec<PluginSource>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("wasm"))
        .collect();
    paths.sort();
    out.extend(paths.into_iter().map(wrap));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_local_dir_is_dot_agentspec_plugins() {
        let root = Path::new("/tmp/proj");
        assert_eq!(project_local_dir(root), PathBuf::from("/tmp/proj/.agentspec/plugins"));
    }

    #[test]
    fn finds_wasm_files_under_project_local() {
        let tmp = tempfile::tempdir().unwrap();
        let plugins_dir = tmp.path().join(".agentspec").join("plugins");
        std::fs::create_dir_all(&plugins_dir).unwrap();
        std::fs::write(plugins_dir.join("retry.wasm"), b"fake").unwrap();
        std::fs::write(plugins_dir.join("notes.txt"), b"ignored").unwrap();

        let sources = resolve_plugin_sources(tmp.path());
        assert_eq!(sources.len(), 1);
        assert!(matches!(sources[0], PluginSource::ProjectLocal(_)));
        assert!(!sources[0].is_legacy());
    }
}
