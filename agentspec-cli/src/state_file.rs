//! Resolves the on-disk state file path (§6), including the one-time
//! rename-forward of the legacy `.agentz.state.json` name. No counterpart
//! in `agentspec-storage` performs this rename — `FileStateBackend` only
//! knows the path it's given, so the legacy-name discovery belongs at the
//! CLI boundary where the default path is chosen.

use std::path::{Path, PathBuf};

const CURRENT_NAME: &str = ".agentspec.state.json";
const LEGACY_NAME: &str = ".agentz.state.json";

/// Resolves the path `apply`/`plan`/etc. should use: an explicit
/// `--state-file` always wins; otherwise `.agentspec.state.json` in `dir`,
/// renaming a legacy `.agentz.state.json` forward (with its `.bak`/`.lock`
/// siblings left alone) if the current name doesn't exist yet but the
/// legacy one does.
pub fn resolve(explicit: Option<&Path>, dir: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let current = dir.join(CURRENT_NAME);
    let legacy = dir.join(LEGACY_NAME);

    if !current.exists() && legacy.exists() {
        match std::fs::rename(&legacy, &current) {
            Ok(()) => {
                eprintln!("warning: renamed legacy state file {} to {}", legacy.display(), current.display());
            }
            Err(e) => {
                eprintln!("warning: found legacy state file {} but could not rename it to {}: {e}", legacy.display(), current.display());
                return legacy;
            }
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_always_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.json");
        assert_eq!(resolve(Some(&explicit), dir.path()), explicit);
    }

    #[test]
    fn defaults_to_current_name_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve(None, dir.path()), dir.path().join(CURRENT_NAME));
    }

    #[test]
    fn legacy_file_is_renamed_forward() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LEGACY_NAME), b"[]").unwrap();
        let resolved = resolve(None, dir.path());
        assert_eq!(resolved, dir.path().join(CURRENT_NAME));
        assert!(resolved.exists());
        assert!(!dir.path().join(LEGACY_NAME).exists());
    }

    #[test]
    fn current_name_present_is_left_alone_even_if_legacy_also_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CURRENT_NAME), b"[\"current\"]").unwrap();
        std::fs::write(dir.path().join(LEGACY_NAME), b"[\"legacy\"]").unwrap();
        let resolved = resolve(None, dir.path());
        assert_eq!(std::fs::read_to_string(resolved).unwrap(), "[\"current\"]");
    }
}
