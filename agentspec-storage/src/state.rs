//! Local-disk state backend (§4.5): a JSON array of `StateEntry` persisted
//! with atomic writes, `.bak` corruption recovery, and advisory locking via
//! `lock.rs`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agentspec_core::{AgentSpecResult, Clock, StateEntry, StateError};

use crate::lock::{self, LockOptions, StateLock};

pub struct FileStateBackend {
    path: PathBuf,
    bak_path: PathBuf,
    lock_path: PathBuf,
    lock_opts: LockOptions,
}

impl FileStateBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let bak_path = sibling(&path, "bak");
        let lock_path = sibling(&path, "lock");
        Self {
            path,
            bak_path,
            lock_path,
            lock_opts: LockOptions::default(),
        }
    }

    pub fn with_lock_options(mut self, opts: LockOptions) -> Self {
        self.lock_opts = opts;
        self
    }

    /// Acquire the exclusive lock `apply` needs to serialize mutations
    /// against other processes. Callers hold the returned guard for the
    /// duration of the read-modify-write.
    pub fn lock(&self, clock: &dyn Clock) -> AgentSpecResult<StateLock> {
        lock::acquire(&self.lock_path, clock, &self.lock_opts)
    }

    /// Load current entries. On primary decode failure, falls back to
    /// `.bak`; on success the backup is promoted back to primary and a
    /// warning is logged. Double failure is a distinct, non-recoverable
    /// error so the operator can intervene manually.
    pub fn load(&self) -> AgentSpecResult<Vec<StateEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        match self.try_decode(&self.path) {
            Ok(entries) => Ok(entries),
            Err(primary_err) => {
                tracing::error!(path = %self.path.display(), error = %primary_err, "state file corrupted, attempting backup");
                match self.try_decode(&self.bak_path) {
                    Ok(entries) => {
                        fs::copy(&self.bak_path, &self.path).map_err(|e| StateError::Io(e.to_string()))?;
                        tracing::warn!(path = %self.path.display(), "restored state from backup after corruption");
                        Ok(entries)
                    }
                    Err(_) => Err(StateError::BothCorrupted {
                        path: self.path.display().to_string(),
                    }
                    .into()),
                }
            }
        }
    }

    fn try_decode(&self, path: &Path) -> Result<Vec<StateEntry>, String> {
        let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&contents).map_err(|e| e.to_string())
    }

    /// Atomically persist `entries`: write to a sibling temp file, fsync,
    /// rename the current primary to `.bak`, then rename the temp into
    /// place. Both renames are filesystem-atomic, so a crash at any point
    /// leaves either the old or the new state intact — never a half-written
    /// file in the primary path.
    pub fn save(&self, entries: &[StateEntry]) -> AgentSpecResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let bytes = serde_json::to_vec_pretty(entries).expect("state entries are always serializable");

        let mut tmp = tempfile::Builder::new()
            .prefix(".agentspec-state-")
            .tempfile_in(dir)
            .map_err(|e| StateError::Io(e.to_string()))?;
        use std::io::Write;
        tmp.write_all(&bytes).map_err(|e| StateError::Io(e.to_string()))?;
        tmp.as_file().sync_all().map_err(|e| StateError::Io(e.to_string()))?;

        if self.path.exists() {
            fs::rename(&self.path, &self.bak_path).map_err(|e| StateError::Io(e.to_string()))?;
        }
        tmp.persist(&self.path).map_err(|e| StateError::Io(e.error.to_string()))?;
        Ok(())
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().and_then(|n| n.to_str()).unwrap_or("state").to_string();
    name.push('.');
    name.push_str(extension);
    path.with_file_name(name)
}

/// How long a stale lock is tolerated before `apply` breaks it, and how long
/// `apply` waits on a live contended lock — both configurable per §4.5 and
/// exposed to the CLI's `--lock-timeout` flag.
pub fn lock_options(wait_timeout: Duration, stale_threshold: Duration) -> LockOptions {
    LockOptions {
        wait_timeout,
        stale_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::{SystemClock, Status};
    use chrono::Utc;

    fn entry(fqn: &str) -> StateEntry {
        StateEntry {
            fqn: fqn.to_string(),
            hash: "h".to_string(),
            status: Status::Applied,
            last_applied: Utc::now(),
            adapter: "process".to_string(),
            error: None,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileStateBackend::new(dir.path().join("state.json"));
        backend.save(&[entry("p/agent/a")]).unwrap();
        let loaded = backend.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].fqn, "p/agent/a");
    }

    #[test]
    fn missing_state_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileStateBackend::new(dir.path().join("state.json"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn corrupted_primary_falls_back_to_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let backend = FileStateBackend::new(&path);
        backend.save(&[entry("p/agent/a")]).unwrap();
        backend.save(&[entry("p/agent/a"), entry("p/agent/b")]).unwrap();

        fs::write(&path, b"not json").unwrap();
        let loaded = backend.load().unwrap();
        assert_eq!(loaded.len(), 1, "should recover the first save from .bak");
    }

    #[test]
    fn both_corrupted_is_a_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let backend = FileStateBackend::new(&path);
        fs::write(&path, b"not json").unwrap();
        fs::write(&backend.bak_path, b"also not json").unwrap();
        let err = backend.load().unwrap_err();
        assert!(matches!(err, agentspec_core::AgentSpecError::State(StateError::BothCorrupted { .. })));
    }

    #[test]
    fn lock_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileStateBackend::new(dir.path().join("state.json"));
        let clock = SystemClock;
        let guard = backend.lock(&clock).unwrap();
        drop(guard);
    }
}
