//! Advisory cross-process locking for the state backend (§4.5). Grounded on
//! the teacher's `Exclusive`/`Shared` lock-mode typestate (the teacher's own
//! lock guards a database row; this one guards a sibling `.lock` file on
//! disk via `fs4`, the one dependency this crate adds that the teacher never
//! needed).

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use agentspec_core::{AgentSpecResult, Clock, StateError};
use fs4::fs_std::FileExt as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockRecord {
    pid: u32,
    hostname: String,
    created_at: String,
}

/// Holds the advisory lock for as long as it is alive; dropping it releases
/// the OS-level lock and, best-effort, removes the lock file.
pub struct StateLock {
    path: PathBuf,
    file: File,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}

pub struct LockOptions {
    /// How long `acquire` waits for a contended lock before giving up.
    pub wait_timeout: Duration,
    /// A lock older than this is considered abandoned even if its holder
    /// PID still exists (e.g. PID reuse).
    pub stale_threshold: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(10),
            stale_threshold: Duration::from_secs(300),
        }
    }
}

/// Acquire the advisory lock at `lock_path`. Tries a non-blocking lock
/// first; on contention, polls until `wait_timeout` elapses or the existing
/// holder is judged dead or stale, in which case the lock is broken (with a
/// warning logged by the caller) and re-acquired.
pub fn acquire(lock_path: &Path, clock: &dyn Clock, opts: &LockOptions) -> AgentSpecResult<StateLock> {
    let deadline = Instant::now() + opts.wait_timeout;
    loop {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| StateError::Io(e.to_string()))?;

        if file.try_lock_exclusive().is_ok() {
            write_record(&file)?;
            return Ok(StateLock {
                path: lock_path.to_path_buf(),
                file,
            });
        }

        let record = read_record(lock_path);
        if let Some(record) = &record {
            if !pid_alive(record.pid) || is_stale(record, clock, opts.stale_threshold) {
                tracing::warn!(pid = record.pid, hostname = %record.hostname, "breaking abandoned state lock");
                let _ = std::fs::remove_file(lock_path);
                continue;
            }
            if Instant::now() >= deadline {
                return Err(StateError::StateLocked {
                    holder_pid: record.pid,
                    hostname: record.hostname.clone(),
                    locked_at: record.created_at.clone(),
                }
                .into());
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn write_record(file: &File) -> AgentSpecResult<()> {
    let record = LockRecord {
        pid: std::process::id(),
        hostname: hostname(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    let bytes = serde_json::to_vec(&record).expect("lock record serialization is infallible");
    use std::io::Seek;
    file.set_len(0).map_err(|e| StateError::Io(e.to_string()))?;
    let mut f: &File = file;
    f.seek(std::io::SeekFrom::Start(0)).map_err(|e| StateError::Io(e.to_string()))?;
    f.write_all(&bytes).map_err(|e| StateError::Io(e.to_string()))?;
    file.sync_all().map_err(|e| StateError::Io(e.to_string()))?;
    Ok(())
}

fn read_record(path: &Path) -> Option<LockRecord> {
    let mut contents = String::new();
    File::open(path).ok()?.read_to_string(&mut contents).ok()?;
    serde_json::from_str(&contents).ok()
}

fn is_stale(record: &LockRecord, clock: &dyn Clock, threshold: Duration) -> bool {
    match chrono::DateTime::parse_from_rfc3339(&record.created_at) {
        Ok(created) => {
            let age = clock.now().signed_duration_since(created.with_timezone(&chrono::Utc));
            age.to_std().map(|age| age > threshold).unwrap_or(false)
        }
        Err(_) => true,
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Best-effort liveness check for a PID recorded in a lock file. `/proc`
/// existence is a Linux-only signal; on any other platform (or any error)
/// the PID is assumed alive so a spurious lock break never happens.
#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentspec_core::SystemClock;

    #[test]
    fn acquire_then_drop_releases_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(".lock");
        let clock = SystemClock;
        let opts = LockOptions::default();

        let guard = acquire(&lock_path, &clock, &opts).unwrap();
        drop(guard);
        assert!(!lock_path.exists());
    }

    #[test]
    fn contended_lock_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(".lock");
        let clock = SystemClock;
        let opts = LockOptions {
            wait_timeout: Duration::from_millis(50),
            stale_threshold: Duration::from_secs(300),
        };

        let _holder = acquire(&lock_path, &clock, &opts).unwrap();
        let result = acquire(&lock_path, &clock, &opts);
        assert!(result.is_err());
    }
}
