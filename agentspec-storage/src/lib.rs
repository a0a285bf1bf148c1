//! Plan engine (C4) and local-disk state backend (C5).

pub mod lock;
pub mod plan;
pub mod state;

pub use lock::{LockOptions, StateLock};
pub use plan::{diff, resolve_deploy_target};
pub use state::FileStateBackend;
