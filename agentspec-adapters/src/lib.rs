//! Deploy-target adapters: a uniform `Adapter` trait plus the four built-in
//! implementations (process, docker, docker compose, kubernetes) and a
//! registry that looks them up by name.

pub mod adapter;
pub mod compose;
pub mod docker;
pub mod kubernetes;
pub mod process;
pub mod registry;

pub use adapter::{Adapter, LogOptions};
pub use compose::ComposeAdapter;
pub use docker::DockerAdapter;
pub use kubernetes::KubernetesAdapter;
pub use process::ProcessAdapter;
pub use registry::{builtin_registry, AdapterRegistry};
