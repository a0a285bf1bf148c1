//! Secret resolution, log redaction, and policy enforcement (§4.12).

pub mod policy;
pub mod redaction;
pub mod resolver;
pub mod secret;

pub use policy::{PolicyEngine, PolicyMode, Requirement, Violation};
pub use redaction::{RedactingFieldFormatter, RedactionRegistry};
pub use resolver::{ChainedResolver, EnvProvider, FileStoreProvider, SecretProvider};
pub use secret::{Secret, SecretRef};
