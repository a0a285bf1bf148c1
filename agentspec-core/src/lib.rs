//! AgentSpec Core - Resource Graph Types
//!
//! Pure data structures with no I/O: the resource graph (`Resource`, `Package`),
//! the plan/state model (`Action`, `Plan`, `StateEntry`), the error taxonomy,
//! a clock abstraction for testable time, and structured events. All other
//! crates depend on this one.

pub mod clock;
pub mod error;
pub mod event;
pub mod plan;
pub mod resource;

pub use clock::*;
pub use error::*;
pub use event::*;
pub use plan::*;
pub use resource::*;
