//! Concrete `Strategy` implementations (§4.9).

pub mod map_reduce;
pub mod plan_execute;
pub mod reason_act;
pub mod reflexion;
pub mod router;

pub use map_reduce::MapReduceStrategy;
pub use plan_execute::PlanExecuteStrategy;
pub use reason_act::ReasonActStrategy;
pub use reflexion::ReflexionStrategy;
pub use router::{KeywordRouter, RouterStrategy, RoutingRule};
