pub mod channel;
pub mod connector;
pub mod control;
pub mod error;
pub mod executor;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod service;

pub use channel::SkillChannel;
pub use connector::{Connector, TcpConnector};
pub use control::ControlService;
pub use error::{Result, SkillError};
pub use executor::{DispatchFailure, DispatchResult, Dispatcher, InvocationMode};
pub use protocol::{ControlClient, DispatchReply, DispatchRequest};
pub use registry::{RegistryEntry, SkillRegistry};
pub use router::{ResolvedRoute, RouteResolver};
pub use service::{RunningSkill, SkillHandler, SkillService};
