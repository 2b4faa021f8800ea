pub mod error;
pub mod id;
pub mod response;
pub mod route;
pub mod skill;
pub mod utterance;

pub use error::{CoreError, Result};
pub use id::{UserId, UtteranceId};
pub use response::{LastResponse, SkillResponse};
pub use route::{normalize_token, route_key, strip_literal, ONBOARD_ROUTE};
pub use skill::{SkillDescriptor, Trigger};
pub use utterance::{StructuredInput, Utterance};
