use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reply returned by a skill's `Run` or `FollowUp` procedure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillResponse {
    /// Message text for the user
    pub text: String,
    /// Structured metadata attached by the skill
    #[serde(default)]
    pub state: HashMap<String, serde_json::Value>,
}

impl SkillResponse {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            state: HashMap::new(),
        }
    }

    pub fn with_state(mut self, key: &str, value: serde_json::Value) -> Self {
        self.state.insert(key.to_string(), value);
        self
    }
}

/// What the previous turn left behind for a user: the route that handled it
/// and whatever state the skill wanted to keep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastResponse {
    pub route: String,
    #[serde(default)]
    pub state: HashMap<String, serde_json::Value>,
}

impl LastResponse {
    pub fn new(route: &str) -> Self {
        Self {
            route: route.to_string(),
            state: HashMap::new(),
        }
    }

    pub fn with_state(mut self, key: &str, value: serde_json::Value) -> Self {
        self.state.insert(key.to_string(), value);
        self
    }
}
