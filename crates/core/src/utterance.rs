use serde::{Deserialize, Serialize};

use crate::id::{UserId, UtteranceId};
use crate::response::LastResponse;

/// Tokens recognized upstream, in the order they appeared in the sentence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredInput {
    pub commands: Vec<String>,
    pub objects: Vec<String>,
}

/// A single incoming turn of a conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    #[serde(default)]
    pub id: UtteranceId,
    /// `None` for users who have not been onboarded yet
    pub user: Option<UserId>,
    /// Raw sentence, kept for the skill's benefit
    #[serde(default)]
    pub sentence: String,
    pub input: StructuredInput,
    /// Route stamped by the dispatcher before the skill is called
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub last_response: Option<LastResponse>,
}

impl Utterance {
    pub fn new(user: Option<UserId>) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    pub fn with_sentence(mut self, sentence: &str) -> Self {
        self.sentence = sentence.to_string();
        self
    }

    pub fn with_commands(mut self, commands: Vec<&str>) -> Self {
        self.input.commands = commands.into_iter().map(String::from).collect();
        self
    }

    pub fn with_objects(mut self, objects: Vec<&str>) -> Self {
        self.input.objects = objects.into_iter().map(String::from).collect();
        self
    }

    pub fn with_last_response(mut self, last: LastResponse) -> Self {
        self.last_response = Some(last);
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.input.commands
    }

    pub fn objects(&self) -> &[String] {
        &self.input.objects
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// A turn with no commands continues whatever was going on before.
    pub fn is_continuation(&self) -> bool {
        self.input.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let u = Utterance::new(Some(UserId::new(7)))
            .with_commands(vec!["get"])
            .with_objects(vec!["forecast"]);
        assert!(u.is_authenticated());
        assert!(!u.is_continuation());
        assert_eq!(u.commands(), ["get".to_string()]);
        assert_eq!(u.objects(), ["forecast".to_string()]);
    }

    #[test]
    fn test_deserialize_minimal_payload() {
        let json = r#"{"user":null,"input":{"commands":[],"objects":["yes"]}}"#;
        let u: Utterance = serde_json::from_str(json).unwrap();
        assert!(!u.is_authenticated());
        assert!(u.is_continuation());
        assert!(u.route.is_none());
        assert!(u.last_response.is_none());
    }
}
