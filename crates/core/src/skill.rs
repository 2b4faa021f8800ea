use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::route::{normalize_token, route_key};

/// Command and object tokens a skill wants to be notified about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub commands: Vec<String>,
    pub objects: Vec<String>,
}

impl Trigger {
    pub fn new(commands: Vec<&str>, objects: Vec<&str>) -> Self {
        Self {
            commands: commands.into_iter().map(String::from).collect(),
            objects: objects.into_iter().map(String::from).collect(),
        }
    }

    /// Every registry key this trigger claims, in registration order and
    /// without duplicates: the compound keys of each command followed by the
    /// bare command itself.
    pub fn route_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        let mut push = |key: String| {
            if !keys.contains(&key) {
                keys.push(key);
            }
        };

        for command in &self.commands {
            for object in &self.objects {
                push(route_key(command, object));
            }
            push(normalize_token(command));
        }

        keys
    }
}

/// Identity, location and trigger of a skill service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    /// Skill name, also the prefix of its remote procedures
    pub name: String,
    /// Host the skill listens on
    pub host: String,
    /// Control port; the RPC listener is on `port + 1`
    pub port: u16,
    pub trigger: Trigger,
}

impl SkillDescriptor {
    pub fn new(name: &str, host: &str, port: u16, trigger: Trigger) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
            trigger,
        }
    }

    pub fn rpc_port(&self) -> Result<u16> {
        self.port
            .checked_add(1)
            .ok_or(CoreError::PortOverflow(self.port))
    }

    /// `host:port+1`, the address the dispatch core dials.
    pub fn rpc_addr(&self) -> Result<String> {
        Ok(format!("{}:{}", self.host, self.rpc_port()?))
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidDescriptor("empty skill name".into()));
        }
        if self.host.trim().is_empty() {
            return Err(CoreError::InvalidDescriptor(format!(
                "skill {} has no host",
                self.name
            )));
        }
        self.rpc_port()?;
        Ok(())
    }

    /// Name used to qualify remote procedures: the first letter after every
    /// word boundary is upper-cased, everything else is kept as is.
    pub fn procedure_prefix(&self) -> String {
        let mut prefix = String::with_capacity(self.name.len());
        let mut at_boundary = true;
        for c in self.name.chars() {
            if at_boundary {
                prefix.extend(c.to_uppercase());
            } else {
                prefix.push(c);
            }
            at_boundary = is_word_separator(c);
        }
        prefix
    }
}

/// Letters, digits and `_` belong to a word; other ASCII characters and
/// whitespace separate words.
fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphanumeric() {
        return false;
    }
    c.is_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_addr_is_adjacent_port() {
        let desc = SkillDescriptor::new("weather", "127.0.0.1", 4100, Trigger::default());
        assert_eq!(desc.rpc_addr().unwrap(), "127.0.0.1:4101");
    }

    #[test]
    fn test_rpc_port_overflow() {
        let desc = SkillDescriptor::new("weather", "127.0.0.1", u16::MAX, Trigger::default());
        assert_eq!(desc.rpc_port(), Err(CoreError::PortOverflow(u16::MAX)));
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let desc = SkillDescriptor::new("  ", "localhost", 4000, Trigger::default());
        assert!(matches!(desc.validate(), Err(CoreError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_procedure_prefix() {
        let desc = SkillDescriptor::new("weather", "localhost", 4000, Trigger::default());
        assert_eq!(desc.procedure_prefix(), "Weather");

        let desc = SkillDescriptor::new("movie tickets", "localhost", 4000, Trigger::default());
        assert_eq!(desc.procedure_prefix(), "Movie Tickets");
    }

    #[test]
    fn test_procedure_prefix_word_boundaries() {
        let prefix = |name: &str| {
            SkillDescriptor::new(name, "localhost", 4000, Trigger::default()).procedure_prefix()
        };

        assert_eq!(prefix("movie-tickets"), "Movie-Tickets");
        assert_eq!(prefix("movie  tickets"), "Movie  Tickets");
        assert_eq!(prefix("smart_home"), "Smart_home");
        assert_eq!(prefix("2fa codes"), "2fa Codes");
        assert_eq!(prefix("caf\u{e9}.menu"), "Caf\u{e9}.Menu");
        assert_eq!(prefix("iPhone"), "IPhone");
    }

    #[test]
    fn test_trigger_route_keys() {
        let trigger = Trigger::new(vec!["Get", "show"], vec!["forecast", "Weather"]);
        assert_eq!(
            trigger.route_keys(),
            vec![
                "get_forecast",
                "get_weather",
                "get",
                "show_forecast",
                "show_weather",
                "show",
            ]
        );
    }

    #[test]
    fn test_trigger_route_keys_deduplicates() {
        let trigger = Trigger::new(vec!["get", "GET"], vec!["forecast"]);
        assert_eq!(trigger.route_keys(), vec!["get_forecast", "get"]);
    }

    #[test]
    fn test_trigger_without_objects_registers_bare_commands() {
        let trigger = Trigger::new(vec!["onboard"], vec![]);
        assert_eq!(trigger.route_keys(), vec!["onboard"]);
    }
}
