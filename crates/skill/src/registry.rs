use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use parley_core::SkillDescriptor;

use crate::channel::SkillChannel;
use crate::connector::Connector;
use crate::error::Result;

/// A registered skill and the connection it is reached through
pub struct RegistryEntry {
    pub descriptor: SkillDescriptor,
    pub channel: Arc<dyn SkillChannel>,
}

impl RegistryEntry {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("descriptor", &self.descriptor)
            .field("endpoint", &self.channel.endpoint())
            .finish()
    }
}

/// Process-wide map from route keys to registered skills.
///
/// Safe to share between concurrent registrations and lookups. A lookup that
/// races a registration sees either the old or the new entry.
#[derive(Default)]
pub struct SkillRegistry {
    routes: DashMap<String, Arc<RegistryEntry>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection to the skill and register it. Nothing is inserted
    /// when the skill cannot be reached.
    pub async fn connect(
        &self,
        connector: &dyn Connector,
        descriptor: SkillDescriptor,
    ) -> Result<Vec<String>> {
        descriptor.validate()?;
        let channel = connector.connect(&descriptor).await?;
        Ok(self.register(descriptor, channel))
    }

    /// Insert the entry under every key its trigger derives. An existing
    /// entry for a key is replaced with a warning. Returns the keys written.
    pub fn register(
        &self,
        descriptor: SkillDescriptor,
        channel: Arc<dyn SkillChannel>,
    ) -> Vec<String> {
        let keys = descriptor.trigger.route_keys();
        let entry = Arc::new(RegistryEntry {
            descriptor,
            channel,
        });

        if keys.is_empty() {
            warn!("Skill {} registered with an empty trigger", entry.name());
        }

        for key in &keys {
            if let Some(previous) = self.routes.insert(key.clone(), Arc::clone(&entry)) {
                warn!(
                    "Duplicate skill or trigger: {} replaces {} for route '{}'",
                    entry.name(),
                    previous.name(),
                    key
                );
            } else {
                debug!("Route '{}' -> {}", key, entry.name());
            }
        }

        info!(
            "Registered skill {} at {} ({} routes)",
            entry.name(),
            entry.channel.endpoint(),
            keys.len()
        );

        keys
    }

    pub fn find(&self, key: &str) -> Option<Arc<RegistryEntry>> {
        self.routes.get(key).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.routes.contains_key(key)
    }

    /// All registered route keys, sorted
    pub fn routes(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.routes.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::{SkillResponse, Trigger, Utterance};
    use parley_grid::GridError;

    /// Channel that answers every call with its own name
    pub(crate) struct NamedChannel(pub &'static str);

    #[async_trait]
    impl SkillChannel for NamedChannel {
        async fn invoke(
            &self,
            _method: &str,
            _utterance: &Utterance,
        ) -> parley_grid::Result<SkillResponse> {
            Ok(SkillResponse::new(self.0))
        }

        fn endpoint(&self) -> String {
            format!("mem://{}", self.0)
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Connector for Unreachable {
        async fn connect(&self, descriptor: &SkillDescriptor) -> Result<Arc<dyn SkillChannel>> {
            Err(crate::error::SkillError::Connection {
                skill: descriptor.name.clone(),
                source: GridError::ConnectionFailed("refused".into()),
            })
        }
    }

    fn descriptor(name: &str, commands: Vec<&str>, objects: Vec<&str>) -> SkillDescriptor {
        SkillDescriptor::new(name, "127.0.0.1", 4100, Trigger::new(commands, objects))
    }

    #[test]
    fn test_register_compound_and_bare_command_keys() {
        let registry = SkillRegistry::new();
        let keys = registry.register(
            descriptor("weather", vec!["Get"], vec!["Forecast", "rain"]),
            Arc::new(NamedChannel("weather")),
        );

        assert_eq!(keys, vec!["get_forecast", "get_rain", "get"]);
        assert_eq!(registry.routes(), vec!["get", "get_forecast", "get_rain"]);
        assert_eq!(registry.find("get_forecast").unwrap().name(), "weather");
        assert!(registry.find("forecast").is_none());
    }

    #[test]
    fn test_duplicate_trigger_last_registration_wins() {
        let registry = SkillRegistry::new();
        registry.register(
            descriptor("weather", vec!["get"], vec!["forecast"]),
            Arc::new(NamedChannel("weather")),
        );
        registry.register(
            descriptor("almanac", vec!["get"], vec!["forecast"]),
            Arc::new(NamedChannel("almanac")),
        );

        assert_eq!(registry.find("get_forecast").unwrap().name(), "almanac");
        assert_eq!(registry.find("get").unwrap().name(), "almanac");
        assert_eq!(registry.len(), 2);
    }

    /// Run `f` with log output captured as plain text
    fn capture_logs(f: impl FnOnce()) -> String {
        let buffer = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || LogSink(Arc::clone(&sink)))
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = buffer.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    struct LogSink(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_duplicate_trigger_warns_with_skill_and_key() {
        let registry = SkillRegistry::new();
        registry.register(
            descriptor("weather", vec!["get"], vec!["forecast"]),
            Arc::new(NamedChannel("weather")),
        );

        let logs = capture_logs(|| {
            registry.register(
                descriptor("almanac", vec!["get"], vec!["forecast"]),
                Arc::new(NamedChannel("almanac")),
            );
        });

        let warning = logs
            .lines()
            .find(|line| line.contains("WARN") && line.contains("'get_forecast'"))
            .expect("no duplicate warning for get_forecast");
        assert!(warning.contains("almanac"));
        assert!(warning.contains("weather"));
        assert!(logs
            .lines()
            .any(|line| line.contains("WARN") && line.contains("'get'")));
    }

    #[test]
    fn test_repeated_key_in_one_registration_does_not_warn() {
        let registry = SkillRegistry::new();

        let logs = capture_logs(|| {
            registry.register(
                descriptor("weather", vec!["get", "Get"], vec!["forecast", "FORECAST"]),
                Arc::new(NamedChannel("weather")),
            );
        });

        assert!(!logs.contains("WARN"), "unexpected warning: {}", logs);
        assert!(logs.contains("Registered skill weather"));
        assert_eq!(registry.routes(), vec!["get", "get_forecast"]);
    }

    #[tokio::test]
    async fn test_unreachable_skill_is_not_registered() {
        let registry = SkillRegistry::new();
        let result = registry
            .connect(
                &Unreachable,
                descriptor("weather", vec!["get"], vec!["forecast"]),
            )
            .await;

        assert!(matches!(
            result,
            Err(crate::error::SkillError::Connection { .. })
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_descriptor_rejected_before_connecting() {
        let registry = SkillRegistry::new();
        let result = registry
            .connect(&Unreachable, descriptor("", vec!["get"], vec![]))
            .await;

        assert!(matches!(
            result,
            Err(crate::error::SkillError::InvalidDescriptor(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_registration_and_lookup() {
        let registry = Arc::new(SkillRegistry::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let name = if i % 2 == 0 { "even" } else { "odd" };
                registry.register(
                    descriptor(name, vec!["get"], vec!["forecast"]),
                    Arc::new(NamedChannel(name)),
                );
                registry.find("get_forecast").is_some()
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(registry.len(), 2);
    }
}
