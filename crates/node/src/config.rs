use std::path::PathBuf;
use std::time::Duration;

/// Where the daemon keeps each user's last response
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreBackend {
    Memory,
    Rocks,
}

pub struct DaemonConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub store: StoreBackend,
    pub connect_timeout: Duration,
    pub call_timeout: Duration,
}

impl DaemonConfig {
    pub fn new(
        host: String,
        port: u16,
        data_dir: Option<String>,
        store: StoreBackend,
        connect_timeout_secs: u64,
        call_timeout_secs: u64,
    ) -> Self {
        let data_dir = data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                directories::ProjectDirs::from("dev", "parley", "parleyd")
                    .map(|d| d.data_dir().to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(".parley"))
            });

        Self {
            host,
            port,
            data_dir,
            store,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            call_timeout: Duration::from_secs(call_timeout_secs),
        }
    }

    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("last_responses")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_data_dir() {
        let config = DaemonConfig::new(
            "127.0.0.1".to_string(),
            4000,
            Some("/tmp/parley".to_string()),
            StoreBackend::Memory,
            5,
            30,
        );
        assert_eq!(config.control_addr(), "127.0.0.1:4000");
        assert_eq!(config.store_path(), PathBuf::from("/tmp/parley/last_responses"));
        assert_eq!(config.call_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_default_data_dir_is_set() {
        let config = DaemonConfig::new(
            "0.0.0.0".to_string(),
            4000,
            None,
            StoreBackend::Memory,
            5,
            30,
        );
        assert!(!config.data_dir.as_os_str().is_empty());
    }
}
