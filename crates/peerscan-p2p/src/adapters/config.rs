use crate::ports::ConfigProvider;
use crate::service::ScannerConfig;

// ============================================================================
// StaticConfigProvider
// ============================================================================

/// Configuration held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: ScannerConfig,
}

impl StaticConfigProvider {
    #[must_use]
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Replace the bootstrap list.
    #[must_use]
    pub fn with_bootstrap<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.bootstrap = entries.into_iter().map(Into::into).collect();
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn scanner_config(&self) -> ScannerConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider (requires "network" feature)
// ============================================================================

#[cfg(feature = "network")]
mod toml_config {
    use super::*;
    use crate::connection::Timeouts;
    use serde::Deserialize;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use thiserror::Error;

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct ConfigFile {
        #[serde(default)]
        bootstrap: Vec<String>,
        synced_time: Option<u64>,
        threads_count: Option<usize>,
        advertised_port: Option<u16>,
        rpc_probe: Option<bool>,
        channel_capacity: Option<usize>,
        max_message_size: Option<usize>,
        #[serde(default)]
        attempts: AttemptsSection,
        #[serde(default)]
        timeouts: TimeoutsSection,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct AttemptsSection {
        count: Option<u32>,
        timeout: Option<u64>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct TimeoutsSection {
        connect: Option<u64>,
        handshake: Option<u64>,
        message: Option<u64>,
    }

    /// Loads the scanner configuration from a TOML file.
    ///
    /// # Config File Format
    ///
    /// ```toml
    /// bootstrap = ["boot.tzbeta.net", "116.202.172.21"]
    /// synced_time = 120        # seconds
    /// threads_count = 4
    /// advertised_port = 9732
    /// rpc_probe = false
    ///
    /// [attempts]
    /// count = 3                # 0 = unlimited
    /// timeout = 300            # seconds between attempts
    ///
    /// [timeouts]
    /// connect = 8
    /// handshake = 6
    /// message = 10
    /// ```
    ///
    /// Every key is optional; missing ones keep their defaults.
    #[derive(Debug, Clone)]
    pub struct TomlConfigProvider {
        config: ScannerConfig,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if file cannot be read or parsed.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

            let defaults = ScannerConfig::default();
            let secs = |value: Option<u64>, default: Duration| {
                value.map_or(default, Duration::from_secs)
            };
            let timeouts = Timeouts {
                connect: secs(file.timeouts.connect, defaults.timeouts.connect),
                handshake: secs(file.timeouts.handshake, defaults.timeouts.handshake),
                message: secs(file.timeouts.message, defaults.timeouts.message),
            };

            let config = ScannerConfig {
                bootstrap: file.bootstrap,
                synced_time: secs(file.synced_time, defaults.synced_time),
                threads_count: file.threads_count.unwrap_or(defaults.threads_count),
                max_attempts: file.attempts.count.unwrap_or(defaults.max_attempts),
                attempts_timeout: secs(file.attempts.timeout, defaults.attempts_timeout),
                advertised_port: file.advertised_port.unwrap_or(defaults.advertised_port),
                channel_capacity: file.channel_capacity.unwrap_or(defaults.channel_capacity),
                max_message_size: file.max_message_size.unwrap_or(defaults.max_message_size),
                timeouts,
                rpc_probe: file.rpc_probe.unwrap_or(defaults.rpc_probe),
            };

            Ok(Self { config })
        }
    }

    impl ConfigProvider for TomlConfigProvider {
        fn scanner_config(&self) -> ScannerConfig {
            self.config.clone()
        }
    }

    /// Errors that can occur during config loading.
    #[derive(Debug, Clone, Error)]
    pub enum ConfigError {
        /// File I/O error.
        #[error("failed to read {path}: {error}")]
        Io {
            /// Path of the file that failed to load.
            path: String,
            /// Error message from the I/O operation.
            error: String,
        },
        /// TOML parsing error.
        #[error("failed to parse config: {0}")]
        Parse(String),
    }
}

#[cfg(feature = "network")]
pub use toml_config::{ConfigError, TomlConfigProvider};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_static_config_provider() {
        let provider = StaticConfigProvider::default().with_bootstrap(["10.0.0.1", "boot.example.net"]);
        let config = provider.scanner_config();
        assert_eq!(config.bootstrap, vec!["10.0.0.1", "boot.example.net"]);
        assert_eq!(config.threads_count, 4);
    }

    #[cfg(feature = "network")]
    #[test]
    fn test_toml_full_document() {
        let provider = TomlConfigProvider::parse(
            r#"
            bootstrap = ["boot.tzbeta.net", "116.202.172.21"]
            synced_time = 60
            threads_count = 8
            advertised_port = 19732
            rpc_probe = true

            [attempts]
            count = 3
            timeout = 30

            [timeouts]
            connect = 4
            "#,
        )
        .unwrap();
        let config = provider.scanner_config();

        assert_eq!(config.bootstrap, vec!["boot.tzbeta.net", "116.202.172.21"]);
        assert_eq!(config.synced_time, Duration::from_secs(60));
        assert_eq!(config.threads_count, 8);
        assert_eq!(config.advertised_port, 19732);
        assert!(config.rpc_probe);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.attempts_timeout, Duration::from_secs(30));
        assert_eq!(config.timeouts.connect, Duration::from_secs(4));
        assert_eq!(config.timeouts.handshake, Duration::from_secs(6));
    }

    #[cfg(feature = "network")]
    #[test]
    fn test_toml_empty_document_is_default() {
        let config = TomlConfigProvider::parse("").unwrap().scanner_config();
        assert_eq!(config, ScannerConfig::default());
    }

    #[cfg(feature = "network")]
    #[test]
    fn test_toml_errors() {
        assert!(matches!(
            TomlConfigProvider::parse("threads_count = \"four\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            TomlConfigProvider::parse("unknown_key = 1"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            TomlConfigProvider::load("/nonexistent/peerscan.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
