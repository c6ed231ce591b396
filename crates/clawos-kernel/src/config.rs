//! Configuration for the ClawOS kernel.
//!
//! Grounded on `palm-daemon::config::DaemonConfig::load`: a
//! `config::Config` builder layering defaults, an optional file, then
//! `KERNEL_`-prefixed environment variables.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            session: SessionSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    18888
}

/// `db_path = None` selects the in-memory backend; `Some(path)` opens a
/// WAL-mode SQLite file at that path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: i64,
    #[serde(default)]
    pub enable_drift_classifier: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            enable_drift_classifier: false,
        }
    }
}

fn default_timeout_minutes() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl KernelConfig {
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::Config::try_from(&KernelConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("KERNEL")
                .separator("_")
                .try_parsing(true),
        );

        let mut config: KernelConfig = builder.build()?.try_deserialize()?;
        config.apply_flat_env_overrides();
        Ok(config)
    }

    /// The wire-level environment contract uses flat, unprefixed names
    /// (`KERNEL_PORT`, `DB_PATH`, ...) rather than the nested `KERNEL_`
    /// names the structured source above expects; apply them last so
    /// they win over file/prefixed-env values.
    fn apply_flat_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("KERNEL_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(db_path) = std::env::var("DB_PATH") {
            self.storage.db_path = Some(db_path);
        }
        if let Ok(minutes) = std::env::var("SESSION_TIMEOUT_MINUTES") {
            if let Ok(minutes) = minutes.parse() {
                self.session.timeout_minutes = minutes;
            }
        }
        if let Ok(flag) = std::env::var("ENABLE_SESSION_DRIFT_CLASSIFIER") {
            if let Ok(flag) = flag.parse() {
                self.session.enable_drift_classifier = flag;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_in_memory_storage_and_default_port() {
        let config = KernelConfig::default();
        assert_eq!(config.server.port, 18888);
        assert!(config.storage.db_path.is_none());
        assert_eq!(config.session.timeout_minutes, 30);
    }
}
