//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered with the `config`
//! crate: the base TOML file, an optional per-environment override, then
//! `PUSH_SAMPLE__*` environment variables.

use super::error::{ConfigResult, ConfigurationError};
use super::{masked_remote_id, PushConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CONFIG_FILE_STEM: &str = "push-sample";
const ENV_PREFIX: &str = "PUSH_SAMPLE";
const ENV_SEPARATOR: &str = "__";

pub struct ConfigManager {
    config: PushConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for tests that must not touch global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::build_config(&config_directory, environment)?;
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        if config.uses_placeholder_remote_id() {
            warn!(
                "remote_id is the placeholder nil identifier; \
                 replace it with the identifier issued for this app"
            );
        }

        info!(
            environment = %environment,
            timeout_seconds = config.channel_request_timeout_seconds,
            "Configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Defaults only, used when loading fails so the sample can still run
    pub fn fallback() -> Arc<ConfigManager> {
        warn!("Using default configuration");
        Arc::new(ConfigManager {
            config: PushConfig::default(),
            environment: Self::detect_environment(),
            config_directory: Self::default_config_directory(),
        })
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    pub fn detect_environment() -> String {
        env::var("PUSH_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        PathBuf::from("config")
    }

    fn build_config(config_directory: &Path, environment: &str) -> ConfigResult<PushConfig> {
        let base = config_directory.join(format!("{CONFIG_FILE_STEM}.toml"));
        let overlay = config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}.toml"));

        let settings = config::Config::builder()
            .add_source(config::File::from(base).required(false))
            .add_source(config::File::from(overlay).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(environment, e))?;

        Ok(settings.try_deserialize::<PushConfig>()?)
    }

    /// Mask the credential before the config is written to the log
    fn sanitize_config_for_logging(config: &PushConfig) -> serde_json::Value {
        let mut value = serde_json::json!(config);
        if let Some(map) = value.as_object_mut() {
            let masked = masked_remote_id(&config.remote_id);
            map.insert("remote_id".to_string(), serde_json::Value::String(masked));
        }
        value
    }
}
