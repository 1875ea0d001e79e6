//! # Push Sample Configuration
//!
//! Process-wide configuration loaded once at startup. The remote identifier and the
//! activator class id are passed from here into the channel negotiator and the
//! activation dispatcher; nothing reads them as ambient globals.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use push_notify::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let timeout = manager.config().channel_request_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::constants::{
    DEFAULT_ACTIVATOR_CLSID, DEFAULT_CHANNEL_REQUEST_TIMEOUT_SECONDS, DEFAULT_REMOTE_ID,
    MAX_CHANNEL_LIFETIME_HOURS,
};
use crate::error::ErrorCode;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Remote identifier as it may appear in logs: first and last two characters only
pub fn masked_remote_id(remote_id: &Uuid) -> String {
    let remote_id = remote_id.to_string();
    format!(
        "[MASKED: {}***{}]",
        &remote_id[..2],
        &remote_id[remote_id.len() - 2..]
    )
}

/// Root configuration structure mirroring config/push-sample.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PushConfig {
    /// Identifier of the app's registered identity with the push backend
    pub remote_id: Uuid,

    /// Class id registered for in-process (COM style) activation
    pub activator_clsid: Uuid,

    /// Upper bound on a single channel request
    pub channel_request_timeout_seconds: u64,

    pub logging: LoggingConfig,

    pub simulation: SimulationConfig,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            remote_id: DEFAULT_REMOTE_ID,
            activator_clsid: DEFAULT_ACTIVATOR_CLSID,
            channel_request_timeout_seconds: DEFAULT_CHANNEL_REQUEST_TIMEOUT_SECONDS,
            logging: LoggingConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl PushConfig {
    pub fn channel_request_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_request_timeout_seconds)
    }

    /// Whether the remote identifier is still the placeholder shipped with the sample
    pub fn uses_placeholder_remote_id(&self) -> bool {
        self.remote_id.is_nil()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.channel_request_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "channel_request_timeout_seconds",
                "0",
                "channel request timeout must be greater than zero",
            ));
        }

        if self.activator_clsid.is_nil() {
            return Err(ConfigurationError::invalid_value(
                "activator_clsid",
                self.activator_clsid.to_string(),
                "activator class id must match the one declared in the app manifest",
            ));
        }

        self.logging.validate()?;
        self.simulation.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; overrides the environment default but not RUST_LOG
    pub level: Option<String>,
    pub format: LogFormat,
}

impl LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(level) = &self.level {
            if level.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "logging.level",
                    level.clone(),
                    "log level must not be blank",
                ));
            }
        }
        Ok(())
    }
}

/// How the simulated channel request finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatedCompletion {
    #[default]
    Success,
    Failure,
    Other,
    /// Never completes; exercises the request timeout
    Hang,
}

/// Drives the in-process platform used by the `push-sample` binary
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// `launch`, `push`, or any other activation kind name
    pub activation: String,
    /// Payload carried by a push activation
    pub payload: String,
    pub activators_supported: bool,
    pub channel_uri: String,
    pub channel_lifetime_hours: i64,
    /// Number of retry progress events reported before completion
    pub retries: u32,
    pub retry_error_code: i32,
    pub completion: SimulatedCompletion,
    pub completion_error_code: i32,
    /// Delay between scripted channel steps
    pub step_delay_ms: u64,
    /// Payloads pushed to the foreground subscription once it is established
    pub foreground_payloads: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            activation: "launch".to_string(),
            payload: "Hello from the background".to_string(),
            activators_supported: true,
            channel_uri: "https://notify.example.invalid/?token=sample".to_string(),
            channel_lifetime_hours: 24 * 30,
            retries: 0,
            retry_error_code: ErrorCode::E_FAIL.0,
            completion: SimulatedCompletion::Success,
            completion_error_code: ErrorCode::E_FAIL.0,
            step_delay_ms: 250,
            foreground_payloads: Vec::new(),
        }
    }
}

impl SimulationConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.activation.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "simulation.activation",
                self.activation.clone(),
                "activation kind must not be blank",
            ));
        }
        if self.channel_lifetime_hours <= 0 {
            return Err(ConfigurationError::invalid_value(
                "simulation.channel_lifetime_hours",
                self.channel_lifetime_hours.to_string(),
                "channel lifetime must be positive",
            ));
        }
        if self.channel_lifetime_hours > MAX_CHANNEL_LIFETIME_HOURS {
            return Err(ConfigurationError::invalid_value(
                "simulation.channel_lifetime_hours",
                self.channel_lifetime_hours.to_string(),
                format!("channel lifetime must not exceed {MAX_CHANNEL_LIFETIME_HOURS} hours"),
            ));
        }
        for (field, code) in [
            ("simulation.retry_error_code", self.retry_error_code),
            ("simulation.completion_error_code", self.completion_error_code),
        ] {
            if !ErrorCode(code).is_failure() {
                return Err(ConfigurationError::invalid_value(
                    field,
                    ErrorCode(code).to_string(),
                    "error code must have the failure bit set",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PushConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.channel_request_timeout(), Duration::from_secs(300));
        assert!(config.uses_placeholder_remote_id());
        assert_eq!(
            config.activator_clsid.to_string(),
            "ccd2ae3f-764f-4ae3-be45-9804761b28b2"
        );
    }

    #[test]
    fn test_validation() {
        let config = PushConfig {
            channel_request_timeout_seconds: 0,
            ..PushConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PushConfig {
            activator_clsid: Uuid::nil(),
            ..PushConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = PushConfig::default();
        config.logging.level = Some("  ".to_string());
        assert!(config.validate().is_err());

        let mut config = PushConfig::default();
        config.simulation.channel_lifetime_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channel_lifetime_upper_bound() {
        let mut config = PushConfig::default();
        config.simulation.channel_lifetime_hours = MAX_CHANNEL_LIFETIME_HOURS;
        assert!(config.validate().is_ok());

        config.simulation.channel_lifetime_hours = MAX_CHANNEL_LIFETIME_HOURS + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("simulation.channel_lifetime_hours"));

        config.simulation.channel_lifetime_hours = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_simulated_error_codes_must_be_failures() {
        let mut config = PushConfig::default();
        config.simulation.retry_error_code = ErrorCode::S_OK.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("simulation.retry_error_code"));

        let mut config = PushConfig::default();
        config.simulation.completion_error_code = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("simulation.completion_error_code"));
    }

    #[test]
    fn test_masked_remote_id_hides_the_middle() {
        let remote_id = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);
        let masked = masked_remote_id(&remote_id);

        assert_eq!(masked, "[MASKED: 12***f0]");
        assert!(!masked.contains(&remote_id.to_string()));
    }
}
