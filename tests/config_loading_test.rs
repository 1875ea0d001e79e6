//! The configuration files shipped under `config/`.

use std::path::PathBuf;

use push_notify::config::{ConfigManager, LogFormat, SimulatedCompletion};
use push_notify::constants::DEFAULT_ACTIVATOR_CLSID;
use push_notify::platform::SimulatedPlatform;
use push_notify::{ActivationKind, AppInstance, PushNotificationManager, RegistrationActivators};

fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_shipped_base_config_is_valid() {
    let manager =
        ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "development")
            .expect("shipped config loads");
    let config = manager.config();

    assert_eq!(config.channel_request_timeout_seconds, 300);
    assert_eq!(config.activator_clsid, DEFAULT_ACTIVATOR_CLSID);
    assert!(config.uses_placeholder_remote_id());
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.simulation.completion, SimulatedCompletion::Success);
    assert_eq!(config.simulation.retries, 1);
    assert!(!config.simulation.foreground_payloads.is_empty());
}

#[test]
fn test_test_overlay_disables_delays() {
    let manager = ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "test")
        .expect("test overlay loads");
    let config = manager.config();

    assert_eq!(config.channel_request_timeout_seconds, 5);
    assert_eq!(config.logging.level.as_deref(), Some("warn"));
    assert_eq!(config.simulation.step_delay_ms, 0);
    assert_eq!(config.simulation.retries, 0);
    assert!(config.simulation.foreground_payloads.is_empty());
    // Keys absent from the overlay come from the base file.
    assert_eq!(config.simulation.activation, "launch");
}

#[test]
fn test_platform_built_from_simulation_config() {
    let manager = ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "test")
        .expect("test overlay loads");
    let mut simulation = manager.config().simulation.clone();
    simulation.activation = "push".to_string();
    simulation.activators_supported = false;

    let platform = SimulatedPlatform::from_config(&simulation);
    let record = platform.activated_event_args();

    assert_eq!(record.kind(), &ActivationKind::PushTriggered);
    let args = record.into_push_args().expect("push args");
    assert_eq!(args.payload().to_text(), "Hello from the background");
    assert!(!platform.is_activator_supported(RegistrationActivators::COM_ACTIVATOR));
}
