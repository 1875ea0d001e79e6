//! End-to-end activation flows against the simulated platform.

mod common;

use std::time::Duration;

use common::{config_with_timeout, Harness};
use push_notify::constants::{messages, DEFAULT_ACTIVATOR_CLSID};
use push_notify::error::ErrorCode;
use push_notify::platform::simulated::{ChannelScript, PlatformEvent, SimulatedPlatform};
use push_notify::{
    ActivationKind, ActivationState, ChannelProgress, DeliveryOutcome, RegistrationActivators,
};

#[tokio::test]
async fn test_normal_launch_subscribes_exactly_once() {
    let h = Harness::new(
        SimulatedPlatform::builder()
            .channel_script(
                ChannelScript::succeed("https://push.invalid/launch")
                    .with_progress(ChannelProgress::InProgress),
            )
            .build(),
    );

    let report = h.dispatcher.run().await;

    assert_eq!(report.kind, ActivationKind::NormalLaunch);
    assert_eq!(report.channel_uri.as_deref(), Some("https://push.invalid/launch"));
    assert_eq!(report.subscriptions, 1);
    assert_eq!(h.channel_requests(), 1);
    assert_eq!(report.final_state, ActivationState::End);

    let lines = h.console_lines();
    assert!(lines.contains(&messages::CHANNEL_REQUEST_IN_PROGRESS.to_string()));
    let uri_line = format!("{}https://push.invalid/launch", messages::CHANNEL_URI_PREFIX);
    assert!(lines.contains(&uri_line));
    assert!(lines
        .iter()
        .any(|l| l.starts_with(&format!("{}on ", messages::CHANNEL_EXPIRES_PREFIX))));
    assert_eq!(lines.last().map(String::as_str), Some(messages::PRESS_ENTER_ANY_TIME));
}

#[tokio::test]
async fn test_activation_record_is_read_once() {
    for kind in [
        ActivationKind::NormalLaunch,
        ActivationKind::PushTriggered,
        ActivationKind::Other("protocol".to_string()),
    ] {
        let h = Harness::new(SimulatedPlatform::builder().activation(kind).build());
        h.dispatcher.run().await;
        assert_eq!(
            h.journal
                .count(|e| matches!(e, PlatformEvent::ActivationRead(_))),
            1
        );
    }
}

#[tokio::test]
async fn test_foreground_delivery_is_handled_while_waiting_for_exit() {
    let h = Harness::interactive(SimulatedPlatform::builder().build());

    let driver = async {
        h.console.waiting_for_exit().await;
        let outcome = h.platform.deliver_foreground("hello foreground").await;
        h.console.request_exit();
        outcome
    };
    let (report, outcome) = tokio::join!(h.dispatcher.run(), driver);

    assert_eq!(outcome, DeliveryOutcome::Handled);
    assert_eq!(report.foreground_notifications, 1);
    assert!(h.console_lines().contains(&format!(
        "{}hello foreground",
        messages::FOREGROUND_PREFIX
    )));
    assert_eq!(
        h.journal
            .count(|e| matches!(e, PlatformEvent::BackgroundRedelivery(_))),
        0
    );
}

#[tokio::test]
async fn test_channel_released_on_exit_stops_delivery() {
    let h = Harness::new(SimulatedPlatform::builder().build());
    let report = h.dispatcher.run().await;
    assert!(report.channel_acquired());

    let outcome = h.platform.deliver_foreground("after exit").await;

    assert_eq!(outcome, DeliveryOutcome::NoSubscriber);
    assert!(h
        .journal
        .contains(&PlatformEvent::BackgroundRedelivery("after exit".into())));
    assert!(!h.platform.has_subscribed_channel());
}

#[tokio::test(start_paused = true)]
async fn test_channel_timeout_runs_without_channel() {
    let h = Harness::with_config(
        SimulatedPlatform::builder()
            .channel_script(ChannelScript::hang())
            .build(),
        &config_with_timeout(300),
        false,
    );

    let started = tokio::time::Instant::now();
    let report = h.dispatcher.run().await;
    assert!(started.elapsed() >= Duration::from_secs(300));

    assert!(report.channel_uri.is_none());
    assert_eq!(report.subscriptions, 0);
    assert_eq!(h.dispatcher.negotiator().stats().timeouts, 1);
    assert!(report
        .history
        .iter()
        .any(|t| t.to == ActivationState::NoChannel));
    assert!(h.console_lines().contains(&messages::CHANNEL_ERROR.to_string()));

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(h.journal.contains(&PlatformEvent::RequestCancelled));
    assert_eq!(
        h.journal
            .count(|e| matches!(e, PlatformEvent::ChannelCompleted { .. })),
        0
    );
}

#[tokio::test]
async fn test_channel_failure_prints_error_and_waits() {
    let h = Harness::new(
        SimulatedPlatform::builder()
            .channel_script(ChannelScript::fail(ErrorCode::E_FAIL))
            .build(),
    );

    let report = h.dispatcher.run().await;

    assert!(!report.channel_acquired());
    let error_line = h.console_line_position(messages::CHANNEL_ERROR);
    let prompt_line = h.console_line_position(messages::PRESS_ENTER_ANY_TIME);
    assert!(error_line.is_some());
    assert!(error_line < prompt_line);
    assert_eq!(report.final_state, ActivationState::End);
}

#[tokio::test]
async fn test_background_deferral_wraps_processing() {
    let h = Harness::new(
        SimulatedPlatform::builder()
            .activation(ActivationKind::PushTriggered)
            .payload("wake and process")
            .build(),
    );

    let report = h.dispatcher.run().await;

    assert_eq!(report.background_payload.as_deref(), Some("wake and process"));
    assert_eq!(h.channel_requests(), 0);

    let acquired = h
        .journal
        .position(|e| *e == PlatformEvent::DeferralAcquired)
        .expect("deferral acquired");
    let processed = h
        .console_line_position(messages::BACKGROUND_PREFIX)
        .expect("payload displayed");
    let released = h
        .journal
        .position(|e| *e == PlatformEvent::DeferralReleased)
        .expect("deferral released");
    assert!(acquired < processed && processed < released);
    assert_eq!(h.journal.count(|e| *e == PlatformEvent::DeferralReleased), 1);

    // A background wake exits without waiting for the user.
    assert!(!h.console_lines().iter().any(|l| l.starts_with("Press 'Enter'")));
}

#[tokio::test]
async fn test_unexpected_activation_never_negotiates() {
    let h = Harness::new(
        SimulatedPlatform::builder()
            .activation(ActivationKind::Other("file".to_string()))
            .build(),
    );

    let report = h.dispatcher.run().await;

    assert_eq!(h.channel_requests(), 0);
    assert_eq!(
        h.console_lines(),
        vec![
            messages::UNEXPECTED_ACTIVATION.to_string(),
            messages::PRESS_ENTER.to_string(),
        ]
    );
    assert_eq!(report.final_state, ActivationState::End);
    assert!(report.com_activator_unregistered);
}

#[tokio::test]
async fn test_registers_both_and_unregisters_com_only() {
    let h = Harness::new(SimulatedPlatform::builder().build());

    let report = h.dispatcher.run().await;

    assert!(report.activator_registered);
    assert!(h.journal.contains(&PlatformEvent::ActivatorRegistered {
        activators: RegistrationActivators::PUSH_TRIGGER | RegistrationActivators::COM_ACTIVATOR,
        activator_clsid: DEFAULT_ACTIVATOR_CLSID,
    }));
    assert!(h.journal.contains(&PlatformEvent::ActivatorUnregistered(
        RegistrationActivators::COM_ACTIVATOR
    )));
    assert_eq!(
        h.journal
            .count(|e| matches!(e, PlatformEvent::ActivatorUnregistered(_))),
        1
    );
    assert_eq!(
        h.platform.registered_activators(),
        RegistrationActivators::PUSH_TRIGGER
    );

    let registered = h
        .journal
        .position(|e| matches!(e, PlatformEvent::ActivatorRegistered { .. }));
    let read = h
        .journal
        .position(|e| matches!(e, PlatformEvent::ActivationRead(_)));
    assert!(registered < read);
}

#[tokio::test]
async fn test_unsupported_activators_are_skipped() {
    let h = Harness::new(
        SimulatedPlatform::builder()
            .activators_supported(RegistrationActivators::empty())
            .build(),
    );

    let report = h.dispatcher.run().await;

    assert!(!report.activator_registered);
    assert!(!report.com_activator_unregistered);
    assert_eq!(
        h.journal.count(|e| matches!(
            e,
            PlatformEvent::ActivatorRegistered { .. } | PlatformEvent::ActivatorUnregistered(_)
        )),
        0
    );
    // Negotiation still runs on a normal launch.
    assert_eq!(h.channel_requests(), 1);
    assert_eq!(report.final_state, ActivationState::End);
}
