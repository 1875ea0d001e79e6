//! In-process notification platform.
//!
//! Implements [`PushNotificationManager`] and [`AppInstance`] from a script: which
//! activation the process sees, which activators the "OS" supports, and how a channel
//! request progresses. Everything the client does against it lands in a [`Journal`], so
//! ordering and exactly-once properties can be checked after the fact.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AppInstance, PushNotificationManager};
use crate::activation::{ActivationInfo, ActivationKind, ActivationRecord, RegistrationActivators};
use crate::channel::{
    channel_operation, Channel, ChannelEndpoint, ChannelOperation, ChannelProgress, ChannelResult,
    DeliveryOutcome, OperationController,
};
use crate::config::{SimulatedCompletion, SimulationConfig};
use crate::console::Console;
use crate::error::{ErrorCode, PushError, Result};
use crate::notification::{DeferralTracker, NotificationPayload, PushReceivedEventArgs};

const PROGRESS_BUFFER: usize = 16;
const MIN_FEED_INTERVAL: Duration = Duration::from_millis(10);

/// Something the simulated platform observed
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    ActivationRead(ActivationKind),
    ActivatorRegistered {
        activators: RegistrationActivators,
        activator_clsid: Uuid,
    },
    ActivatorUnregistered(RegistrationActivators),
    ChannelRequested(Uuid),
    ChannelProgressSent(ChannelProgress),
    ChannelCompleted { status: &'static str },
    /// The service finished after the caller had cancelled
    CompletionDiscarded,
    RequestCancelled,
    DeferralAcquired,
    DeferralReleased,
    ForegroundDelivered {
        payload: NotificationPayload,
        outcome: DeliveryOutcome,
    },
    /// An unhandled foreground delivery that the OS would re-deliver in the background
    BackgroundRedelivery(NotificationPayload),
    ConsoleLine(String),
}

/// Shared, append-only event log
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<PlatformEvent>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: PlatformEvent) {
        self.0.lock().push(event);
    }

    pub fn snapshot(&self) -> Vec<PlatformEvent> {
        self.0.lock().clone()
    }

    pub fn contains(&self, event: &PlatformEvent) -> bool {
        self.0.lock().iter().any(|e| e == event)
    }

    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&PlatformEvent) -> bool,
    {
        self.0.lock().iter().filter(|e| predicate(*e)).count()
    }

    /// Index of the first matching event
    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(&PlatformEvent) -> bool,
    {
        self.0.lock().iter().position(predicate)
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter_map(|e| match e {
                PlatformEvent::ConsoleLine(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Deferral observer that writes to the journal
pub struct JournalDeferralTracker {
    journal: Journal,
}

impl DeferralTracker for JournalDeferralTracker {
    fn acquired(&self) {
        self.journal.record(PlatformEvent::DeferralAcquired);
    }

    fn released(&self) {
        self.journal.record(PlatformEvent::DeferralReleased);
    }
}

/// Console that writes into the journal instead of stdout.
///
/// Created with [`RecordingConsole::new`] the exit prompt returns at once;
/// [`RecordingConsole::interactive`] holds it until [`RecordingConsole::request_exit`].
pub struct RecordingConsole {
    journal: Journal,
    hold_until_exit: bool,
    exit: Notify,
    waiting: Notify,
}

impl RecordingConsole {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            hold_until_exit: false,
            exit: Notify::new(),
            waiting: Notify::new(),
        }
    }

    pub fn interactive(journal: Journal) -> Self {
        Self {
            hold_until_exit: true,
            ..Self::new(journal)
        }
    }

    /// The user pressed Enter
    pub fn request_exit(&self) {
        self.exit.notify_one();
    }

    /// Resolves once the sample is blocked on the exit prompt
    pub async fn waiting_for_exit(&self) {
        self.waiting.notified().await;
    }
}

#[async_trait::async_trait]
impl Console for RecordingConsole {
    fn write_line(&self, line: &str) {
        self.journal.record(PlatformEvent::ConsoleLine(line.to_string()));
    }

    async fn wait_for_exit(&self) {
        self.waiting.notify_one();
        if self.hold_until_exit {
            self.exit.notified().await;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelScriptStep {
    Progress(ChannelProgress),
    Delay(Duration),
}

/// How a scripted channel request ends
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCompletion {
    Succeed {
        uri: String,
        lifetime: chrono::Duration,
    },
    Fail(ErrorCode),
    OtherFailure(ErrorCode),
    /// Never completes
    Hang,
}

/// Scripted behaviour of every channel request made against the platform
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelScript {
    steps: Vec<ChannelScriptStep>,
    completion: ChannelCompletion,
}

impl ChannelScript {
    fn ending(completion: ChannelCompletion) -> Self {
        Self {
            steps: Vec::new(),
            completion,
        }
    }

    pub fn succeed(uri: impl Into<String>) -> Self {
        Self::ending(ChannelCompletion::Succeed {
            uri: uri.into(),
            lifetime: chrono::Duration::days(30),
        })
    }

    pub fn fail(error_code: ErrorCode) -> Self {
        Self::ending(ChannelCompletion::Fail(error_code))
    }

    pub fn other_failure(error_code: ErrorCode) -> Self {
        Self::ending(ChannelCompletion::OtherFailure(error_code))
    }

    pub fn hang() -> Self {
        Self::ending(ChannelCompletion::Hang)
    }

    pub fn with_progress(mut self, progress: ChannelProgress) -> Self {
        self.steps.push(ChannelScriptStep::Progress(progress));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.steps.push(ChannelScriptStep::Delay(delay));
        self
    }

    /// Only meaningful for a succeeding script
    pub fn with_lifetime(mut self, lifetime: chrono::Duration) -> Self {
        if let ChannelCompletion::Succeed { lifetime: l, .. } = &mut self.completion {
            *l = lifetime;
        }
        self
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let delay = Duration::from_millis(config.step_delay_ms);
        let mut script = match config.completion {
            SimulatedCompletion::Success => {
                match chrono::Duration::try_hours(config.channel_lifetime_hours) {
                    Some(lifetime) => {
                        Self::succeed(config.channel_uri.clone()).with_lifetime(lifetime)
                    }
                    None => {
                        warn!(
                            lifetime_hours = config.channel_lifetime_hours,
                            "Channel lifetime out of range; the request will fail"
                        );
                        Self::other_failure(ErrorCode::E_FAIL)
                    }
                }
            }
            SimulatedCompletion::Failure => Self::fail(ErrorCode(config.completion_error_code)),
            SimulatedCompletion::Other => {
                Self::other_failure(ErrorCode(config.completion_error_code))
            }
            SimulatedCompletion::Hang => Self::hang(),
        };

        script = script.with_delay(delay).with_progress(ChannelProgress::InProgress);
        for retry_count in 1..=config.retries {
            script = script
                .with_delay(delay)
                .with_progress(ChannelProgress::InProgressRetry {
                    retry_count,
                    extended_error: ErrorCode(config.retry_error_code),
                });
        }
        script.with_delay(delay)
    }

    async fn run(
        self,
        controller: OperationController,
        journal: Journal,
        channels: Arc<Mutex<Vec<ChannelEndpoint>>>,
    ) {
        for step in self.steps {
            match step {
                ChannelScriptStep::Progress(progress) => {
                    if !controller.report_progress(progress).await {
                        journal.record(PlatformEvent::RequestCancelled);
                        return;
                    }
                    journal.record(PlatformEvent::ChannelProgressSent(progress));
                }
                ChannelScriptStep::Delay(delay) => {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = controller.cancelled() => {
                            journal.record(PlatformEvent::RequestCancelled);
                            return;
                        }
                    }
                }
            }
        }

        let result = match self.completion {
            ChannelCompletion::Succeed { uri, lifetime } => {
                match Utc::now().checked_add_signed(lifetime) {
                    Some(expiration) => {
                        let channel = Channel::new(uri, expiration);
                        channels.lock().push(channel.endpoint());
                        ChannelResult::CompletedSuccess(channel)
                    }
                    None => {
                        warn!(?lifetime, "Channel expiration out of range");
                        ChannelResult::OtherFailure(ErrorCode::E_FAIL)
                    }
                }
            }
            ChannelCompletion::Fail(error_code) => ChannelResult::CompletedFailure(error_code),
            ChannelCompletion::OtherFailure(error_code) => ChannelResult::OtherFailure(error_code),
            ChannelCompletion::Hang => {
                controller.cancelled().await;
                journal.record(PlatformEvent::RequestCancelled);
                return;
            }
        };

        let status = result.status_name();
        match controller.complete(result) {
            Ok(()) => journal.record(PlatformEvent::ChannelCompleted { status }),
            Err(_) => journal.record(PlatformEvent::CompletionDiscarded),
        }
    }
}

impl Default for ChannelScript {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

pub struct SimulatedPlatformBuilder {
    activation: ActivationKind,
    payload: NotificationPayload,
    supported: RegistrationActivators,
    registration_error: Option<ErrorCode>,
    script: ChannelScript,
}

impl SimulatedPlatformBuilder {
    pub fn activation(mut self, activation: ActivationKind) -> Self {
        self.activation = activation;
        self
    }

    pub fn payload(mut self, payload: impl Into<NotificationPayload>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn activators_supported(mut self, supported: RegistrationActivators) -> Self {
        self.supported = supported;
        self
    }

    /// Make `register_activator` fail with this code
    pub fn registration_error(mut self, error_code: ErrorCode) -> Self {
        self.registration_error = Some(error_code);
        self
    }

    pub fn channel_script(mut self, script: ChannelScript) -> Self {
        self.script = script;
        self
    }

    pub fn build(self) -> SimulatedPlatform {
        SimulatedPlatform {
            activation: self.activation,
            payload: self.payload,
            supported: self.supported,
            registration_error: self.registration_error,
            script: self.script,
            journal: Journal::new(),
            channels: Arc::new(Mutex::new(Vec::new())),
            registered: Mutex::new(RegistrationActivators::empty()),
        }
    }
}

pub struct SimulatedPlatform {
    activation: ActivationKind,
    payload: NotificationPayload,
    supported: RegistrationActivators,
    registration_error: Option<ErrorCode>,
    script: ChannelScript,
    journal: Journal,
    channels: Arc<Mutex<Vec<ChannelEndpoint>>>,
    registered: Mutex<RegistrationActivators>,
}

impl SimulatedPlatform {
    pub fn builder() -> SimulatedPlatformBuilder {
        SimulatedPlatformBuilder {
            activation: ActivationKind::NormalLaunch,
            payload: NotificationPayload::default(),
            supported: RegistrationActivators::all(),
            registration_error: None,
            script: ChannelScript::succeed("https://notify.example.invalid/?token=test"),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let supported = if config.activators_supported {
            RegistrationActivators::all()
        } else {
            RegistrationActivators::empty()
        };

        Self::builder()
            .activation(ActivationKind::from_name(&config.activation))
            .payload(config.payload.as_str())
            .activators_supported(supported)
            .channel_script(ChannelScript::from_config(config))
            .build()
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Activators currently registered with the simulated OS
    pub fn registered_activators(&self) -> RegistrationActivators {
        *self.registered.lock()
    }

    pub fn has_subscribed_channel(&self) -> bool {
        self.live_endpoint()
            .map(|endpoint| endpoint.has_subscribers())
            .unwrap_or(false)
    }

    fn live_endpoint(&self) -> Option<ChannelEndpoint> {
        let mut channels = self.channels.lock();
        channels.retain(ChannelEndpoint::is_alive);
        channels.last().cloned()
    }

    /// Deliver a notification to the running instance. Handlers run on a blocking
    /// dispatch thread, concurrently with whatever the main task is doing.
    pub async fn deliver_foreground(
        &self,
        payload: impl Into<NotificationPayload>,
    ) -> DeliveryOutcome {
        let payload = payload.into();

        let outcome = match self.live_endpoint() {
            None => DeliveryOutcome::NoSubscriber,
            Some(endpoint) => {
                let args = PushReceivedEventArgs::foreground(payload.clone());
                match tokio::task::spawn_blocking(move || endpoint.dispatch(&args)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Foreground dispatch failed: {e}");
                        DeliveryOutcome::NotHandled
                    }
                }
            }
        };

        debug!(?outcome, payload_len = payload.len(), "Foreground delivery finished");
        self.journal.record(PlatformEvent::ForegroundDelivered {
            payload: payload.clone(),
            outcome,
        });
        if outcome != DeliveryOutcome::Handled {
            self.journal.record(PlatformEvent::BackgroundRedelivery(payload));
        }
        outcome
    }

    /// Push each payload to the foreground subscription once one exists
    pub fn spawn_foreground_feed(
        self: &Arc<Self>,
        payloads: Vec<String>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let platform = Arc::clone(self);
        let interval = interval.max(MIN_FEED_INTERVAL);

        tokio::spawn(async move {
            for payload in payloads {
                while !platform.has_subscribed_channel() {
                    tokio::time::sleep(interval).await;
                }
                tokio::time::sleep(interval).await;
                platform.deliver_foreground(payload).await;
            }
        })
    }
}

impl PushNotificationManager for SimulatedPlatform {
    fn is_activator_supported(&self, activators: RegistrationActivators) -> bool {
        self.supported.contains(activators)
    }

    fn register_activator(&self, info: &ActivationInfo) -> Result<()> {
        if let Some(error_code) = self.registration_error {
            return Err(PushError::platform("register_activator", error_code));
        }
        if !self.supported.contains(info.activators) {
            return Err(PushError::ServiceUnsupported(info.activators.to_string()));
        }

        self.registered.lock().insert(info.activators);
        self.journal.record(PlatformEvent::ActivatorRegistered {
            activators: info.activators,
            activator_clsid: info.activator_clsid,
        });
        info!(activators = %info.activators, clsid = %info.activator_clsid, "Activator registered");
        Ok(())
    }

    fn unregister_activator(&self, activators: RegistrationActivators) -> Result<()> {
        self.registered.lock().remove(activators);
        self.journal
            .record(PlatformEvent::ActivatorUnregistered(activators));
        info!(activators = %activators, "Activator unregistered");
        Ok(())
    }

    fn create_channel(&self, remote_id: Uuid) -> ChannelOperation {
        self.journal.record(PlatformEvent::ChannelRequested(remote_id));

        let (operation, controller) = channel_operation(PROGRESS_BUFFER);
        tokio::spawn(self.script.clone().run(
            controller,
            self.journal.clone(),
            Arc::clone(&self.channels),
        ));
        operation
    }
}

impl AppInstance for SimulatedPlatform {
    fn activated_event_args(&self) -> ActivationRecord {
        self.journal
            .record(PlatformEvent::ActivationRead(self.activation.clone()));

        match &self.activation {
            ActivationKind::NormalLaunch => ActivationRecord::launch(),
            ActivationKind::PushTriggered => {
                let tracker = Arc::new(JournalDeferralTracker {
                    journal: self.journal.clone(),
                });
                ActivationRecord::push(PushReceivedEventArgs::background(
                    self.payload.clone(),
                    tracker,
                ))
            }
            ActivationKind::Other(name) => ActivationRecord::other(name.clone()),
        }
    }
}
