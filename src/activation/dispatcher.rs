//! Activation dispatch.
//!
//! Reads the activation record once, registers the activators before branching and
//! unregisters the in-process activator afterwards. `PushTrigger` stays registered so the
//! OS can keep waking the app for background notifications.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{ActivationInfo, ActivationKind, ActivationRecord, RegistrationActivators};
use crate::channel::ChannelNegotiator;
use crate::config::PushConfig;
use crate::console::Console;
use crate::constants::messages;
use crate::error::PushError;
use crate::notification::{
    subscribe_foreground_handler, BackgroundNotificationHandler, ForegroundNotificationHandler,
};
use crate::platform::{AppInstance, PushNotificationManager};
use crate::state_machine::{
    ActivationEvent, ActivationState, ActivationStateMachine, StateTransition,
};

/// Summary of one process run
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub kind: ActivationKind,
    pub activator_registered: bool,
    /// URI of the channel acquired on a normal launch
    pub channel_uri: Option<String>,
    /// Handlers subscribed on the channel when it was acquired
    pub subscriptions: usize,
    pub foreground_notifications: u64,
    /// Text of the payload processed on a push activation
    pub background_payload: Option<String>,
    pub com_activator_unregistered: bool,
    pub history: Vec<StateTransition>,
    pub final_state: ActivationState,
}

impl DispatchReport {
    fn new(kind: ActivationKind, activator_registered: bool) -> Self {
        Self {
            kind,
            activator_registered,
            channel_uri: None,
            subscriptions: 0,
            foreground_notifications: 0,
            background_payload: None,
            com_activator_unregistered: false,
            history: Vec::new(),
            final_state: ActivationState::Start,
        }
    }

    pub fn channel_acquired(&self) -> bool {
        self.channel_uri.is_some()
    }
}

pub struct ActivationDispatcher {
    manager: Arc<dyn PushNotificationManager>,
    app: Arc<dyn AppInstance>,
    console: Arc<dyn Console>,
    negotiator: ChannelNegotiator,
    remote_id: Uuid,
    activator_clsid: Uuid,
    channel_timeout: Duration,
}

impl ActivationDispatcher {
    pub fn new(
        config: &PushConfig,
        manager: Arc<dyn PushNotificationManager>,
        app: Arc<dyn AppInstance>,
        console: Arc<dyn Console>,
    ) -> Self {
        let negotiator = ChannelNegotiator::new(Arc::clone(&manager), Arc::clone(&console));
        Self {
            manager,
            app,
            console,
            negotiator,
            remote_id: config.remote_id,
            activator_clsid: config.activator_clsid,
            channel_timeout: config.channel_request_timeout(),
        }
    }

    pub fn negotiator(&self) -> &ChannelNegotiator {
        &self.negotiator
    }

    /// Run the sample's activation flow to completion
    #[instrument(skip(self))]
    pub async fn run(&self) -> DispatchReport {
        let mut machine = ActivationStateMachine::new();
        let activator_registered = self.register_activators();

        let record = self.app.activated_event_args();
        let kind = record.kind().clone();
        info!(activation_kind = %kind, "Process activated");

        let mut report = DispatchReport::new(kind.clone(), activator_registered);
        match kind {
            ActivationKind::NormalLaunch => {
                advance(&mut machine, ActivationEvent::NormalLaunch);
                self.run_foreground(&mut machine, &mut report).await;
            }
            ActivationKind::PushTriggered => {
                advance(&mut machine, ActivationEvent::PushTriggered);
                self.run_background(record, &mut machine, &mut report);
            }
            ActivationKind::Other(ref name) => {
                warn!("{}", PushError::UnexpectedActivationKind(name.clone()));
                advance(&mut machine, ActivationEvent::UnexpectedActivation);
                self.run_unexpected(&mut machine).await;
            }
        }

        report.com_activator_unregistered = self.unregister_com_activator();
        advance(&mut machine, ActivationEvent::ActivatorUnregistered);

        report.final_state = machine.current_state();
        report.history = machine.into_history();
        info!(state = %report.final_state, "Activation flow finished");
        report
    }

    fn register_activators(&self) -> bool {
        let activators =
            RegistrationActivators::PUSH_TRIGGER | RegistrationActivators::COM_ACTIVATOR;
        if !self.manager.is_activator_supported(activators) {
            debug!(activators = %activators, "Activators not supported; skipping registration");
            return false;
        }

        let info = ActivationInfo::new(activators, self.activator_clsid);
        match self.manager.register_activator(&info) {
            Ok(()) => true,
            Err(e) => {
                error!(error_code = ?e.error_code(), "Failed to register activator: {e}");
                false
            }
        }
    }

    fn unregister_com_activator(&self) -> bool {
        let activators = RegistrationActivators::COM_ACTIVATOR;
        if !self.manager.is_activator_supported(activators) {
            return false;
        }

        match self.manager.unregister_activator(activators) {
            Ok(()) => true,
            Err(e) => {
                error!(error_code = ?e.error_code(), "Failed to unregister activator: {e}");
                false
            }
        }
    }

    async fn run_foreground(
        &self,
        machine: &mut ActivationStateMachine,
        report: &mut DispatchReport,
    ) {
        let handler = Arc::new(ForegroundNotificationHandler::new(Arc::clone(&self.console)));

        // The channel must outlive the wait below or foreground delivery stops.
        let channel = self
            .negotiator
            .request_channel(self.remote_id, self.channel_timeout)
            .await;

        match &channel {
            Some(channel) => {
                subscribe_foreground_handler(channel, Arc::clone(&handler));
                report.channel_uri = Some(channel.uri().to_string());
                report.subscriptions = channel.subscriber_count();
                advance(machine, ActivationEvent::ChannelAcquired);
            }
            None => {
                self.console.write_line(messages::CHANNEL_ERROR);
                advance(machine, ActivationEvent::ChannelUnavailable);
            }
        }

        self.console.write_line(messages::PRESS_ENTER_ANY_TIME);
        self.wait_for_exit(machine).await;

        report.foreground_notifications = handler.received();
        drop(channel);
    }

    fn run_background(
        &self,
        record: ActivationRecord,
        machine: &mut ActivationStateMachine,
        report: &mut DispatchReport,
    ) {
        let Some(args) = record.into_push_args() else {
            error!("Push activation carried no notification arguments");
            advance(machine, ActivationEvent::PayloadMissing);
            return;
        };

        let handler = BackgroundNotificationHandler::new(Arc::clone(&self.console));
        let text = handler.handle(&args, |event| advance(machine, event));
        report.background_payload = Some(text);

        let state = machine.current_state();
        if state.holds_deferral() {
            error!(state = %state, "Background handling returned with the deferral still held");
        }
    }

    async fn run_unexpected(&self, machine: &mut ActivationStateMachine) {
        self.console.write_line(messages::UNEXPECTED_ACTIVATION);
        self.console.write_line(messages::PRESS_ENTER);
        self.wait_for_exit(machine).await;
    }

    async fn wait_for_exit(&self, machine: &mut ActivationStateMachine) {
        let state = machine.current_state();
        if !state.awaits_exit() {
            warn!(state = %state, "Waiting for exit outside an interactive state");
        }
        self.console.wait_for_exit().await;
        advance(machine, ActivationEvent::ExitRequested);
    }
}

fn advance(machine: &mut ActivationStateMachine, event: ActivationEvent) {
    if let Err(e) = machine.transition(event) {
        error!(state = %machine.current_state(), "{e}");
    }
}
