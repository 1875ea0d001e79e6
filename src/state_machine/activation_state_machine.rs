use serde::Serialize;
use tracing::debug;

use super::{events::ActivationEvent, states::ActivationState};
use crate::error::{PushError, Result};

/// One applied transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateTransition {
    pub from: ActivationState,
    pub to: ActivationState,
    pub event: ActivationEvent,
}

/// Activation lifecycle of one process run, with its transition history
#[derive(Debug, Clone, Default)]
pub struct ActivationStateMachine {
    current: ActivationState,
    history: Vec<StateTransition>,
}

impl ActivationStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_state(&self) -> ActivationState {
        self.current
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn into_history(self) -> Vec<StateTransition> {
        self.history
    }

    /// Apply `event`; invalid transitions leave the state unchanged
    pub fn transition(&mut self, event: ActivationEvent) -> Result<ActivationState> {
        let from = self.current;
        let to = Self::determine_target_state(from, event)?;

        debug!(from = %from, to = %to, event = event.event_type(), "Activation state transition");
        self.history.push(StateTransition { from, to, event });
        self.current = to;
        Ok(to)
    }

    fn determine_target_state(
        current_state: ActivationState,
        event: ActivationEvent,
    ) -> Result<ActivationState> {
        use ActivationEvent as E;
        use ActivationState as S;

        let target = match (current_state, event) {
            // Activation dispatch
            (S::Start, E::NormalLaunch) => S::NegotiatingChannel,
            (S::Start, E::PushTriggered) => S::AcquireDeferral,
            (S::Start, E::UnexpectedActivation) => S::DisplayUnexpected,

            // Foreground path
            (S::NegotiatingChannel, E::ChannelAcquired) => S::ForegroundSubscribed,
            (S::NegotiatingChannel, E::ChannelUnavailable) => S::NoChannel,

            // Background path
            (S::AcquireDeferral, E::DeferralAcquired) => S::ProcessPayload,
            (S::AcquireDeferral, E::PayloadMissing) => S::UnregisterComActivator,
            (S::ProcessPayload, E::PayloadProcessed) => S::ReleaseDeferral,
            (S::ReleaseDeferral, E::DeferralReleased) => S::UnregisterComActivator,

            // Exit
            (S::ForegroundSubscribed | S::NoChannel | S::DisplayUnexpected, E::ExitRequested) => {
                S::UnregisterComActivator
            }
            (S::UnregisterComActivator, E::ActivatorUnregistered) => S::End,

            (from_state, _) => {
                return Err(PushError::StateTransition(format!(
                    "cannot apply {} in state {from_state}",
                    event.event_type()
                )))
            }
        };

        Ok(target)
    }
}
