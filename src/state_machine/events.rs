use serde::{Deserialize, Serialize};

/// Events that drive activation state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationEvent {
    NormalLaunch,
    PushTriggered,
    UnexpectedActivation,
    ChannelAcquired,
    /// Negotiation failed or timed out
    ChannelUnavailable,
    DeferralAcquired,
    PayloadProcessed,
    DeferralReleased,
    /// Push activation without notification arguments
    PayloadMissing,
    /// The user pressed Enter
    ExitRequested,
    ActivatorUnregistered,
}

impl ActivationEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NormalLaunch => "normal_launch",
            Self::PushTriggered => "push_triggered",
            Self::UnexpectedActivation => "unexpected_activation",
            Self::ChannelAcquired => "channel_acquired",
            Self::ChannelUnavailable => "channel_unavailable",
            Self::DeferralAcquired => "deferral_acquired",
            Self::PayloadProcessed => "payload_processed",
            Self::DeferralReleased => "deferral_released",
            Self::PayloadMissing => "payload_missing",
            Self::ExitRequested => "exit_requested",
            Self::ActivatorUnregistered => "activator_unregistered",
        }
    }
}
