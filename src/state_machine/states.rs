use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the sample is in its activation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    /// Activation record not yet inspected
    #[default]
    Start,
    /// Normal launch: a channel request is pending
    NegotiatingChannel,
    /// A foreground handler is attached to the acquired channel
    ForegroundSubscribed,
    /// Negotiation failed or timed out; running without a channel
    NoChannel,
    /// Push activation: taking the deferral
    AcquireDeferral,
    ProcessPayload,
    ReleaseDeferral,
    /// Neither a launch nor a push activation
    DisplayUnexpected,
    UnregisterComActivator,
    End,
}

impl ActivationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End)
    }

    /// States in which the process is waiting for the user to exit
    pub fn awaits_exit(&self) -> bool {
        matches!(
            self,
            Self::ForegroundSubscribed | Self::NoChannel | Self::DisplayUnexpected
        )
    }

    /// States in which a background deferral is held
    pub fn holds_deferral(&self) -> bool {
        matches!(self, Self::ProcessPayload | Self::ReleaseDeferral)
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::NegotiatingChannel => write!(f, "negotiating_channel"),
            Self::ForegroundSubscribed => write!(f, "foreground_subscribed"),
            Self::NoChannel => write!(f, "no_channel"),
            Self::AcquireDeferral => write!(f, "acquire_deferral"),
            Self::ProcessPayload => write!(f, "process_payload"),
            Self::ReleaseDeferral => write!(f, "release_deferral"),
            Self::DisplayUnexpected => write!(f, "display_unexpected"),
            Self::UnregisterComActivator => write!(f, "unregister_com_activator"),
            Self::End => write!(f, "end"),
        }
    }
}

impl std::str::FromStr for ActivationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "negotiating_channel" => Ok(Self::NegotiatingChannel),
            "foreground_subscribed" => Ok(Self::ForegroundSubscribed),
            "no_channel" => Ok(Self::NoChannel),
            "acquire_deferral" => Ok(Self::AcquireDeferral),
            "process_payload" => Ok(Self::ProcessPayload),
            "release_deferral" => Ok(Self::ReleaseDeferral),
            "display_unexpected" => Ok(Self::DisplayUnexpected),
            "unregister_com_activator" => Ok(Self::UnregisterComActivator),
            "end" => Ok(Self::End),
            _ => Err(format!("Invalid activation state: {s}")),
        }
    }
}
