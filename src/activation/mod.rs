//! # Process Activation
//!
//! How the process was started, and what it registers with the OS so it can be started
//! again when a notification arrives.
//!
//! - [`ActivationKind`] - classification of the activation record
//! - [`RegistrationActivators`] - which activators to register, probe or unregister
//! - [`ActivationRecord`] - the OS-provided record, read once per process start
//! - [`ActivationDispatcher`] - routes the process down the matching branch

pub mod dispatcher;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::notification::PushReceivedEventArgs;

pub use dispatcher::{ActivationDispatcher, DispatchReport};

/// Why the OS started this process
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    /// Started by the user or a debugger
    NormalLaunch,
    /// Started because a notification arrived while the app was not running
    PushTriggered,
    /// Any other activation; carries the kind name reported by the OS
    Other(String),
}

impl ActivationKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "launch" => Self::NormalLaunch,
            "push" => Self::PushTriggered,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NormalLaunch => write!(f, "launch"),
            Self::PushTriggered => write!(f, "push"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

bitflags! {
    /// Activators the push service can start the process through
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RegistrationActivators: u32 {
        /// Background trigger; survives process exit
        const PUSH_TRIGGER = 0x1;
        /// In-process activation of a running instance
        const COM_ACTIVATOR = 0x2;
    }
}

impl fmt::Display for RegistrationActivators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        if names.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}

/// Registration request for [`crate::platform::PushNotificationManager::register_activator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationInfo {
    pub activators: RegistrationActivators,
    /// Must match the class id declared in the app manifest
    pub activator_clsid: Uuid,
}

impl ActivationInfo {
    pub fn new(activators: RegistrationActivators, activator_clsid: Uuid) -> Self {
        Self {
            activators,
            activator_clsid,
        }
    }
}

/// The OS-provided activation record
#[derive(Debug)]
pub struct ActivationRecord {
    kind: ActivationKind,
    push_args: Option<PushReceivedEventArgs>,
}

impl ActivationRecord {
    pub fn launch() -> Self {
        Self {
            kind: ActivationKind::NormalLaunch,
            push_args: None,
        }
    }

    pub fn push(args: PushReceivedEventArgs) -> Self {
        Self {
            kind: ActivationKind::PushTriggered,
            push_args: Some(args),
        }
    }

    pub fn other(name: impl Into<String>) -> Self {
        Self {
            kind: ActivationKind::Other(name.into()),
            push_args: None,
        }
    }

    pub fn kind(&self) -> &ActivationKind {
        &self.kind
    }

    /// Push data delivered with the activation; only present for push activations
    pub fn into_push_args(self) -> Option<PushReceivedEventArgs> {
        self.push_args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(ActivationKind::from_name("launch"), ActivationKind::NormalLaunch);
        assert_eq!(ActivationKind::from_name(" Push "), ActivationKind::PushTriggered);
        assert_eq!(
            ActivationKind::from_name("protocol"),
            ActivationKind::Other("protocol".to_string())
        );
        assert!(!ActivationKind::from_name("file").is_expected());
        assert!(ActivationKind::NormalLaunch.is_expected());
    }

    #[test]
    fn test_activators_display() {
        let both = RegistrationActivators::PUSH_TRIGGER | RegistrationActivators::COM_ACTIVATOR;
        assert_eq!(both.to_string(), "PUSH_TRIGGER | COM_ACTIVATOR");
        assert_eq!(RegistrationActivators::empty().to_string(), "NONE");
        assert!(both.contains(RegistrationActivators::COM_ACTIVATOR));
    }

    #[test]
    fn test_record_carries_push_args_only_for_push() {
        assert!(ActivationRecord::launch().into_push_args().is_none());
        assert!(ActivationRecord::other("file").into_push_args().is_none());

        let record = ActivationRecord::push(PushReceivedEventArgs::foreground("hi".into()));
        assert_eq!(record.kind(), &ActivationKind::PushTriggered);
        assert!(record.into_push_args().is_some());
    }
}
