//! # Platform Seam
//!
//! The OS notification service and the process activation record are external
//! collaborators. These traits are the only surface the sample drives; [`simulated`]
//! provides an in-process implementation.

pub mod simulated;

use uuid::Uuid;

use crate::activation::{ActivationInfo, ActivationRecord, RegistrationActivators};
use crate::channel::ChannelOperation;
use crate::error::Result;

pub use simulated::SimulatedPlatform;

/// The platform push notification service
pub trait PushNotificationManager: Send + Sync {
    /// Older OS versions lack some activators; callers skip registration then
    fn is_activator_supported(&self, activators: RegistrationActivators) -> bool;

    fn register_activator(&self, info: &ActivationInfo) -> Result<()>;

    fn unregister_activator(&self, activators: RegistrationActivators) -> Result<()>;

    /// Start an asynchronous channel request. Must be called within a tokio runtime.
    fn create_channel(&self, remote_id: Uuid) -> ChannelOperation;
}

/// The current process instance as seen by the OS
pub trait AppInstance: Send + Sync {
    fn activated_event_args(&self) -> ActivationRecord;
}
