//! # Notification Handling
//!
//! Inbound push payloads and the two ways they reach the app:
//!
//! - [`foreground`] - delivered to a running instance through the channel's
//!   "push received" event
//! - [`background`] - delivered with the activation record when the OS starts the
//!   process for the notification

pub mod background;
pub mod deferral;
pub mod foreground;

use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use background::BackgroundNotificationHandler;
pub use deferral::{Deferral, DeferralTracker};
pub use foreground::{subscribe_foreground_handler, ForegroundNotificationHandler};

/// Raw bytes of a push notification
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationPayload(Vec<u8>);

impl NotificationPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text rendering for display; invalid UTF-8 sequences are replaced
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<Vec<u8>> for NotificationPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for NotificationPayload {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for NotificationPayload {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

/// Arguments of a push delivery, in either the foreground or the background path
pub struct PushReceivedEventArgs {
    payload: NotificationPayload,
    handled: AtomicBool,
    deferral_tracker: Option<Arc<dyn DeferralTracker>>,
}

impl PushReceivedEventArgs {
    /// Delivery to a running instance; no deferral is available
    pub fn foreground(payload: NotificationPayload) -> Self {
        Self {
            payload,
            handled: AtomicBool::new(false),
            deferral_tracker: None,
        }
    }

    /// Delivery through a background activation; the tracker observes the deferral
    pub fn background(payload: NotificationPayload, tracker: Arc<dyn DeferralTracker>) -> Self {
        Self {
            payload,
            handled: AtomicBool::new(false),
            deferral_tracker: Some(tracker),
        }
    }

    pub fn payload(&self) -> &NotificationPayload {
        &self.payload
    }

    pub fn handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }

    /// Marking a foreground delivery handled stops the OS from re-delivering it
    /// through background activation
    pub fn set_handled(&self, handled: bool) {
        self.handled.store(handled, Ordering::Release);
    }

    /// Keep the process alive until the returned deferral is completed.
    /// Returns `None` outside a background activation.
    pub fn get_deferral(&self) -> Option<Deferral> {
        match &self.deferral_tracker {
            Some(tracker) => Some(Deferral::acquire(Arc::clone(tracker))),
            None => {
                warn!("Deferral requested outside a background activation");
                None
            }
        }
    }
}

impl fmt::Debug for PushReceivedEventArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushReceivedEventArgs")
            .field("payload_len", &self.payload.len())
            .field("handled", &self.handled())
            .field("background", &self.deferral_tracker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_text_is_lossy() {
        let payload = NotificationPayload::new(vec![b'o', b'k', 0xFF]);
        assert_eq!(payload.to_text(), "ok\u{FFFD}");
        assert_eq!(payload.len(), 3);

        let payload: NotificationPayload = "hello".into();
        assert_eq!(payload.to_text(), "hello");
        assert!(NotificationPayload::default().is_empty());
    }

    #[test]
    fn test_handled_flag() {
        let args = PushReceivedEventArgs::foreground("x".into());
        assert!(!args.handled());
        args.set_handled(true);
        assert!(args.handled());
    }

    #[test]
    fn test_foreground_args_have_no_deferral() {
        let args = PushReceivedEventArgs::foreground("x".into());
        assert!(args.get_deferral().is_none());
    }
}
