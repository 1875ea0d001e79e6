//! # Push Channels
//!
//! A [`Channel`] is the delivery address the push backend routes notifications to. The
//! caller owns it; the platform only holds a [`ChannelEndpoint`] (a weak reference) to
//! deliver foreground notifications, so dropping the channel ends delivery.
//!
//! - [`operation`] - the cancellable, progress-reporting channel request
//! - [`negotiator`] - drives one request to completion, failure or timeout

pub mod negotiator;
pub mod operation;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::EXPIRATION_FORMAT;
use crate::error::{ErrorCode, PushError, Result};
use crate::notification::PushReceivedEventArgs;

pub use negotiator::{ChannelNegotiator, NegotiatorStats};
pub use operation::{
    channel_operation, AsyncStatus, CancelOutcome, ChannelOperation, OperationController,
};

/// Callback for the channel's "push received" event
pub trait PushReceivedHandler: Send + Sync {
    fn on_push_received(&self, args: &PushReceivedEventArgs);
}

impl<F> PushReceivedHandler for F
where
    F: Fn(&PushReceivedEventArgs) + Send + Sync,
{
    fn on_push_received(&self, args: &PushReceivedEventArgs) {
        self(args)
    }
}

/// Identifies one subscription on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventToken(u64);

impl fmt::Display for EventToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event_token:{}", self.0)
    }
}

struct ChannelInner {
    uri: String,
    expiration: DateTime<Utc>,
    handlers: RwLock<Vec<(EventToken, Arc<dyn PushReceivedHandler>)>>,
    next_token: AtomicU64,
}

/// An acquired push channel
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    pub fn new(uri: impl Into<String>, expiration: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                uri: uri.into(),
                expiration,
                handlers: RwLock::new(Vec::new()),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.inner.expiration
    }

    /// Expiration rendered in local time with the display pattern
    pub fn expiration_display(&self) -> String {
        format_expiration(&self.inner.expiration.with_timezone(&Local))
    }

    pub fn push_received(&self, handler: Arc<dyn PushReceivedHandler>) -> EventToken {
        let token = EventToken(self.inner.next_token.fetch_add(1, Ordering::Relaxed));
        self.inner.handlers.write().push((token, handler));
        token
    }

    pub fn remove_push_received(&self, token: EventToken) -> bool {
        let mut handlers = self.inner.handlers.write();
        let before = handlers.len();
        handlers.retain(|(t, _)| *t != token);
        handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.read().len()
    }

    /// Handle the platform uses to deliver foreground notifications
    pub fn endpoint(&self) -> ChannelEndpoint {
        ChannelEndpoint {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Release the channel and every subscription on it
    pub fn close(self) {
        debug!(channel_uri = %self.uri(), "Closing push channel");
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.inner.handlers.write().clear();
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("uri", &self.inner.uri)
            .field("expiration", &self.inner.expiration)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// What happened to a foreground delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// A handler marked the event handled
    Handled,
    /// Handlers ran but none marked it; the OS falls back to background activation
    NotHandled,
    /// The channel is gone or nobody is subscribed
    NoSubscriber,
}

/// Weak reference to a channel held by the platform
#[derive(Clone)]
pub struct ChannelEndpoint {
    inner: Weak<ChannelInner>,
}

impl ChannelEndpoint {
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn has_subscribers(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| !inner.handlers.read().is_empty())
            .unwrap_or(false)
    }

    /// Run every subscribed handler synchronously, in subscription order
    pub fn dispatch(&self, args: &PushReceivedEventArgs) -> DeliveryOutcome {
        let Some(inner) = self.inner.upgrade() else {
            return DeliveryOutcome::NoSubscriber;
        };

        // Handlers may subscribe or unsubscribe; never call them under the lock.
        let handlers: Vec<Arc<dyn PushReceivedHandler>> = inner
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        if handlers.is_empty() {
            return DeliveryOutcome::NoSubscriber;
        }

        for handler in handlers {
            handler.on_push_received(args);
        }

        if args.handled() {
            DeliveryOutcome::Handled
        } else {
            DeliveryOutcome::NotHandled
        }
    }
}

impl fmt::Debug for ChannelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelEndpoint")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Progress reported while a channel request is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelProgress {
    /// Informational only
    InProgress,
    /// The service hit a retryable error and is backing off; retrying is its job
    InProgressRetry {
        retry_count: u32,
        extended_error: ErrorCode,
    },
}

/// Terminal result of a channel request
#[derive(Debug)]
pub enum ChannelResult {
    CompletedSuccess(Channel),
    /// Critical, non-retryable failure
    CompletedFailure(ErrorCode),
    OtherFailure(ErrorCode),
}

impl ChannelResult {
    pub fn status_name(&self) -> &'static str {
        match self {
            Self::CompletedSuccess(_) => "completed_success",
            Self::CompletedFailure(_) => "completed_failure",
            Self::OtherFailure(_) => "other_failure",
        }
    }
}

/// What the negotiator observed for a request; drives progress reporting
#[derive(Debug)]
pub enum ChannelRequestOutcome {
    Success(Channel),
    TransientRetry {
        retry_count: u32,
        extended_error: ErrorCode,
    },
    Failure(ErrorCode),
    /// No completion within the timeout; the request was cancelled
    TimedOut,
}

impl ChannelRequestOutcome {
    pub fn into_channel(self) -> Option<Channel> {
        match self {
            Self::Success(channel) => Some(channel),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The channel, or the error explaining why there is none
    pub fn into_result(self, timeout: Duration) -> Result<Channel> {
        match self {
            Self::Success(channel) => Ok(channel),
            Self::TransientRetry {
                retry_count,
                extended_error,
            } => Err(PushError::NegotiationTransientRetry {
                retry_count,
                error_code: extended_error,
            }),
            Self::Failure(error_code) => Err(PushError::NegotiationFailure { error_code }),
            Self::TimedOut => Err(PushError::NegotiationTimeout(timeout)),
        }
    }
}

/// `on {month.abbreviated} {day}, {year} at {hour}:{minute}:{second}`
pub fn format_expiration<Tz>(expiration: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    expiration.format(EXPIRATION_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_format_expiration() {
        let expiration = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 3).unwrap();
        assert_eq!(format_expiration(&expiration), "on Mar 7, 2024 at 9:05:03");

        let expiration = Utc.with_ymd_and_hms(2025, 12, 25, 17, 45, 0).unwrap();
        assert_eq!(format_expiration(&expiration), "on Dec 25, 2025 at 17:45:00");
    }

    #[test]
    fn test_subscribe_and_remove() {
        let channel = Channel::new("https://push.invalid/a", Utc::now());
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let token = channel.push_received(Arc::new(move |_: &PushReceivedEventArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(channel.subscriber_count(), 1);

        let args = PushReceivedEventArgs::foreground("a".into());
        assert_eq!(channel.endpoint().dispatch(&args), DeliveryOutcome::NotHandled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(channel.remove_push_received(token));
        assert!(!channel.remove_push_received(token));
        assert_eq!(
            channel.endpoint().dispatch(&args),
            DeliveryOutcome::NoSubscriber
        );
    }

    #[test]
    fn test_dropping_channel_ends_delivery() {
        let channel = Channel::new("https://push.invalid/b", Utc::now());
        channel.push_received(Arc::new(|args: &PushReceivedEventArgs| args.set_handled(true)));
        let endpoint = channel.endpoint();
        assert!(endpoint.is_alive());
        assert!(endpoint.has_subscribers());

        channel.close();

        assert!(!endpoint.is_alive());
        let args = PushReceivedEventArgs::foreground("late".into());
        assert_eq!(endpoint.dispatch(&args), DeliveryOutcome::NoSubscriber);
        assert!(!args.handled());
    }

    #[test]
    fn test_outcome_into_channel() {
        let outcome = ChannelRequestOutcome::Success(Channel::new("u", Utc::now()));
        assert!(outcome.is_success());
        assert_eq!(outcome.into_channel().map(|c| c.uri().to_string()), Some("u".to_string()));
        assert!(ChannelRequestOutcome::TimedOut.into_channel().is_none());
        assert!(matches!(
            ChannelRequestOutcome::TimedOut.into_result(Duration::from_secs(300)),
            Err(PushError::NegotiationTimeout(_))
        ));
        assert!(ChannelRequestOutcome::Failure(ErrorCode::E_FAIL)
            .into_channel()
            .is_none());
    }
}
