//! Channel negotiation.
//!
//! One request at a time is issued to the platform service. Progress is reported as it
//! arrives; retrying after transient errors is entirely the service's job, the
//! negotiator only logs it. A request that has not completed within the timeout is
//! cancelled and yields no channel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::operation::CancelOutcome;
use super::{ChannelProgress, ChannelRequestOutcome, ChannelResult};
use crate::channel::Channel;
use crate::config::masked_remote_id;
use crate::console::Console;
use crate::constants::messages;
use crate::platform::PushNotificationManager;

/// Counters over every request made through one negotiator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiatorStats {
    pub requests: u64,
    pub progress_events: u64,
    pub retry_events: u64,
    pub last_retry_count: Option<u32>,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
}

pub struct ChannelNegotiator {
    manager: Arc<dyn PushNotificationManager>,
    console: Arc<dyn Console>,
    in_flight: tokio::sync::Mutex<()>,
    stats: RwLock<NegotiatorStats>,
}

impl ChannelNegotiator {
    pub fn new(manager: Arc<dyn PushNotificationManager>, console: Arc<dyn Console>) -> Self {
        Self {
            manager,
            console,
            in_flight: tokio::sync::Mutex::new(()),
            stats: RwLock::new(NegotiatorStats::default()),
        }
    }

    pub fn stats(&self) -> NegotiatorStats {
        self.stats.read().clone()
    }

    /// Request a channel; `None` on failure or timeout
    pub async fn request_channel(&self, remote_id: Uuid, timeout: Duration) -> Option<Channel> {
        match self.negotiate(remote_id, timeout).await.into_result(timeout) {
            Ok(channel) => Some(channel),
            Err(e) => {
                debug!(error_code = ?e.error_code(), "No push channel: {e}");
                None
            }
        }
    }

    /// Request a channel and return the full outcome. Concurrent callers are served one
    /// after another.
    #[instrument(
        skip_all,
        fields(remote_id = %masked_remote_id(&remote_id), timeout_secs = timeout.as_secs())
    )]
    pub async fn negotiate(&self, remote_id: Uuid, timeout: Duration) -> ChannelRequestOutcome {
        let _in_flight = self.in_flight.lock().await;
        self.stats.write().requests += 1;

        info!("Requesting push channel");
        let mut operation = self.manager.create_channel(remote_id);

        let result = operation
            .wait_for(timeout, |progress| self.on_progress(progress))
            .await;

        let outcome = match result {
            Some(ChannelResult::CompletedSuccess(channel)) => {
                ChannelRequestOutcome::Success(channel)
            }
            Some(ChannelResult::CompletedFailure(error_code)) => {
                error!(
                    error_code = %error_code,
                    "Critical non-retryable error with the channel request"
                );
                ChannelRequestOutcome::Failure(error_code)
            }
            Some(ChannelResult::OtherFailure(error_code)) => {
                error!(error_code = %error_code, "Some other failure occurred");
                ChannelRequestOutcome::Failure(error_code)
            }
            None => {
                match operation.cancel() {
                    CancelOutcome::Canceled => {}
                    CancelOutcome::AlreadyCompleted(late) => {
                        debug!("Channel request completed as the timeout fired; discarding it");
                        if let Some(ChannelResult::CompletedSuccess(channel)) = late {
                            channel.close();
                        }
                    }
                }
                warn!(
                    timeout_secs = timeout.as_secs(),
                    status = ?operation.status(),
                    "Channel request timed out and was cancelled"
                );
                ChannelRequestOutcome::TimedOut
            }
        };

        self.report(&outcome);
        outcome
    }

    fn on_progress(&self, progress: ChannelProgress) {
        match progress {
            ChannelProgress::InProgress => {
                self.stats.write().progress_events += 1;
                self.console.write_line(messages::CHANNEL_REQUEST_IN_PROGRESS);
            }
            ChannelProgress::InProgressRetry {
                retry_count,
                extended_error,
            } => self.report(&ChannelRequestOutcome::TransientRetry {
                retry_count,
                extended_error,
            }),
        }
    }

    fn report(&self, outcome: &ChannelRequestOutcome) {
        match outcome {
            ChannelRequestOutcome::Success(channel) => {
                self.stats.write().successes += 1;
                info!(
                    channel_uri = %channel.uri(),
                    expiration = %channel.expiration(),
                    "Push channel acquired"
                );
                self.console
                    .write_line(&format!("{}{}", messages::CHANNEL_URI_PREFIX, channel.uri()));
                self.console.write_line(&format!(
                    "{}{}",
                    messages::CHANNEL_EXPIRES_PREFIX,
                    channel.expiration_display()
                ));
            }
            ChannelRequestOutcome::TransientRetry {
                retry_count,
                extended_error,
            } => {
                {
                    let mut stats = self.stats.write();
                    stats.retry_events += 1;
                    stats.last_retry_count = Some(*retry_count);
                }
                warn!(
                    retry_count = *retry_count,
                    error_code = %extended_error,
                    "Channel request is in back-off retry mode because of a retryable error; \
                     expect delays"
                );
            }
            ChannelRequestOutcome::Failure(_) => self.stats.write().failures += 1,
            ChannelRequestOutcome::TimedOut => self.stats.write().timeouts += 1,
        }
    }
}
