//! Foreground delivery: a running instance receives notifications through the channel's
//! "push received" event.
//!
//! The handler runs in the platform's dispatch context, concurrently with the main
//! task's wait for user exit. It shares nothing mutable with the main task apart from
//! its own delivery counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::channel::{Channel, EventToken, PushReceivedHandler};
use crate::console::Console;
use crate::constants::messages;
use crate::notification::PushReceivedEventArgs;

pub struct ForegroundNotificationHandler {
    console: Arc<dyn Console>,
    received: AtomicU64,
}

impl ForegroundNotificationHandler {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self {
            console,
            received: AtomicU64::new(0),
        }
    }

    /// Deliveries processed so far
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Acquire)
    }
}

impl PushReceivedHandler for ForegroundNotificationHandler {
    fn on_push_received(&self, args: &PushReceivedEventArgs) {
        let text = args.payload().to_text();
        debug!(payload_len = args.payload().len(), "Foreground push received");

        self.console
            .write_line(&format!("{}{}", messages::FOREGROUND_PREFIX, text));

        args.set_handled(true);
        self.received.fetch_add(1, Ordering::AcqRel);
    }
}

/// Subscribe the foreground handler on an acquired channel.
///
/// The subscription lasts as long as the channel; dropping the channel tears it down.
pub fn subscribe_foreground_handler(
    channel: &Channel,
    handler: Arc<ForegroundNotificationHandler>,
) -> EventToken {
    let token = channel.push_received(handler);
    info!(token = %token, channel_uri = %channel.uri(), "Foreground push handler subscribed");
    token
}
