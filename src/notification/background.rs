//! Background delivery: the OS started the process because a notification arrived while
//! the app was not running.
//!
//! Ordering: the deferral is taken before the payload is touched and released only after
//! processing has finished. The deferral is released exactly once on every path.

use std::sync::Arc;

use tracing::{info, warn};

use crate::console::Console;
use crate::constants::messages;
use crate::notification::PushReceivedEventArgs;
use crate::state_machine::ActivationEvent;

pub struct BackgroundNotificationHandler {
    console: Arc<dyn Console>,
}

impl BackgroundNotificationHandler {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self { console }
    }

    /// Process one background-delivered payload under a deferral.
    ///
    /// `observe` is told about each step as it happens. Returns the displayed text.
    pub fn handle<F>(&self, args: &PushReceivedEventArgs, mut observe: F) -> String
    where
        F: FnMut(ActivationEvent),
    {
        let deferral = args.get_deferral();
        if deferral.is_none() {
            warn!("Background push delivered without a deferral; processing anyway");
        }
        observe(ActivationEvent::DeferralAcquired);

        let text = args.payload().to_text().into_owned();
        self.console
            .write_line(&format!("{}{}", messages::BACKGROUND_PREFIX, text));
        info!(payload_len = args.payload().len(), "Background push processed");
        observe(ActivationEvent::PayloadProcessed);

        if let Some(deferral) = deferral {
            deferral.complete();
        }
        observe(ActivationEvent::DeferralReleased);

        text
    }
}
