//! Deferral token for background activations.
//!
//! A [`Deferral`] postpones the OS's right to suspend or terminate the process. It is
//! move-only and [`Deferral::complete`] consumes it, so it is released at most once; a
//! deferral dropped without `complete` is released by its destructor.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

/// Platform side of a deferral
pub trait DeferralTracker: Send + Sync {
    fn acquired(&self);
    fn released(&self);
}

pub struct Deferral {
    tracker: Option<Arc<dyn DeferralTracker>>,
}

impl Deferral {
    pub(crate) fn acquire(tracker: Arc<dyn DeferralTracker>) -> Self {
        tracker.acquired();
        debug!("Deferral acquired");
        Self {
            tracker: Some(tracker),
        }
    }

    /// Release the deferral once processing has finished
    pub fn complete(mut self) {
        self.release();
        debug!("Deferral completed");
    }

    fn release(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            tracker.released();
        }
    }
}

impl Drop for Deferral {
    fn drop(&mut self) {
        if self.tracker.is_some() {
            warn!("Deferral dropped without being completed; releasing it now");
            self.release();
        }
    }
}

impl fmt::Debug for Deferral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferral")
            .field("held", &self.tracker.is_some())
            .finish()
    }
}
