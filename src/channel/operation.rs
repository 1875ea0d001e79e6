//! Cancellable channel request.
//!
//! [`channel_operation`] creates the two halves of one request: the caller keeps the
//! [`ChannelOperation`], the service drives the [`OperationController`]. Completion and
//! cancellation are decided under one lock, so exactly one of them wins: once
//! [`ChannelOperation::cancel`] has succeeded, [`OperationController::complete`] hands
//! the result back instead of delivering it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::{ChannelProgress, ChannelResult};
use crate::error::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncStatus {
    Started,
    Completed,
    Canceled,
}

#[derive(Debug)]
pub enum CancelOutcome {
    /// The request was still pending and is now abandoned
    Canceled,
    /// The service committed a result before the cancel took effect
    AlreadyCompleted(Option<ChannelResult>),
}

enum OperationState {
    Pending(oneshot::Sender<ChannelResult>),
    Completed,
    Canceled,
    /// The service dropped its controller without completing
    Abandoned,
}

struct OperationShared {
    state: Mutex<OperationState>,
}

/// Create both halves of a channel request. `progress_buffer` bounds queued progress
/// events.
pub fn channel_operation(progress_buffer: usize) -> (ChannelOperation, OperationController) {
    let (progress_tx, progress_rx) = mpsc::channel(progress_buffer.max(1));
    let (completion_tx, completion_rx) = oneshot::channel();
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let shared = Arc::new(OperationShared {
        state: Mutex::new(OperationState::Pending(completion_tx)),
    });

    let operation = ChannelOperation {
        progress: progress_rx,
        completion: completion_rx,
        delivered: false,
        cancel_tx,
        shared: Arc::clone(&shared),
    };
    let controller = OperationController {
        progress: progress_tx,
        cancel_rx,
        shared,
    };

    (operation, controller)
}

/// Caller half of a channel request
pub struct ChannelOperation {
    progress: mpsc::Receiver<ChannelProgress>,
    completion: oneshot::Receiver<ChannelResult>,
    delivered: bool,
    cancel_tx: watch::Sender<bool>,
    shared: Arc<OperationShared>,
}

impl ChannelOperation {
    pub fn status(&self) -> AsyncStatus {
        match &*self.shared.state.lock() {
            OperationState::Pending(_) => AsyncStatus::Started,
            OperationState::Completed | OperationState::Abandoned => AsyncStatus::Completed,
            OperationState::Canceled => AsyncStatus::Canceled,
        }
    }

    /// Wait for the result, feeding progress to `on_progress`. Returns `None` when
    /// `timeout` elapses first; the request is left pending for the caller to cancel.
    ///
    /// Progress queued before the result is always reported before it. Once a result has
    /// been delivered or the request cancelled, returns `None` immediately.
    pub async fn wait_for<F>(
        &mut self,
        timeout: Duration,
        mut on_progress: F,
    ) -> Option<ChannelResult>
    where
        F: FnMut(ChannelProgress),
    {
        if self.delivered {
            return None;
        }

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => return None,
                Some(progress) = self.progress.recv() => on_progress(progress),
                result = &mut self.completion => {
                    self.delivered = true;
                    return Some(result.unwrap_or(ChannelResult::OtherFailure(ErrorCode::E_ABORT)));
                }
            }
        }
    }

    /// Abandon the request. The service observes the cancellation through its
    /// controller and any result it produces afterwards is discarded.
    pub fn cancel(&mut self) -> CancelOutcome {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut *state, OperationState::Canceled) {
            OperationState::Pending(completion_tx) => {
                drop(completion_tx);
                drop(state);
                self.delivered = true;
                self.cancel_tx.send_replace(true);
                debug!("Channel request cancelled");
                CancelOutcome::Canceled
            }
            previous => {
                *state = previous;
                drop(state);
                let late = if self.delivered {
                    None
                } else {
                    self.delivered = true;
                    self.completion.try_recv().ok()
                };
                CancelOutcome::AlreadyCompleted(late)
            }
        }
    }
}

/// Service half of a channel request
pub struct OperationController {
    progress: mpsc::Sender<ChannelProgress>,
    cancel_rx: watch::Receiver<bool>,
    shared: Arc<OperationShared>,
}

impl OperationController {
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.shared.state.lock(), OperationState::Canceled)
    }

    /// Resolves once the caller cancels or drops its half
    pub async fn cancelled(&self) {
        let mut cancel_rx = self.cancel_rx.clone();
        // An Err means the caller dropped the operation, which is a cancel as well.
        let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Report progress; returns `false` once the caller is gone or has cancelled
    pub async fn report_progress(&self, progress: ChannelProgress) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.progress.send(progress).await.is_ok()
    }

    /// Deliver the result. Hands it back if the request was cancelled first.
    pub fn complete(self, result: ChannelResult) -> Result<(), ChannelResult> {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut *state, OperationState::Completed) {
            OperationState::Pending(completion_tx) => completion_tx.send(result),
            previous => {
                *state = previous;
                Err(result)
            }
        }
    }
}

impl Drop for OperationController {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if matches!(*state, OperationState::Pending(_)) {
            *state = OperationState::Abandoned;
        }
    }
}
