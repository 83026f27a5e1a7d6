//! Run control shared by the fetcher and the downloader.
//!
//! Each component owns one [`RunSlot`]: claiming it hands out the
//! cancellation token of the new run, and only one run can hold it at a
//! time. Completion is reported once through a [`Finished`] signal.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Returned when a run is requested while the component is not idle.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{component} is busy; wait for the current run to finish")]
pub struct Busy {
    /// Which component refused the run.
    pub component: &'static str,
}

/// The run ended without reporting completion (its task panicked or was dropped).
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("run ended without signalling completion")]
pub struct SignalLost;

/// One-shot "finished" signal of a fetch or download run.
///
/// Returned before any network operation starts, so callers can hold on to
/// it (or drop it) without racing the run.
#[derive(Debug)]
#[must_use = "the finished signal carries the result of the run"]
pub struct Finished<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Finished<T> {
    pub(crate) fn channel() -> (oneshot::Sender<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// A signal that has already fired.
    pub(crate) fn ready(value: T) -> Self {
        let (tx, signal) = Self::channel();
        // Receiver is alive in `signal`, send cannot fail.
        let _ = tx.send(value);
        signal
    }

    /// Waits for the run to finish.
    ///
    /// # Errors
    ///
    /// Returns [`SignalLost`] if the run's task died before reporting.
    pub async fn wait(self) -> Result<T, SignalLost> {
        self.rx.await.map_err(|_| SignalLost)
    }
}

/// Why a transfer session stopped before completing.
#[derive(Debug)]
pub(crate) enum SessionEnd {
    /// The run's token fired.
    Aborted,
    /// The transfer failed; the operator decides what happens next.
    Failed(crate::download::DownloadError),
}

/// Holds the cancellation token of the run in progress, if any.
#[derive(Debug, Default)]
pub(crate) struct RunSlot {
    active: Mutex<Option<CancellationToken>>,
}

impl RunSlot {
    /// Claims the slot for a new run.
    pub(crate) fn claim(&self, component: &'static str) -> Result<CancellationToken, Busy> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Err(Busy { component });
        }
        let token = CancellationToken::new();
        *active = Some(token.clone());
        Ok(token)
    }

    /// Frees the slot once every resource of the run is released.
    pub(crate) fn release(&self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Cancels the run in progress. Returns false when idle.
    pub(crate) fn cancel(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Runs `fut` unless `token` fires first; cancellation wins ties.
pub(crate) async fn unless_cancelled<F>(token: &CancellationToken, fut: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        () = token.cancelled() => None,
        output = fut => Some(output),
    }
}
