// src/exec/cancel.rs

//! One-shot cancellation between the orchestrator and a running job.
//!
//! The orchestrator keeps the [`CancelHandle`] in its active-job slot; the
//! job's own task owns the [`CancelSignal`]. Firing the handle never blocks
//! and never waits for the job to notice.

use tokio::sync::oneshot;

/// Sending half, held by whoever may cancel the job.
#[derive(Debug)]
pub struct CancelHandle {
    tx: Option<oneshot::Sender<()>>,
}

/// Receiving half, held by the job.
#[derive(Debug)]
pub struct CancelSignal {
    rx: oneshot::Receiver<()>,
    fired: bool,
}

/// Create a connected handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = oneshot::channel();
    (
        CancelHandle { tx: Some(tx) },
        CancelSignal { rx, fired: false },
    )
}

impl CancelHandle {
    /// Request cancellation. Returns `false` if the job already finished or
    /// was cancelled before.
    pub fn cancel(&mut self) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

impl CancelSignal {
    /// Resolve once cancellation is requested.
    ///
    /// A handle dropped without firing is not a cancellation; the future
    /// then stays pending forever.
    pub async fn cancelled(&mut self) {
        if self.fired {
            return;
        }
        match (&mut self.rx).await {
            Ok(()) => self.fired = true,
            Err(_) => std::future::pending::<()>().await,
        }
    }

    /// Non-blocking check.
    pub fn is_cancelled(&mut self) -> bool {
        if !self.fired {
            self.fired = self.rx.try_recv().is_ok();
        }
        self.fired
    }
}
