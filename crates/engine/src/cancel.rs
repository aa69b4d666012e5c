//! Cooperative cancellation for long-running batches.
//!
//! A [`CancelHandle`] is held by whoever may want to stop the work; any
//! number of [`CancelFlag`] clones travel with the work itself. Cancellation
//! is advisory: units already dispatched to the model run to completion,
//! units not yet dispatched are skipped.

use tokio::sync::watch;

/// Create a linked handle/flag pair.
pub fn cancel_pair() -> (CancelHandle, CancelFlag) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelFlag { rx })
}

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelFlag {
    rx: watch::Receiver<bool>,
}

impl CancelFlag {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// A flag that never fires, for callers without a cancellation path.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }
}
