use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Cooperative cancellation flag shared between a loop and its owner.
///
/// Cancelling drops the only sender of an internal channel, so the receiver
/// can take part in `select!` next to data channels.
#[derive(Clone, Debug)]
pub(crate) struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    tx: Mutex<Option<Sender<()>>>,
    rx: Receiver<()>,
}

impl CancelToken {
    pub(crate) fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                tx: Mutex::new(Some(tx)),
                rx,
            }),
        }
    }

    /// Signals cancellation. Repeated calls are no-ops.
    pub(crate) fn cancel(&self) {
        if let Ok(mut tx) = self.inner.tx.lock() {
            tx.take();
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(self.inner.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready (disconnected) once cancelled.
    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.inner.rx
    }
}
