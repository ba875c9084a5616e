use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};

use crate::cancel::CancelToken;
use crate::error::Error;

/// Creates an unbuffered stream that is closed through `closed`.
///
/// Crossbeam channels only disconnect once every sender is dropped, and
/// producers may be parked in a blocking read while holding one. Both ends
/// therefore also watch the token, so closing is immediate for everyone.
pub(crate) fn rendezvous<T>(closed: &CancelToken) -> (Outlet<T>, Inlet<T>) {
    let (tx, rx) = bounded(0);
    (
        Outlet {
            tx,
            closed: closed.clone(),
        },
        Inlet {
            rx,
            closed: closed.clone(),
        },
    )
}

/// Sending half of a closable stream.
pub(crate) struct Outlet<T> {
    tx: Sender<T>,
    closed: CancelToken,
}

impl<T> Clone for Outlet<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<T> Outlet<T> {
    /// Blocks until a receiver takes `value`. Returns `false` if the stream
    /// was closed or `abort` was cancelled first.
    pub(crate) fn send_unless(&self, value: T, abort: &CancelToken) -> bool {
        if self.closed.is_cancelled() || abort.is_cancelled() {
            return false;
        }
        select! {
            send(self.tx, value) -> res => res.is_ok(),
            recv(self.closed.receiver()) -> _ => false,
            recv(abort.receiver()) -> _ => false,
        }
    }

    /// Sends with a deadline, for paths that must not stall on an absent reader.
    pub(crate) fn offer(&self, value: T, timeout: Duration) -> bool {
        if self.closed.is_cancelled() {
            return false;
        }
        select! {
            send(self.tx, value) -> res => res.is_ok(),
            recv(self.closed.receiver()) -> _ => false,
            default(timeout) => false,
        }
    }
}

/// Receiving half of a closable stream.
pub(crate) struct Inlet<T> {
    rx: Receiver<T>,
    closed: CancelToken,
}

impl<T> Clone for Inlet<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<T> Inlet<T> {
    pub(crate) fn recv(&self) -> Option<T> {
        if self.closed.is_cancelled() {
            return None;
        }
        select! {
            recv(self.rx) -> msg => msg.ok(),
            recv(self.closed.receiver()) -> _ => None,
        }
    }

    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        if self.closed.is_cancelled() {
            return None;
        }
        select! {
            recv(self.rx) -> msg => msg.ok(),
            recv(self.closed.receiver()) -> _ => None,
            default(timeout) => None,
        }
    }

    pub(crate) fn receiver(&self) -> &Receiver<T> {
        &self.rx
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Read-only stream of operational errors reported by a bus.
///
/// Returns `None` permanently once the bus is closed.
pub struct ErrorStream {
    inner: Inlet<Error>,
}

impl ErrorStream {
    pub(crate) fn new(inner: Inlet<Error>) -> Self {
        Self { inner }
    }

    /// Blocks until an error is reported or the bus is closed.
    pub fn recv(&self) -> Option<Error> {
        self.inner.recv()
    }

    /// Waits up to `timeout` for an error.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Error> {
        self.inner.recv_timeout(timeout)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Iterates until the bus is closed.
    pub fn iter(&self) -> impl Iterator<Item = Error> + '_ {
        std::iter::from_fn(move || self.recv())
    }
}
