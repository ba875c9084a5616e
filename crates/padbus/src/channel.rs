use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::cancel::CancelToken;
use crate::types::Event;

/// A filtered, cancellable view onto the events of a bus.
///
/// The channel is closed once it is cancelled, dropped or the bus is closed;
/// receiving then returns `None`.
pub struct EventChannel {
    rx: Receiver<Event>,
    cancel: CancelToken,
}

impl EventChannel {
    pub(crate) fn new(rx: Receiver<Event>, cancel: CancelToken) -> Self {
        Self { rx, cancel }
    }

    /// Blocks until an event arrives or the channel is closed.
    pub fn recv(&self) -> Option<Event> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Event, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Iterates until the channel is closed.
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, Event> {
        self.rx.iter()
    }

    /// Underlying receiver, for use in `select!`.
    pub fn receiver(&self) -> &Receiver<Event> {
        &self.rx
    }

    /// Stops delivery and closes the channel.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
