use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use log::{debug, warn};

use crate::backend::Backend;
use crate::cancel::CancelToken;
use crate::channel::EventChannel;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::notifier::{DirectoryNotifier, Notifier};
use crate::options::BusOptions;
use crate::platform::start_notifier;
use crate::stream::{rendezvous, ErrorStream, Inlet, Outlet};
use crate::types::{Device, Event};

/// Entry point for consumers: device discovery, subscriptions and fan-out.
///
/// Every event from the notifier and the subscribed devices is offered to
/// each live [`EventChannel`]. Delivery is a rendezvous: a channel whose
/// consumer stops reading holds back delivery to all others.
pub struct Bus {
    notifier: Option<Box<dyn Notifier>>,
    hub: Arc<Hub>,
    options: BusOptions,
}

/// State shared with the dispatcher and the forwarding loops.
struct Hub {
    events: Inlet<Event>,
    errors: Outlet<Error>,
    channels: RwLock<Vec<Registration>>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    closed: CancelToken,
    next_id: AtomicU64,
}

struct Registration {
    id: u64,
    inbox: Sender<Event>,
    cancel: CancelToken,
}

impl Bus {
    /// Creates a bus backed by the host platform.
    ///
    /// Fails with [`Error::OsNotSupported`] where no backend exists and with
    /// [`Error::ListDir`] if the device directory cannot be read.
    pub fn new(options: BusOptions) -> Result<(Self, ErrorStream)> {
        Self::build(options, start_notifier)
    }

    /// Creates a bus on top of a custom backend.
    pub fn with_backend<B: Backend>(backend: B, options: BusOptions) -> Result<(Self, ErrorStream)> {
        Self::build(options, move |options, events, errors| {
            let notifier = DirectoryNotifier::start(backend, options, events, errors)?;
            Ok(Box::new(notifier) as Box<dyn Notifier>)
        })
    }

    fn build<F>(options: BusOptions, start: F) -> Result<(Self, ErrorStream)>
    where
        F: FnOnce(BusOptions, Outlet<Event>, Outlet<Error>) -> Result<Box<dyn Notifier>>,
    {
        let closed = CancelToken::new();
        let (events_tx, events_rx) = rendezvous(&closed);
        let (errors_tx, errors_rx) = rendezvous(&closed);

        let notifier = match start(options.clone(), events_tx, errors_tx.clone()) {
            Ok(notifier) => notifier,
            Err(e) => {
                closed.cancel();
                return Err(e);
            }
        };

        let (wake_tx, wake_rx) = unbounded();
        let hub = Arc::new(Hub {
            events: events_rx,
            errors: errors_tx,
            channels: RwLock::new(Vec::new()),
            wake_tx,
            wake_rx,
            closed,
            next_id: AtomicU64::new(0),
        });
        let dispatcher = hub.clone();
        thread::spawn(move || dispatcher.dispatch());
        debug!("bus started on {}", options.device_dir.display());

        let bus = Self {
            notifier: Some(notifier),
            hub,
            options,
        };
        Ok((bus, ErrorStream::new(errors_rx)))
    }

    /// Creates a channel receiving the events accepted by all `filters`.
    ///
    /// Returns once the channel's forwarding loop is running, or `None` if
    /// the bus is closed.
    pub fn new_event_channel(&self, filters: Vec<Filter>) -> Option<EventChannel> {
        self.notifier.as_ref()?;

        let (inbox_tx, inbox_rx) = bounded(0);
        let (output_tx, output_rx) = bounded(0);
        let (started_tx, started_rx) = bounded(1);
        let cancel = CancelToken::new();
        let id = self.hub.next_id.fetch_add(1, Ordering::Relaxed);

        self.hub.register(Registration {
            id,
            inbox: inbox_tx,
            cancel: cancel.clone(),
        });

        let hub = self.hub.clone();
        let loop_cancel = cancel.clone();
        thread::spawn(move || {
            let _ = started_tx.send(());
            forward(&inbox_rx, &output_tx, &filters, &loop_cancel);
            drop(output_tx);
            hub.unregister(id);
        });
        let _ = started_rx.recv();

        Some(EventChannel::new(output_rx, cancel))
    }

    /// Snapshot of the currently registered devices.
    pub fn devices(&self) -> Vec<Device> {
        self.notifier
            .as_ref()
            .map(|notifier| notifier.devices())
            .unwrap_or_default()
    }

    /// Starts delivering control events of device `id`.
    pub fn subscribe(&self, id: &str) -> Result<()> {
        self.notifier()?.subscribe(id)
    }

    /// Stops delivering control events of device `id`.
    pub fn unsubscribe(&self, id: &str) -> Result<()> {
        self.notifier()?.unsubscribe(id)
    }

    /// Number of live event channels.
    #[cfg(test)]
    pub(crate) fn channel_count(&self) -> usize {
        self.hub.channels().len()
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.notifier.is_none()
    }

    /// Stops discovery, closes every event channel and the error stream.
    ///
    /// Channels are cancelled before the shared streams are closed so no
    /// forwarding loop is left delivering into a closed stream. Calling it
    /// again is a no-op.
    pub fn close(&mut self) {
        let Some(notifier) = self.notifier.take() else {
            return;
        };

        for error in notifier.stop() {
            warn!("{error}");
            self.hub.errors.offer(error, self.options.shutdown_grace());
        }
        drop(notifier);

        for registration in self.hub.channels().iter() {
            registration.cancel.cancel();
        }
        self.hub.closed.cancel();
        debug!("bus closed");
    }

    fn notifier(&self) -> Result<&dyn Notifier> {
        self.notifier
            .as_deref()
            .ok_or(Error::NotifierNotInitialized)
    }
}

impl Drop for Bus {
    fn drop(&mut self) {
        self.close();
    }
}

impl Hub {
    /// Hands each event from the shared stream to every registered channel.
    ///
    /// Nothing is taken from the stream while no channel is registered, so
    /// producers wait for the first subscriber instead of losing events.
    fn dispatch(&self) {
        loop {
            let targets: Vec<(Sender<Event>, CancelToken)> = self
                .channels()
                .iter()
                .map(|r| (r.inbox.clone(), r.cancel.clone()))
                .collect();

            if targets.is_empty() {
                select! {
                    recv(self.wake_rx) -> _ => continue,
                    recv(self.closed.receiver()) -> _ => return,
                }
            }

            let event = select! {
                recv(self.events.receiver()) -> msg => match msg {
                    Ok(event) => event,
                    Err(_) => return,
                },
                recv(self.wake_rx) -> _ => continue,
                recv(self.closed.receiver()) -> _ => return,
            };

            for (inbox, cancel) in &targets {
                select! {
                    send(inbox, event.clone()) -> _ => {}
                    recv(cancel.receiver()) -> _ => {}
                    recv(self.closed.receiver()) -> _ => return,
                }
            }
        }
    }

    fn register(&self, registration: Registration) {
        self.channels_mut().push(registration);
        let _ = self.wake_tx.send(());
    }

    fn unregister(&self, id: u64) {
        self.channels_mut().retain(|r| r.id != id);
        let _ = self.wake_tx.send(());
    }

    fn channels(&self) -> RwLockReadGuard<'_, Vec<Registration>> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn channels_mut(&self) -> RwLockWriteGuard<'_, Vec<Registration>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Forwarding loop of one channel. Returns when the channel is cancelled or
/// its consumer is gone.
fn forward(inbox: &Receiver<Event>, output: &Sender<Event>, filters: &[Filter], cancel: &CancelToken) {
    loop {
        select! {
            recv(cancel.receiver()) -> _ => break,
            recv(inbox) -> msg => {
                let Ok(event) = msg else { break };
                if !filters.iter().all(|filter| filter(&event)) {
                    continue;
                }
                select! {
                    send(output, event) -> res => {
                        if res.is_err() {
                            break;
                        }
                    }
                    recv(cancel.receiver()) -> _ => break,
                }
            }
        }
    }
}
