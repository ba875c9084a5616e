use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;

use log::{debug, warn};

use crate::backend::{Backend, DirectoryWatch, Notification, WatchKind};
use crate::cancel::CancelToken;
use crate::device::DeviceHandle;
use crate::error::{Error, Result};
use crate::options::BusOptions;
use crate::stream::Outlet;
use crate::types::{Device, DeviceId, Event};

/// Device discovery as seen by the bus.
pub(crate) trait Notifier: Send + Sync {
    /// Snapshot of all registered devices.
    fn devices(&self) -> Vec<Device>;
    fn subscribe(&self, id: &str) -> Result<()>;
    fn unsubscribe(&self, id: &str) -> Result<()>;
    /// Releases every subscribed device and stops the watch loop. Returns
    /// the errors met while releasing.
    fn stop(&self) -> Vec<Error>;
}

/// Notifier driven by a device directory listing followed by a watch.
pub(crate) struct DirectoryNotifier<B: Backend> {
    shared: Arc<Shared<B>>,
}

struct Shared<B: Backend> {
    backend: B,
    options: BusOptions,
    handles: RwLock<Vec<Arc<DeviceHandle>>>,
    events: Outlet<Event>,
    errors: Outlet<Error>,
    cancel: CancelToken,
}

impl<B: Backend> DirectoryNotifier<B> {
    /// Lists the device directory and starts the watch thread.
    ///
    /// Entries present at startup go through the same path as hot-plugged
    /// ones. The watch is only opened once all of them have been handled.
    pub(crate) fn start(
        backend: B,
        options: BusOptions,
        events: Outlet<Event>,
        errors: Outlet<Error>,
    ) -> Result<Self> {
        let entries = backend
            .list(&options.device_dir)
            .map_err(|source| Error::ListDir {
                path: options.device_dir.clone(),
                source,
            })?;
        let initial: Vec<Notification> = entries
            .into_iter()
            .map(|name| Notification::new(WatchKind::Create, name.to_string_lossy().into_owned()))
            .collect();

        let shared = Arc::new(Shared {
            backend,
            options,
            handles: RwLock::new(Vec::new()),
            events,
            errors,
            cancel: CancelToken::new(),
        });
        let worker = shared.clone();
        thread::spawn(move || worker.run(initial));

        Ok(Self { shared })
    }
}

impl<B: Backend> Notifier for DirectoryNotifier<B> {
    fn devices(&self) -> Vec<Device> {
        self.shared
            .handles()
            .iter()
            .map(|handle| handle.device().clone())
            .collect()
    }

    fn subscribe(&self, id: &str) -> Result<()> {
        let shared = &self.shared;
        shared
            .find(id)?
            .subscribe(&shared.backend, &shared.events, &shared.options)
    }

    fn unsubscribe(&self, id: &str) -> Result<()> {
        self.shared.find(id)?.unsubscribe()
    }

    fn stop(&self) -> Vec<Error> {
        let handles: Vec<Arc<DeviceHandle>> = self.shared.handles().clone();
        let errors = handles
            .iter()
            .filter(|handle| handle.is_subscribed())
            .filter_map(|handle| handle.unsubscribe().err())
            .collect();
        self.shared.cancel.cancel();
        debug!("notifier stopped");
        errors
    }
}

impl<B: Backend> Shared<B> {
    fn run(&self, initial: Vec<Notification>) {
        self.handle_listing(initial);
        if self.cancel.is_cancelled() {
            return;
        }

        let dir = &self.options.device_dir;
        let mut watch = match self.backend.watch(dir) {
            Ok(watch) => watch,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        debug!("watching {}", dir.display());

        // Cancellation is observed between reads; each read is bounded by
        // the poll interval.
        while !self.cancel.is_cancelled() {
            match watch.read(self.options.watch_poll()) {
                // Records of one read may name the same node twice, so
                // they are handled in the order the watch reported them.
                Ok(batch) => {
                    for notification in &batch {
                        self.handle_notification(notification);
                    }
                }
                Err(e) => {
                    self.report(e);
                    break;
                }
            }
        }
        debug!("watch loop for {} stopped", dir.display());
    }

    /// Handles the startup listing concurrently and waits for all of it.
    /// A listing names every node once.
    fn handle_listing(&self, listing: Vec<Notification>) {
        if listing.is_empty() {
            return;
        }
        thread::scope(|scope| {
            for notification in listing {
                scope.spawn(move || self.handle_notification(&notification));
            }
        });
    }

    fn handle_notification(&self, notification: &Notification) {
        let Some(id) = device_name(&notification.name, &self.options.name_prefix) else {
            return;
        };
        match notification.kind {
            WatchKind::Create => self.connect(id),
            WatchKind::Delete => self.disconnect(id),
            WatchKind::Modify => {}
        }
    }

    fn connect(&self, id: DeviceId) {
        let path = self.options.device_dir.join(&id);
        let handle = match DeviceHandle::connect(&self.backend, id, path, &self.options) {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                self.report(e);
                return;
            }
        };
        let device = handle.device().clone();

        let replaced = {
            let mut handles = self.handles_mut();
            match handles.iter().position(|h| h.id() == device.id) {
                Some(i) => Some(std::mem::replace(&mut handles[i], handle)),
                None => {
                    handles.push(handle);
                    None
                }
            }
        };
        if let Some(old) = replaced {
            old.release();
        }
        debug!("connected {} ({})", device.id, device.model);

        if self.cancel.is_cancelled() {
            return;
        }
        self.events.send_unless(Event::Connect(device), &self.cancel);
    }

    fn disconnect(&self, id: DeviceId) {
        let removed = {
            let mut handles = self.handles_mut();
            handles
                .iter()
                .position(|h| h.id() == id)
                .map(|i| handles.remove(i))
        };
        if let Some(handle) = removed {
            handle.release();
        }
        debug!("disconnected {id}");

        self.events.send_unless(Event::Disconnect(id), &self.cancel);
    }

    fn find(&self, id: &str) -> Result<Arc<DeviceHandle>> {
        self.handles()
            .iter()
            .find(|handle| handle.id() == id)
            .cloned()
            .ok_or_else(|| Error::JoystickNotFound(id.to_string()))
    }

    fn report(&self, error: Error) {
        warn!("{error}");
        self.errors.send_unless(error, &self.cancel);
    }

    fn handles(&self) -> RwLockReadGuard<'_, Vec<Arc<DeviceHandle>>> {
        self.handles.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn handles_mut(&self) -> RwLockWriteGuard<'_, Vec<Arc<DeviceHandle>>> {
        self.handles.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cleans a raw entry name and keeps it only if it names a device node.
fn device_name(raw: &[u8], prefix: &str) -> Option<DeviceId> {
    let cleaned: Vec<u8> = raw.iter().copied().filter(|b| *b != 0).collect();
    let name = String::from_utf8(cleaned).ok()?;
    if name.is_empty() || !name.starts_with(prefix) {
        return None;
    }
    Some(name)
}
