use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use log::debug;

use crate::backend::{open_with_retry, Backend, DeviceStream};
use crate::cancel::CancelToken;
use crate::decode::{decode_record, RECORD_SIZE};
use crate::error::{Error, Result};
use crate::options::BusOptions;
use crate::stream::Outlet;
use crate::types::{Device, DeviceId, Event};

/// Read state of a handle. The read loop owns the open stream and closes
/// it when it exits.
enum Session {
    Idle,
    /// Subscribed; the token stops the running read loop.
    Reading(CancelToken),
    /// Replaced or removed from the registry. Never subscribes again.
    Retired,
}

/// One attached joystick node.
pub(crate) struct DeviceHandle {
    device: Device,
    path: PathBuf,
    session: Mutex<Session>,
}

impl DeviceHandle {
    /// Opens the node, queries its capabilities and closes it again.
    pub(crate) fn connect<B: Backend>(
        backend: &B,
        id: DeviceId,
        path: PathBuf,
        options: &BusOptions,
    ) -> Result<Self> {
        let stream = open_with_retry(backend, &path, options)?;
        let device = query_device(&stream, id)?;
        Ok(Self {
            device,
            path,
            session: Mutex::new(Session::Idle),
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.device.id
    }

    pub(crate) fn device(&self) -> &Device {
        &self.device
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        matches!(*self.session(), Session::Reading(_))
    }

    /// Re-opens the node and starts forwarding its records onto `events`.
    ///
    /// A released handle answers `JoystickNotFound`: a caller that found it
    /// in the registry lost a race with its replacement or removal.
    pub(crate) fn subscribe<B: Backend>(
        &self,
        backend: &B,
        events: &Outlet<Event>,
        options: &BusOptions,
    ) -> Result<()> {
        let mut session = self.session();
        match *session {
            Session::Idle => {}
            Session::Reading(_) => return Err(Error::AlreadySubscribed),
            Session::Retired => return Err(Error::JoystickNotFound(self.device.id.clone())),
        }

        let stream = open_with_retry(backend, &self.path, options)?;
        let token = CancelToken::new();
        let id = self.device.id.clone();
        let events = events.clone();
        let loop_token = token.clone();
        thread::spawn(move || read_loop(stream, &id, &events, &loop_token));

        *session = Session::Reading(token);
        debug!("subscribed to {} ({})", self.device.id, self.path().display());
        Ok(())
    }

    /// Stops the read loop. The loop notices on its next iteration, so the
    /// stream stays open until the device reports another record or fails.
    pub(crate) fn unsubscribe(&self) -> Result<()> {
        let mut session = self.session();
        let Session::Reading(token) = &*session else {
            return Err(Error::AlreadyUnsubscribed);
        };
        token.cancel();
        *session = Session::Idle;
        debug!("unsubscribed from {}", self.device.id);
        Ok(())
    }

    /// Cancels the read loop if one is running and retires the handle.
    pub(crate) fn release(&self) {
        let previous = std::mem::replace(&mut *self.session(), Session::Retired);
        if let Session::Reading(token) = previous {
            token.cancel();
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_loop<S: Read>(mut stream: S, id: &str, events: &Outlet<Event>, token: &CancelToken) {
    let mut record = [0u8; RECORD_SIZE];
    loop {
        if token.is_cancelled() {
            break;
        }
        // A failing read usually means the node went away; the notifier
        // reports the disconnect from the directory watch.
        if let Err(e) = stream.read_exact(&mut record) {
            debug!("read loop for {id} ended: {e}");
            break;
        }
        if token.is_cancelled() {
            break;
        }
        let event = Event::Control {
            id: id.to_string(),
            event: decode_record(&record),
        };
        if !events.send_unless(event, token) {
            break;
        }
    }
}

fn query_device<S: DeviceStream>(stream: &S, id: DeviceId) -> Result<Device> {
    let query_err = |source: io::Error| Error::Query {
        id: id.clone(),
        source,
    };
    let model = stream.query_name().map_err(query_err)?;
    let buttons = stream.query_button_count().map_err(query_err)?;
    let axes = stream.query_axis_count().map_err(query_err)?;
    let driver_version = stream.query_version().map_err(query_err)?;
    let button_map = stream.query_button_map().map_err(query_err)?;
    let axis_map = stream.query_axis_map().map_err(query_err)?;

    Ok(Device {
        button_count: usize::from(buttons),
        button_map: meaningful_entries(&button_map, buttons),
        axis_count: usize::from(axes),
        axis_map: meaningful_entries(&axis_map, axes),
        model,
        driver_version,
        id,
    })
}

/// Extracts the used part of a driver map table.
///
/// Unused slots are zero. Slot 0 is always kept because code 0 is a valid
/// mapping there (`ABS_X` for axes).
pub(crate) fn meaningful_entries<T>(table: &[T], count: u8) -> Vec<u16>
where
    T: Copy + Default + PartialEq + Into<u16>,
{
    if count == 0 {
        return Vec::new();
    }
    table
        .iter()
        .enumerate()
        .filter(|(i, code)| *i == 0 || **code != T::default())
        .map(|(_, code)| (*code).into())
        .collect()
}
