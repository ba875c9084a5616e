//! In-memory backend used by the unit tests.

use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::backend::{
    Backend, DeviceStream, DirectoryWatch, Notification, WatchKind, AXIS_MAP_LEN, BUTTON_MAP_LEN,
};
use crate::decode::{encode_record, RECORD_SIZE};
use crate::error::{Error, Result};
use crate::types::ControlEvent;

/// Description of a simulated joystick node.
#[derive(Debug)]
pub(crate) struct FakeDevice {
    name: String,
    model: String,
    buttons: u8,
    axes: u8,
    version: u32,
    button_map: Vec<u16>,
    axis_map: Vec<u8>,
    deny_opens: u32,
    fail_query: bool,
    records: (Sender<[u8; RECORD_SIZE]>, Receiver<[u8; RECORD_SIZE]>),
}

impl FakeDevice {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            model: format!("Fake Pad {name}"),
            buttons: 2,
            axes: 2,
            version: 0x0002_0100,
            button_map: vec![0x130, 0x131],
            axis_map: vec![0x00, 0x01],
            deny_opens: 0,
            fail_query: false,
            records: unbounded(),
        }
    }

    pub(crate) fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub(crate) fn buttons(mut self, map: &[u16]) -> Self {
        self.buttons = u8::try_from(map.len()).unwrap_or(u8::MAX);
        self.button_map = map.to_vec();
        self
    }

    pub(crate) fn axes(mut self, map: &[u8]) -> Self {
        self.axes = u8::try_from(map.len()).unwrap_or(u8::MAX);
        self.axis_map = map.to_vec();
        self
    }

    /// The next `count` opens fail with `PermissionDenied`.
    pub(crate) fn deny_opens(mut self, count: u32) -> Self {
        self.deny_opens = count;
        self
    }

    pub(crate) fn failing_queries(mut self) -> Self {
        self.fail_query = true;
        self
    }

    fn stream(&self) -> FakeStream {
        let mut button_map = [0u16; BUTTON_MAP_LEN];
        for (slot, code) in button_map.iter_mut().zip(&self.button_map) {
            *slot = *code;
        }
        let mut axis_map = [0u8; AXIS_MAP_LEN];
        for (slot, code) in axis_map.iter_mut().zip(&self.axis_map) {
            *slot = *code;
        }
        FakeStream {
            model: self.model.clone(),
            buttons: self.buttons,
            axes: self.axes,
            version: self.version,
            button_map,
            axis_map,
            fail_query: self.fail_query,
            records: self.records.1.clone(),
        }
    }
}

pub(crate) struct FakeStream {
    model: String,
    buttons: u8,
    axes: u8,
    version: u32,
    button_map: [u16; BUTTON_MAP_LEN],
    axis_map: [u8; AXIS_MAP_LEN],
    fail_query: bool,
    records: Receiver<[u8; RECORD_SIZE]>,
}

impl FakeStream {
    fn check(&self) -> io::Result<()> {
        if self.fail_query {
            return Err(io::Error::other("ioctl failed"));
        }
        Ok(())
    }
}

impl Read for FakeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let record = self
            .records
            .recv()
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        let n = buf.len().min(RECORD_SIZE);
        buf[..n].copy_from_slice(&record[..n]);
        Ok(n)
    }
}

impl DeviceStream for FakeStream {
    fn query_name(&self) -> io::Result<String> {
        self.check()?;
        Ok(self.model.clone())
    }

    fn query_button_count(&self) -> io::Result<u8> {
        self.check()?;
        Ok(self.buttons)
    }

    fn query_axis_count(&self) -> io::Result<u8> {
        self.check()?;
        Ok(self.axes)
    }

    fn query_version(&self) -> io::Result<u32> {
        self.check()?;
        Ok(self.version)
    }

    fn query_button_map(&self) -> io::Result<[u16; BUTTON_MAP_LEN]> {
        self.check()?;
        Ok(self.button_map)
    }

    fn query_axis_map(&self) -> io::Result<[u8; AXIS_MAP_LEN]> {
        self.check()?;
        Ok(self.axis_map)
    }
}

pub(crate) struct FakeWatch {
    rx: Receiver<Notification>,
    state: Arc<State>,
}

impl Drop for FakeWatch {
    fn drop(&mut self) {
        self.state.live_watches.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DirectoryWatch for FakeWatch {
    fn read(&mut self, timeout: Duration) -> Result<Vec<Notification>> {
        match self.rx.recv_timeout(timeout) {
            Ok(first) => {
                let mut batch = vec![first];
                batch.extend(self.rx.try_iter());
                Ok(batch)
            }
            Err(RecvTimeoutError::Timeout) => Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Watch(notify::Error::generic("watch closed")))
            }
        }
    }
}

#[derive(Default)]
struct State {
    entries: Mutex<Vec<String>>,
    devices: Mutex<HashMap<String, FakeDevice>>,
    opens: Mutex<HashMap<String, u32>>,
    fail_list: AtomicBool,
    fail_watch: AtomicBool,
    /// Total opens seen at each `watch` call.
    watch_log: Mutex<Vec<u32>>,
    live_watches: AtomicUsize,
}

/// Backend whose directory, nodes and records are driven by the test.
#[derive(Clone)]
pub(crate) struct FakeBackend {
    state: Arc<State>,
    watch_tx: Sender<Notification>,
    watch_rx: Receiver<Notification>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        let (watch_tx, watch_rx) = unbounded();
        Self {
            state: Arc::new(State::default()),
            watch_tx,
            watch_rx,
        }
    }

    /// Adds a node to the directory without a notification.
    pub(crate) fn attach(&self, device: FakeDevice) {
        if let Ok(mut entries) = self.state.entries.lock() {
            entries.push(device.name.clone());
        }
        if let Ok(mut devices) = self.state.devices.lock() {
            devices.insert(device.name.clone(), device);
        }
    }

    /// Adds an unrelated directory entry.
    pub(crate) fn add_entry(&self, name: &str) {
        if let Ok(mut entries) = self.state.entries.lock() {
            entries.push(name.to_string());
        }
    }

    /// Hot-plugs a node.
    pub(crate) fn plug(&self, device: FakeDevice) {
        let name = device.name.clone();
        self.attach(device);
        self.notify(Notification::new(WatchKind::Create, name));
    }

    /// Removes a node. Open streams start failing their reads.
    pub(crate) fn unplug(&self, name: &str) {
        if let Ok(mut entries) = self.state.entries.lock() {
            entries.retain(|entry| entry != name);
        }
        if let Ok(mut devices) = self.state.devices.lock() {
            devices.remove(name);
        }
        self.notify(Notification::new(WatchKind::Delete, name));
    }

    pub(crate) fn notify(&self, notification: Notification) {
        let _ = self.watch_tx.send(notification);
    }

    /// Queues a record on every open stream of `name`.
    pub(crate) fn push(&self, name: &str, event: &ControlEvent) {
        if let Ok(devices) = self.state.devices.lock() {
            if let Some(device) = devices.get(name) {
                let _ = device.records.0.send(encode_record(event));
            }
        }
    }

    pub(crate) fn fail_list(&self) {
        self.state.fail_list.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_watch(&self) {
        self.state.fail_watch.store(true, Ordering::SeqCst);
    }

    /// Opens of all nodes counted at the moment each watch was started.
    pub(crate) fn opens_before_watch(&self) -> Vec<u32> {
        self.state
            .watch_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Watches started and not yet dropped.
    pub(crate) fn live_watches(&self) -> usize {
        self.state.live_watches.load(Ordering::SeqCst)
    }

    pub(crate) fn open_count(&self, name: &str) -> u32 {
        self.state
            .opens
            .lock()
            .map(|opens| opens.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Backend for FakeBackend {
    type Stream = FakeStream;
    type Watch = FakeWatch;

    fn open(&self, path: &Path) -> io::Result<FakeStream> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Ok(mut opens) = self.state.opens.lock() {
            *opens.entry(name.clone()).or_default() += 1;
        }
        let mut devices = self
            .state
            .devices
            .lock()
            .map_err(|_| io::Error::other("poisoned"))?;
        let device = devices
            .get_mut(&name)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        if device.deny_opens > 0 {
            device.deny_opens -= 1;
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(device.stream())
    }

    fn watch(&self, _dir: &Path) -> Result<FakeWatch> {
        if self.state.fail_watch.load(Ordering::SeqCst) {
            return Err(Error::Watch(notify::Error::generic("watch refused")));
        }
        let opens = self
            .state
            .opens
            .lock()
            .map(|opens| opens.values().sum())
            .unwrap_or(0);
        if let Ok(mut log) = self.state.watch_log.lock() {
            log.push(opens);
        }
        self.state.live_watches.fetch_add(1, Ordering::SeqCst);
        Ok(FakeWatch {
            rx: self.watch_rx.clone(),
            state: self.state.clone(),
        })
    }

    fn list(&self, _dir: &Path) -> io::Result<Vec<OsString>> {
        if self.state.fail_list.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        let entries = self
            .state
            .entries
            .lock()
            .map_err(|_| io::Error::other("poisoned"))?;
        Ok(entries.iter().map(OsString::from).collect())
    }
}
