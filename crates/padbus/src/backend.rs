//! Platform collaborators used by the notifier and device handles.
//!
//! A [`Backend`] bundles the three facilities the bus needs from the host:
//! opening a raw device stream, listing the device directory and watching it
//! for changes. Capability queries are issued against an open
//! [`DeviceStream`].

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};
use crate::options::BusOptions;

/// Entries in the driver's button map table.
pub const BUTTON_MAP_LEN: usize = 768;

/// Entries in the driver's axis map table.
pub const AXIS_MAP_LEN: usize = 64;

/// An open joystick node.
pub trait DeviceStream: io::Read + Send + 'static {
    fn query_name(&self) -> io::Result<String>;
    fn query_button_count(&self) -> io::Result<u8>;
    fn query_axis_count(&self) -> io::Result<u8>;
    fn query_version(&self) -> io::Result<u32>;
    fn query_button_map(&self) -> io::Result<[u16; BUTTON_MAP_LEN]>;
    fn query_axis_map(&self) -> io::Result<[u8; AXIS_MAP_LEN]>;
}

/// Kind of change reported for a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    Create,
    Delete,
    Modify,
}

/// A single directory change with the raw entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: WatchKind,
    /// Entry name as delivered by the watch primitive, possibly NUL padded.
    pub name: Vec<u8>,
}

impl Notification {
    pub fn new(kind: WatchKind, name: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// A live watch on the device directory. Dropping it removes the watch.
pub trait DirectoryWatch: Send + 'static {
    /// Blocks for at most `timeout` until a batch of notifications is
    /// available. An empty batch means the timeout elapsed.
    fn read(&mut self, timeout: Duration) -> Result<Vec<Notification>>;
}

/// Host facilities required by the bus.
pub trait Backend: Send + Sync + 'static {
    type Stream: DeviceStream;
    type Watch: DirectoryWatch;

    fn open(&self, path: &Path) -> io::Result<Self::Stream>;

    fn watch(&self, dir: &Path) -> Result<Self::Watch>;

    /// Names of the entries currently present in `dir`.
    fn list(&self, dir: &Path) -> io::Result<Vec<OsString>> {
        std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect()
    }
}

/// Opens `path`, retrying while the node is not yet accessible.
///
/// Freshly created nodes are briefly owned by root until udev applies the
/// group permissions, so only `PermissionDenied` is retried.
pub(crate) fn open_with_retry<B: Backend>(
    backend: &B,
    path: &Path,
    options: &BusOptions,
) -> Result<B::Stream> {
    let attempts = options.open_attempts.max(1);
    let mut attempt = 1;
    loop {
        match backend.open(path) {
            Ok(stream) => return Ok(stream),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied && attempt < attempts => {
                debug!(
                    "open {} denied (attempt {attempt}/{attempts}), retrying",
                    path.display()
                );
                attempt += 1;
                thread::sleep(options.open_backoff());
            }
            Err(source) => {
                return Err(Error::Open {
                    path: path.to_owned(),
                    source,
                })
            }
        }
    }
}
