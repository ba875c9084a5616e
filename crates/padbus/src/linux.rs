//! Linux joystick (`/dev/input/js*`) backend.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::backend::{
    Backend, DeviceStream, DirectoryWatch, Notification, WatchKind, AXIS_MAP_LEN, BUTTON_MAP_LEN,
};
use crate::error::{Error, Result};

const NAME_LEN: usize = 128;

/// Joystick requests from `linux/joystick.h`. Buffer requests take their
/// size from the slice they are given.
#[allow(unreachable_pub)]
mod js_ioctl {
    // #define JSIOCGVERSION  _IOR('j', 0x01, __u32)
    nix::ioctl_read!(version, b'j', 0x01, u32);
    // #define JSIOCGAXES     _IOR('j', 0x11, __u8)
    nix::ioctl_read!(axes, b'j', 0x11, u8);
    // #define JSIOCGBUTTONS  _IOR('j', 0x12, __u8)
    nix::ioctl_read!(buttons, b'j', 0x12, u8);
    // #define JSIOCGNAME(len) _IOC(_IOC_READ, 'j', 0x13, len)
    nix::ioctl_read_buf!(name, b'j', 0x13, u8);
    // #define JSIOCGAXMAP    _IOR('j', 0x32, __u8[ABS_CNT])
    nix::ioctl_read_buf!(axis_map, b'j', 0x32, u8);
    // #define JSIOCGBTNMAP   _IOR('j', 0x34, __u16[KEY_MAX - BTN_MISC + 1])
    nix::ioctl_read_buf!(button_map, b'j', 0x34, u16);
}

/// Host backend: joystick nodes queried through ioctls and a directory
/// watch provided by inotify.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxBackend;

impl Backend for LinuxBackend {
    type Stream = JoystickNode;
    type Watch = InotifyWatch;

    fn open(&self, path: &Path) -> io::Result<JoystickNode> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(JoystickNode { file })
    }

    fn watch(&self, dir: &Path) -> Result<InotifyWatch> {
        let (tx, rx) = unbounded();
        let mut watcher = notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| {
                let _ = tx.send(res);
            },
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(InotifyWatch {
            _watcher: watcher,
            rx,
        })
    }
}

/// An open joystick node.
pub struct JoystickNode {
    file: File,
}

impl JoystickNode {
    fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Read for JoystickNode {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

// SAFETY (all queries): `fd` stays open for the lifetime of `self` and every
// destination is a live local of the type or length the request declares.
impl DeviceStream for JoystickNode {
    fn query_name(&self) -> io::Result<String> {
        let mut buf = [0u8; NAME_LEN];
        unsafe { js_ioctl::name(self.fd(), &mut buf) }?;
        let end = buf.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }

    fn query_button_count(&self) -> io::Result<u8> {
        let mut count = 0u8;
        unsafe { js_ioctl::buttons(self.fd(), &mut count) }?;
        Ok(count)
    }

    fn query_axis_count(&self) -> io::Result<u8> {
        let mut count = 0u8;
        unsafe { js_ioctl::axes(self.fd(), &mut count) }?;
        Ok(count)
    }

    fn query_version(&self) -> io::Result<u32> {
        let mut version = 0u32;
        unsafe { js_ioctl::version(self.fd(), &mut version) }?;
        Ok(version)
    }

    fn query_button_map(&self) -> io::Result<[u16; BUTTON_MAP_LEN]> {
        let mut map = [0u16; BUTTON_MAP_LEN];
        unsafe { js_ioctl::button_map(self.fd(), &mut map) }?;
        Ok(map)
    }

    fn query_axis_map(&self) -> io::Result<[u8; AXIS_MAP_LEN]> {
        let mut map = [0u8; AXIS_MAP_LEN];
        unsafe { js_ioctl::axis_map(self.fd(), &mut map) }?;
        Ok(map)
    }
}

/// Watch on the device directory. Dropping it removes the inotify watch.
pub struct InotifyWatch {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<notify::Event>>,
}

impl DirectoryWatch for InotifyWatch {
    fn read(&mut self, timeout: Duration) -> Result<Vec<Notification>> {
        let first = match self.rx.recv_timeout(timeout) {
            Ok(first) => first,
            Err(RecvTimeoutError::Timeout) => return Ok(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::Watch(notify::Error::generic("watcher stopped")))
            }
        };

        let mut batch = Vec::new();
        for result in std::iter::once(first).chain(self.rx.try_iter()) {
            let event = result?;
            let Some(kind) = watch_kind(event.kind) else {
                continue;
            };
            batch.extend(event.paths.iter().filter_map(|path| {
                path.file_name()
                    .map(|name| Notification::new(kind, name.as_bytes()))
            }));
        }
        Ok(batch)
    }
}

fn watch_kind(kind: EventKind) -> Option<WatchKind> {
    match kind {
        EventKind::Create(_) => Some(WatchKind::Create),
        EventKind::Remove(_) => Some(WatchKind::Delete),
        EventKind::Modify(_) => Some(WatchKind::Modify),
        _ => None,
    }
}
