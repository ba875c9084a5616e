//! Event bus for Linux joysticks.
//!
//! A [`Bus`] discovers `js*` nodes as they appear and disappear, decodes the
//! records of subscribed devices and fans every event out to any number of
//! filtered [`EventChannel`]s.
//!
//! ```no_run
//! use padbus::{filter, Bus, BusOptions, Event};
//!
//! let (bus, errors) = Bus::new(BusOptions::default())?;
//! std::thread::spawn(move || {
//!     for error in errors.iter() {
//!         log::error!("{error}");
//!     }
//! });
//!
//! if let Some(channel) = bus.new_event_channel(vec![filter::live_only()]) {
//!     for event in channel.iter() {
//!         if let Event::Connect(device) = &event {
//!             bus.subscribe(&device.id)?;
//!         }
//!         println!("{event:?}");
//!     }
//! }
//! # Ok::<(), padbus::Error>(())
//! ```

mod backend;
mod bus;
mod cancel;
mod channel;
mod decode;
mod device;
mod error;
pub mod filter;
#[cfg(target_os = "linux")]
mod linux;
mod notifier;
mod options;
mod platform;
mod stream;
mod types;

#[cfg(test)]
mod fake;

pub use crossbeam_channel::RecvTimeoutError;

pub use crate::backend::{
    Backend, DeviceStream, DirectoryWatch, Notification, WatchKind, AXIS_MAP_LEN, BUTTON_MAP_LEN,
};
pub use crate::bus::Bus;
pub use crate::channel::EventChannel;
pub use crate::decode::{decode_record, RECORD_SIZE};
pub use crate::error::{Error, Result};
pub use crate::filter::Filter;
#[cfg(target_os = "linux")]
pub use crate::linux::{InotifyWatch, JoystickNode, LinuxBackend};
pub use crate::options::{BusOptions, DEFAULT_DEVICE_DIR, DEFAULT_NAME_PREFIX};
pub use crate::stream::ErrorStream;
pub use crate::types::{ControlEvent, ControlFlags, ControlKind, Device, DeviceId, Event, EventKind};
