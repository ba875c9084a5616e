use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::DeviceId;

/// Error type for bus, notifier and device operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No notifier implementation exists for the host platform.
    #[error("os is not supported (yet)")]
    OsNotSupported,
    /// The bus has been closed and no longer owns a notifier.
    #[error("notifier not initialized")]
    NotifierNotInitialized,
    /// The device already has an active read loop.
    #[error("joystick is already subscribed")]
    AlreadySubscribed,
    /// The device has no active read loop.
    #[error("joystick is already unsubscribed")]
    AlreadyUnsubscribed,
    /// No registered device carries the requested ID.
    #[error("joystick with id '{0}' was not found")]
    JoystickNotFound(DeviceId),
    /// Listing the device directory failed.
    #[error("failed to list {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Opening a device stream failed.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A capability query against the device driver failed.
    #[error("capability query for '{id}' failed: {source}")]
    Query {
        id: DeviceId,
        #[source]
        source: io::Error,
    },
    /// Setting up or reading the directory watch failed.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// Convenient result alias for bus operations.
pub type Result<T> = std::result::Result<T, Error>;
