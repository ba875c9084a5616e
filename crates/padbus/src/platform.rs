use crate::error::{Error, Result};
use crate::notifier::Notifier;
use crate::options::BusOptions;
use crate::stream::Outlet;
use crate::types::Event;

/// Starts the notifier implementation of the host platform.
#[cfg(target_os = "linux")]
pub(crate) fn start_notifier(
    options: BusOptions,
    events: Outlet<Event>,
    errors: Outlet<Error>,
) -> Result<Box<dyn Notifier>> {
    use crate::linux::LinuxBackend;
    use crate::notifier::DirectoryNotifier;

    let notifier = DirectoryNotifier::start(LinuxBackend, options, events, errors)?;
    Ok(Box::new(notifier))
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn start_notifier(
    _options: BusOptions,
    _events: Outlet<Event>,
    _errors: Outlet<Error>,
) -> Result<Box<dyn Notifier>> {
    Err(Error::OsNotSupported)
}
