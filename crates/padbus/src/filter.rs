//! Ready-made subscriber filters.
//!
//! A channel delivers an event only if every one of its filters accepts it.

use crate::types::{ControlKind, DeviceId, Event};

/// Predicate deciding whether a subscriber receives an event.
pub type Filter = Box<dyn Fn(&Event) -> bool + Send + Sync>;

/// Wraps a closure into a [`Filter`].
pub fn from_fn<F>(f: F) -> Filter
where
    F: Fn(&Event) -> bool + Send + Sync + 'static,
{
    Box::new(f)
}

/// Accepts control events only.
pub fn controls() -> Filter {
    from_fn(|event| matches!(event, Event::Control { .. }))
}

/// Accepts connect and disconnect events only.
pub fn lifecycle() -> Filter {
    from_fn(|event| matches!(event, Event::Connect(_) | Event::Disconnect(_)))
}

/// Accepts events of a single device.
pub fn device(id: impl Into<DeviceId>) -> Filter {
    let id = id.into();
    from_fn(move |event| event.device_id() == id)
}

/// Accepts control events carrying `kind`.
pub fn control_kind(kind: ControlKind) -> Filter {
    from_fn(move |event| match event {
        Event::Control { event, .. } => event.kind.contains(kind),
        _ => false,
    })
}

/// Rejects state replayed when a device is opened.
pub fn live_only() -> Filter {
    from_fn(|event| match event {
        Event::Control { event, .. } => !event.kind.is_initial(),
        _ => true,
    })
}
