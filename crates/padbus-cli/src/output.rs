use padbus::{ControlEvent, ControlKind, Device, Event};

fn version(raw: u32) -> String {
    format!("{}.{}.{}", raw >> 16, (raw >> 8) & 0xff, raw & 0xff)
}

fn control(event: &ControlEvent) -> String {
    let category = if event.kind.contains(ControlKind::Button) {
        "button"
    } else if event.kind.contains(ControlKind::Axis) {
        "axis"
    } else {
        "control"
    };
    let initial = if event.kind.is_initial() {
        " (initial)"
    } else {
        ""
    };
    format!(
        "{category} {} = {} at {}ms{initial}",
        event.index, event.value, event.timestamp
    )
}

/// One-line summary of a device, as printed by `list`.
pub(crate) fn describe_device(device: &Device) -> String {
    format!(
        "{}: {} ({} buttons, {} axes, driver {})",
        device.id,
        device.model,
        device.button_count,
        device.axis_count,
        version(device.driver_version)
    )
}

pub(crate) fn describe_event(event: &Event) -> String {
    match event {
        Event::Connect(device) => format!("connected {}", describe_device(device)),
        Event::Disconnect(id) => format!("disconnected {id}"),
        Event::Control { id, event } => format!("{id} {}", control(event)),
    }
}
