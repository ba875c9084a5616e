use std::fmt;

/// Identifier of an attached device, taken from its node name (e.g. `js0`).
pub type DeviceId = String;

/// Capability snapshot of a controller, queried once when it is connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    pub model: String,
    pub button_count: usize,
    /// Driver button codes in report order.
    pub button_map: Vec<u16>,
    pub axis_count: usize,
    /// Driver axis codes in report order.
    pub axis_map: Vec<u16>,
    pub driver_version: u32,
}

/// A single control category reported by the joystick protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Button,
    Axis,
    /// Marks a synthetic event replaying the current state after open.
    InitialState,
}

impl ControlKind {
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            ControlKind::Button => 0x01,
            ControlKind::Axis => 0x02,
            ControlKind::InitialState => 0x08,
        }
    }
}

/// Set of [`ControlKind`] flags carried by a decoded record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ControlFlags(u8);

impl ControlFlags {
    /// Create a flag set from a slice of kinds.
    pub fn new(kinds: &[ControlKind]) -> Self {
        Self(kinds.iter().fold(0, |bits, kind| bits | kind.bit()))
    }

    /// Create an empty flag set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wrap the raw type byte of a record. Unknown bits are kept.
    pub const fn from_value(value: u8) -> Self {
        Self(value)
    }

    /// Raw type byte.
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, kind: ControlKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, kind: ControlKind) {
        self.0 |= kind.bit();
    }

    #[inline]
    pub fn remove(&mut self, kind: ControlKind) {
        self.0 &= !kind.bit();
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether the record replays state captured when the device was opened.
    #[inline]
    pub fn is_initial(self) -> bool {
        self.contains(ControlKind::InitialState)
    }
}

impl fmt::Debug for ControlFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for kind in [ControlKind::Button, ControlKind::Axis, ControlKind::InitialState] {
            if self.contains(kind) {
                set.entry(&kind);
            }
        }
        set.finish()
    }
}

/// One decoded hardware record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    /// Driver timestamp in milliseconds.
    pub timestamp: u32,
    pub kind: ControlFlags,
    pub index: u8,
    pub value: i16,
}

/// Discriminant of [`Event`], handy for filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    Control,
}

/// Events delivered to subscriber channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A device has been discovered and queried.
    Connect(Device),
    /// A device node has been removed.
    Disconnect(DeviceId),
    /// A subscribed device reported a control change.
    Control { id: DeviceId, event: ControlEvent },
}

impl Event {
    /// ID of the device the event originates from.
    pub fn device_id(&self) -> &str {
        match self {
            Event::Connect(device) => &device.id,
            Event::Disconnect(id) | Event::Control { id, .. } => id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connect(_) => EventKind::Connect,
            Event::Disconnect(_) => EventKind::Disconnect,
            Event::Control { .. } => EventKind::Control,
        }
    }
}
