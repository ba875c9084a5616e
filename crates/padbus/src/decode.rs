use crate::types::{ControlEvent, ControlFlags};

/// Size of one joystick record: `u32` time, `i16` value, `u8` type, `u8` number.
pub const RECORD_SIZE: usize = 8;

/// Decodes a little-endian joystick record.
pub fn decode_record(record: &[u8; RECORD_SIZE]) -> ControlEvent {
    ControlEvent {
        timestamp: u32::from_le_bytes([record[0], record[1], record[2], record[3]]),
        value: i16::from_le_bytes([record[4], record[5]]),
        kind: ControlFlags::from_value(record[6]),
        index: record[7],
    }
}

/// Encodes an event back into its wire layout.
#[cfg(test)]
pub(crate) fn encode_record(event: &ControlEvent) -> [u8; RECORD_SIZE] {
    let mut record = [0u8; RECORD_SIZE];
    record[..4].copy_from_slice(&event.timestamp.to_le_bytes());
    record[4..6].copy_from_slice(&event.value.to_le_bytes());
    record[6] = event.kind.value();
    record[7] = event.index;
    record
}
