use super::*;

#[test]
fn test_wire_layout() {
    let status = NodeStatus {
        uptime_sec: 0x0102_0304,
        health: Health::Warning,
        mode: Mode::Maintenance,
        sub_mode: 5,
        vendor_specific_status_code: 0x1234,
    };
    let mut buffer = [0xFFu8; 16];
    assert_eq!(status.to_payload(&mut buffer).unwrap(), 7);
    // health 01, mode 010, sub-mode 101 packed MSB first into byte 4
    assert_eq!(&buffer[..7], &[0x04, 0x03, 0x02, 0x01, 0x55, 0x34, 0x12]);
    assert_eq!(NodeStatus::from_payload(&buffer[..7]).unwrap(), status);
}

#[test]
fn test_offline_critical() {
    let status = NodeStatus {
        uptime_sec: 60,
        health: Health::Critical,
        mode: Mode::Offline,
        sub_mode: 0,
        vendor_specific_status_code: 0,
    };
    let mut buffer = [0u8; 7];
    status.to_payload(&mut buffer).unwrap();
    assert_eq!(buffer[4], 0b11_111_000);
    assert_eq!(NodeStatus::from_payload(&buffer).unwrap(), status);
}

#[test]
fn test_buffer_too_small() {
    let mut buffer = [0u8; 6];
    assert_eq!(
        NodeStatus::default().to_payload(&mut buffer),
        Err(SerializationError::BufferTooSmall {
            needed: 7,
            available: 6
        })
    );
}

#[test]
fn test_short_payload_rejected() {
    assert_eq!(
        NodeStatus::from_payload(&[0u8; 5]),
        Err(DeserializationError::InvalidDataLength { len: 5 })
    );
}

#[test]
fn test_reserved_mode_rejected() {
    // mode bits = 100
    let bytes = [0, 0, 0, 0, 0b00_100_000, 0, 0];
    assert_eq!(
        NodeStatus::from_payload(&bytes),
        Err(DeserializationError::InvalidValue {
            field: "mode",
            value: 4
        })
    );
}

#[test]
fn test_descriptor() {
    assert_eq!(NodeStatus::DESCRIPTOR.id, 341);
    assert_eq!(NodeStatus::DESCRIPTOR.max_size, 7);
    assert!(NodeStatus::DESCRIPTOR.matches(crate::core::TransferType::Broadcast, 341));
}
