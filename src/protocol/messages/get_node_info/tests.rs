use super::*;
use crate::protocol::messages::node_status::{Health, Mode};

fn sample() -> GetNodeInfoResponse {
    let software = SoftwareVersion {
        major: 1,
        minor: 2,
        optional_field_flags: SoftwareVersion::FLAG_VCS_COMMIT,
        vcs_commit: 0xDEAD_BEEF,
        image_crc: 0,
    };
    let unique_id: [u8; 16] = core::array::from_fn(|i| 0xA0 + i as u8);
    let mut hardware = HardwareVersion::new(3, 4, unique_id);
    hardware.set_certificate_of_authenticity(&[0x11, 0x22]).unwrap();
    GetNodeInfoResponse {
        status: NodeStatus {
            uptime_sec: 12,
            health: Health::Ok,
            mode: Mode::Operational,
            sub_mode: 0,
            vendor_specific_status_code: 0,
        },
        info: NodeInfo::new("org.korri.test", software, hardware).unwrap(),
    }
}

#[test]
fn test_response_layout() {
    let response = sample();
    let mut buffer = [0u8; GetNodeInfoResponse::MAX_SIZE];
    let len = response.to_payload(&mut buffer).unwrap();
    assert_eq!(len, 7 + 15 + 19 + 2 + 14);
    assert_eq!(len, response.payload_len());

    // software version right after the status
    assert_eq!(&buffer[7..10], &[1, 2, 1]);
    assert_eq!(&buffer[10..14], &[0xEF, 0xBE, 0xAD, 0xDE]);
    // hardware version
    assert_eq!(&buffer[22..24], &[3, 4]);
    assert_eq!(buffer[24], 0xA0);
    assert_eq!(buffer[39], 0xAF);
    assert_eq!(&buffer[40..43], &[2, 0x11, 0x22]);
    // name, no length prefix
    assert_eq!(&buffer[43..len], b"org.korri.test");
}

#[test]
fn test_response_decode() {
    let response = sample();
    let mut buffer = [0u8; GetNodeInfoResponse::MAX_SIZE];
    let len = response.to_payload(&mut buffer).unwrap();
    let decoded = GetNodeInfoResponse::from_payload(&buffer[..len]).unwrap();
    assert_eq!(decoded, response);
    assert_eq!(decoded.info.name_str(), Some("org.korri.test"));
    assert_eq!(
        decoded.info.hardware_version.certificate_of_authenticity(),
        &[0x11, 0x22]
    );
}

#[test]
fn test_name_too_long() {
    let name = [b'x'; MAX_NAME_LEN + 1];
    let mut info = NodeInfo::default();
    assert_eq!(
        info.set_name(&name),
        Err(SerializationError::FieldTooLong {
            field: "name",
            len: 81,
            max: 80
        })
    );
    assert!(info.set_name(&name[..MAX_NAME_LEN]).is_ok());
    assert_eq!(info.name().len(), 80);
}

#[test]
fn test_truncated_response_rejected() {
    let response = sample();
    let mut buffer = [0u8; GetNodeInfoResponse::MAX_SIZE];
    response.to_payload(&mut buffer).unwrap();
    // cut inside the unique ID
    assert!(matches!(
        GetNodeInfoResponse::from_payload(&buffer[..30]),
        Err(DeserializationError::BitRead(_))
    ));
}

#[test]
fn test_buffer_too_small() {
    let response = sample();
    let mut buffer = [0u8; 20];
    assert!(matches!(
        response.to_payload(&mut buffer),
        Err(SerializationError::BufferTooSmall { .. })
    ));
}

#[test]
fn test_request_is_empty() {
    let mut buffer = [0u8; 4];
    assert_eq!(GetNodeInfoRequest.to_payload(&mut buffer).unwrap(), 0);
    assert_eq!(GetNodeInfoRequest::from_payload(&[]).unwrap(), GetNodeInfoRequest);
    assert_eq!(GetNodeInfoRequest::DESCRIPTOR, GetNodeInfoResponse::DESCRIPTOR);
    assert_eq!(GET_NODE_INFO.max_size, 377);
}
