//! Packet Tests
//!
//! Tests for building outbound packets and decoding them as a client would.

use bytes::Bytes;
use traci_manager::protocol::{
    framed_len, CommandTable, Domain, Point2D, Response, SimTimeResponse, StatusCode,
    StatusResponse, TraciCmd, TraciPacket, TraciValue, VersionResponse, PACKET_LENGTH_FIELD,
};
use traci_manager::TraciError;

// =============================================================================
// Helper Functions
// =============================================================================

/// Strip and check the packet length field
fn body_of(bytes: &Bytes) -> Bytes {
    let total = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    assert_eq!(total, bytes.len(), "length field must count the whole packet");
    bytes.slice(PACKET_LENGTH_FIELD..)
}

fn decode(bytes: &Bytes) -> Vec<Response> {
    Response::decode_all(&CommandTable::default(), body_of(bytes)).unwrap()
}

// =============================================================================
// Length Field
// =============================================================================

#[test]
fn test_length_covers_appended_commands() {
    let small = vec![0x02u8; 10];
    let large = vec![0x02u8; 400];

    let mut packet = TraciPacket::create();
    packet.add_command(&small).unwrap();
    packet.add_command(&large).unwrap();
    packet.add_ok_status(0x02).unwrap();

    // status body: id + code + empty string
    let expected = PACKET_LENGTH_FIELD + framed_len(10) + framed_len(400) + framed_len(6);
    let bytes = packet.send().unwrap();
    assert_eq!(bytes.len(), expected);
    body_of(&bytes);
}

#[test]
fn test_empty_packet_is_four_bytes() {
    let packet = TraciPacket::create();
    assert!(packet.is_empty());
    assert_eq!(&packet.send().unwrap()[..], &[0, 0, 0, 4]);
}

#[test]
fn test_send_status_is_finalized() {
    let packet = TraciPacket::send_status(0x7F, StatusCode::Err, "bye").unwrap();
    assert!(packet.is_finalized());

    let bytes = packet.send().unwrap();
    assert_eq!(
        &bytes[..],
        &[0, 0, 0, 14, 10, 0x7F, 0xFF, 0, 0, 0, 3, b'b', b'y', b'e']
    );
}

#[test]
fn test_finalized_packet_rejects_changes() {
    let mut packet = TraciPacket::create();
    packet.add_ok_status(0x00).unwrap();
    packet.finalize_packet().unwrap();
    let len = packet.len();

    assert!(matches!(
        packet.add_ok_status(0x00),
        Err(TraciError::PacketFinalized)
    ));
    assert!(matches!(
        packet.add_command(&[0x02]),
        Err(TraciError::PacketFinalized)
    ));
    assert_eq!(packet.len(), len);

    // finalizing again changes nothing
    packet.finalize_packet().unwrap();
    body_of(&packet.send().unwrap());
}

#[test]
fn test_failed_wrap_appends_nothing() {
    let mut packet = TraciPacket::create();
    let before = packet.len();

    let result = packet.add_get_value(
        0xae,
        0xbe,
        0x42,
        "1",
        TraciValue::Polygon(vec![Point2D::default(); 300]),
    );
    assert!(result.is_err());
    assert_eq!(packet.len(), before);
}

// =============================================================================
// Decoded Replies
// =============================================================================

#[test]
fn test_get_version_reply() {
    let mut packet = TraciPacket::create();
    packet
        .wrap_version_response(&VersionResponse {
            status: StatusResponse::ok(0x00),
            version_id: 20,
            version_string: "traci-manager test".to_string(),
        })
        .unwrap();

    let responses = decode(&packet.send().unwrap());
    assert_eq!(responses.len(), 1);
    match &responses[0] {
        Response::Version(v) => {
            assert!(v.status.is_ok());
            assert_eq!(v.version_id, 20);
            assert_eq!(v.version_string, "traci-manager test");
        }
        other => panic!("Expected version response, got {:?}", other),
    }
}

#[test]
fn test_sim_step_reply() {
    let mut packet = TraciPacket::create();
    packet
        .wrap_sim_time_response(&SimTimeResponse {
            status: StatusResponse::ok(0x02),
            data: TraciValue::Integer(0),
        })
        .unwrap();

    let bytes = packet.send().unwrap();
    assert_eq!(
        &bytes[..],
        &[0, 0, 0, 18, 7, 0x02, 0x00, 0, 0, 0, 0, 7, 0x02, 0x09, 0, 0, 0, 0]
    );

    match &decode(&bytes)[0] {
        Response::SimTime(r) => assert_eq!(r.data, TraciValue::Integer(0)),
        other => panic!("Expected sim time response, got {:?}", other),
    }
}

#[test]
fn test_get_value_reply() {
    let table = CommandTable::default();
    let get = table.id_of(TraciCmd::Get(Domain::Person));
    let response = table.id_of(TraciCmd::GetResponse(Domain::Person));

    let mut packet = TraciPacket::create();
    packet
        .add_get_value(get, response, 0x42, "7", TraciValue::Position2D(Point2D::new(1.0, 2.0)))
        .unwrap();

    match &decode(&packet.send().unwrap())[0] {
        Response::Get(r) => {
            assert_eq!(r.status.cmd_id, get);
            assert_eq!(r.response_id, response);
            assert_eq!(r.variable_id, 0x42);
            assert_eq!(r.element_id, "7");
            assert_eq!(r.value, TraciValue::Position2D(Point2D::new(1.0, 2.0)));
        }
        other => panic!("Expected GET response, got {:?}", other),
    }
}

#[test]
fn test_error_status_has_no_payload() {
    let mut packet = TraciPacket::create();
    packet.add_err_status(0x02, "no scenario loaded").unwrap();
    packet.add_status(0xd0, StatusCode::NotImplemented, "").unwrap();

    let responses = decode(&packet.send().unwrap());
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].status().code, StatusCode::Err);
    assert_eq!(responses[0].status().description, "no scenario loaded");
    assert_eq!(responses[1].status().code, StatusCode::NotImplemented);
}
