//! Command Tests
//!
//! Tests for opcode dispatch and command parsing.

use bytes::Bytes;
use traci_manager::config::CommandIds;
use traci_manager::protocol::{
    CmdType, Command, CommandTable, Domain, GetCommand, Point2D, RawCommand, SetCommand,
    TraciCmd, TraciValue,
};
use traci_manager::TraciError;

// =============================================================================
// Helper Functions
// =============================================================================

fn encode_parse(table: &CommandTable, command: Command) -> Command {
    let body = command.encode(table).unwrap();
    let raw = RawCommand::from_body(body).unwrap();
    Command::parse(table, &raw).unwrap()
}

fn raw(bytes: &'static [u8]) -> RawCommand {
    RawCommand::from_body(Bytes::from_static(bytes)).unwrap()
}

// =============================================================================
// Opcode Table
// =============================================================================

#[test]
fn test_control_opcodes() {
    let table = CommandTable::default();
    assert_eq!(table.lookup(0x00).unwrap(), TraciCmd::GetVersion);
    assert_eq!(table.lookup(0x01).unwrap(), TraciCmd::Load);
    assert_eq!(table.lookup(0x02).unwrap(), TraciCmd::SimStep);
    assert_eq!(table.lookup(0x03).unwrap(), TraciCmd::SetOrder);
    assert_eq!(table.lookup(0x75).unwrap(), TraciCmd::SendFile);
    assert_eq!(table.lookup(0x7F).unwrap(), TraciCmd::Close);
}

#[test]
fn test_domain_opcodes_share_offset() {
    let table = CommandTable::default();
    assert_eq!(table.id_of(TraciCmd::Get(Domain::Person)), 0xae);
    assert_eq!(table.id_of(TraciCmd::GetResponse(Domain::Person)), 0xbe);
    assert_eq!(table.id_of(TraciCmd::Set(Domain::Person)), 0xce);
    assert_eq!(table.id_of(TraciCmd::Get(Domain::Simulation)), 0xab);
    assert_eq!(table.lookup(0xab).unwrap().cmd_type(), CmdType::ValueGet);
}

#[test]
fn test_every_command_has_a_distinct_opcode() {
    let table = CommandTable::default();
    for cmd in TraciCmd::all() {
        assert_eq!(table.lookup(table.id_of(cmd)).unwrap(), cmd);
    }
}

#[test]
fn test_unknown_opcode() {
    let table = CommandTable::default();
    assert!(matches!(
        table.lookup(0x55),
        Err(TraciError::UnknownCommand(0x55))
    ));
}

#[test]
fn test_colliding_ids_are_refused() {
    let ids = CommandIds {
        set_simulation_state: 0xcc,
        set_gui_state: 0xcc,
    };
    assert!(matches!(CommandTable::new(ids), Err(TraciError::Config(_))));
}

#[test]
fn test_custom_ids_are_honored() {
    let ids = CommandIds {
        set_simulation_state: 0xcf,
        set_gui_state: 0xcc,
    };
    let table = CommandTable::new(ids).unwrap();
    assert_eq!(table.lookup(0xcf).unwrap(), TraciCmd::Set(Domain::Simulation));
    assert!(table.lookup(0xcb).is_err());
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_commands_roundtrip() {
    let table = CommandTable::default();
    let commands = vec![
        Command::GetVersion,
        Command::Close,
        Command::Load {
            options: vec!["-c".to_string(), "a.scenario".to_string()],
        },
        Command::SimStep { target_time: 12.5 },
        Command::SetOrder { order: 1 },
        Command::SendFile {
            scenario: "{}".to_string(),
        },
        Command::Get(GetCommand::new(Domain::Person, 0x40, "3")),
        Command::Set(SetCommand::new(
            Domain::Person,
            0x42,
            "3",
            TraciValue::Position2D(Point2D::new(1.0, 1.0)),
        )),
    ];

    for command in commands {
        assert_eq!(encode_parse(&table, command.clone()), command);
    }
}

#[test]
fn test_sim_step_payload_is_untagged_double() {
    let table = CommandTable::default();
    let body = Command::SimStep { target_time: 1.0 }.encode(&table).unwrap();
    assert_eq!(&body[..], &[0x02, 0x3F, 0xF0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_subscription_is_kept_undecoded() {
    let table = CommandTable::default();
    let parsed = Command::parse(&table, &raw(&[0xd4, 1, 2, 3])).unwrap();
    match parsed {
        Command::Subscribe { cmd, payload } => {
            assert_eq!(cmd, TraciCmd::Subscribe(Domain::Vehicle));
            assert_eq!(&payload[..], &[1, 2, 3]);
        }
        other => panic!("Expected subscription, got {:?}", other),
    }
}

#[test]
fn test_response_opcode_is_not_a_command() {
    let table = CommandTable::default();
    let err = Command::parse(&table, &raw(&[0xbe])).unwrap_err();
    assert_eq!(err.command_id(), Some(0xbe));
    assert!(matches!(err.root(), TraciError::UnknownCommand(0xbe)));
}

#[test]
fn test_parse_errors_carry_the_opcode() {
    let table = CommandTable::default();

    // SIM_STEP with a truncated double
    let err = Command::parse(&table, &raw(&[0x02, 0x00, 0x01])).unwrap_err();
    assert_eq!(err.command_id(), Some(0x02));
    assert!(matches!(err.root(), TraciError::Framing(_)));
    assert!(!err.is_fatal());

    // SET with a value of unknown type
    let err = Command::parse(&table, &raw(&[0xce, 0x40, 0, 0, 0, 0, 0x99])).unwrap_err();
    assert_eq!(err.command_id(), Some(0xce));
    assert!(matches!(err.root(), TraciError::UnknownDataType(0x99)));
}

#[test]
fn test_trailing_bytes_are_rejected() {
    let table = CommandTable::default();
    let err = Command::parse(&table, &raw(&[0x7F, 0x00])).unwrap_err();
    assert!(matches!(err.root(), TraciError::Framing(_)));
}

#[test]
fn test_empty_command_body() {
    assert!(matches!(
        RawCommand::from_body(Bytes::new()),
        Err(TraciError::Framing(_))
    ));
}
