//! Protocol Module
//!
//! TraCI wire protocol: value codec, command model, packet builder.
//!
//! ## Packet Format
//! ```text
//! ┌────────────────┬─────────────────────────────────────────┐
//! │ Total len (4)  │         One or more framed commands     │
//! └────────────────┴─────────────────────────────────────────┘
//! ```
//!
//! ### Framed Command
//! ```text
//! ┌──────────┬────────────┬─────────────────────────────┐
//! │ Len(1|5) │ Opcode (1) │      Opcode payload         │
//! └──────────┴────────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_IMPLEMENTED
//! - 0xFF: ERR

mod codec;
mod command;
mod packet;
mod reader;
mod response;
mod writer;

pub mod cmd;
pub mod data_type;
pub mod vars;

pub use cmd::{CmdType, CommandTable, Domain, TraciCmd};
pub use codec::{read_packet, split_commands, write_packet, FramedCommands};
pub use command::{Command, GetCommand, RawCommand, SetCommand};
pub use data_type::{Color, LightPhase, Point2D, TraciDataType, TraciValue, TrafficLightPhase};
pub use packet::{TraciPacket, PACKET_LENGTH_FIELD};
pub use reader::TraciReader;
pub use response::{
    GetResponse, Response, SimTimeResponse, StatusCode, StatusResponse, VersionResponse,
};
pub use vars::{PersonVar, SimulationVar};
pub use writer::{framed_len, TraciWriter, MAX_SHORT_COMMAND_LEN};
