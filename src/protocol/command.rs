//! Command definitions
//!
//! Represents commands from clients. A command is built from one framed
//! command body (length field already stripped); any decode failure is
//! wrapped with the command's opcode.

use bytes::Bytes;

use crate::error::{Result, TraciError};
use super::cmd::{CmdType, CommandTable, Domain, TraciCmd};
use super::data_type::TraciValue;
use super::reader::TraciReader;
use super::writer::TraciWriter;

/// One framed command as read off the wire
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommand {
    /// Opcode byte
    pub id: u8,

    /// Everything after the opcode
    pub payload: Bytes,
}

impl RawCommand {
    /// Split a framed command body into opcode and payload
    pub fn from_body(mut body: Bytes) -> Result<Self> {
        if body.is_empty() {
            return Err(TraciError::Framing(
                "framed command without opcode".to_string(),
            ));
        }
        let id = body[0];
        let payload = body.split_off(1);
        Ok(Self { id, payload })
    }
}

/// Value retrieval: `[variable id][element id]`
#[derive(Debug, Clone, PartialEq)]
pub struct GetCommand {
    pub cmd: TraciCmd,
    pub variable_id: u8,
    pub element_id: String,
}

impl GetCommand {
    pub fn new(domain: Domain, variable_id: u8, element_id: impl Into<String>) -> Self {
        Self {
            cmd: TraciCmd::Get(domain),
            variable_id,
            element_id: element_id.into(),
        }
    }

    fn read(cmd: TraciCmd, reader: &mut TraciReader) -> Result<Self> {
        Ok(Self {
            cmd,
            variable_id: reader.read_u8()?,
            element_id: reader.read_string()?,
        })
    }

    pub fn domain(&self) -> Option<Domain> {
        match self.cmd {
            TraciCmd::Get(domain) => Some(domain),
            _ => None,
        }
    }
}

/// State change: `[variable id][element id][type tag][value]`
#[derive(Debug, Clone, PartialEq)]
pub struct SetCommand {
    pub cmd: TraciCmd,
    pub variable_id: u8,
    pub element_id: String,
    pub value: TraciValue,
}

impl SetCommand {
    pub fn new(
        domain: Domain,
        variable_id: u8,
        element_id: impl Into<String>,
        value: TraciValue,
    ) -> Self {
        Self {
            cmd: TraciCmd::Set(domain),
            variable_id,
            element_id: element_id.into(),
            value,
        }
    }

    fn read(cmd: TraciCmd, reader: &mut TraciReader) -> Result<Self> {
        Ok(Self {
            cmd,
            variable_id: reader.read_u8()?,
            element_id: reader.read_string()?,
            value: reader.read_tagged_value()?,
        })
    }

    pub fn domain(&self) -> Option<Domain> {
        match self.cmd {
            TraciCmd::Set(domain) => Some(domain),
            _ => None,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask for the protocol version
    GetVersion,

    /// Load a scenario given as command line style options
    Load { options: Vec<String> },

    /// Advance the simulation to `target_time` (<= 0: one step)
    SimStep { target_time: f64 },

    /// Announce the client's execution order
    SetOrder { order: i32 },

    /// Load the scenario JSON carried in the command
    SendFile { scenario: String },

    /// End the session
    Close,

    Get(GetCommand),

    Set(SetCommand),

    /// Variable subscription, kept undecoded
    Subscribe { cmd: TraciCmd, payload: Bytes },
}

impl Command {
    /// Parse a framed command.
    ///
    /// Errors are always wrapped with the originating opcode.
    pub fn parse(table: &CommandTable, raw: &RawCommand) -> Result<Command> {
        Self::parse_inner(table, raw).map_err(|e| TraciError::cmd_err(raw.id, e))
    }

    fn parse_inner(table: &CommandTable, raw: &RawCommand) -> Result<Command> {
        let cmd = table.lookup(raw.id)?;
        let mut reader = TraciReader::new(raw.payload.clone());

        let command = match cmd {
            TraciCmd::GetVersion => Command::GetVersion,
            TraciCmd::Load => Command::Load {
                options: reader.read_string_list()?,
            },
            TraciCmd::SimStep => Command::SimStep {
                target_time: reader.read_f64()?,
            },
            TraciCmd::SetOrder => Command::SetOrder {
                order: reader.read_i32()?,
            },
            TraciCmd::SendFile => Command::SendFile {
                scenario: reader.read_string()?,
            },
            TraciCmd::Close => Command::Close,
            TraciCmd::Get(_) => Command::Get(GetCommand::read(cmd, &mut reader)?),
            TraciCmd::Set(_) => Command::Set(SetCommand::read(cmd, &mut reader)?),
            TraciCmd::Subscribe(_) => {
                let payload = reader.read_bytes(reader.remaining())?;
                Command::Subscribe { cmd, payload }
            }
            TraciCmd::GetResponse(_) | TraciCmd::SubscribeResponse(_) => {
                return Err(TraciError::UnknownCommand(raw.id));
            }
        };

        reader.expect_end(&cmd.to_string())?;
        Ok(command)
    }

    /// Logical command this value represents
    pub fn cmd(&self) -> TraciCmd {
        match self {
            Command::GetVersion => TraciCmd::GetVersion,
            Command::Load { .. } => TraciCmd::Load,
            Command::SimStep { .. } => TraciCmd::SimStep,
            Command::SetOrder { .. } => TraciCmd::SetOrder,
            Command::SendFile { .. } => TraciCmd::SendFile,
            Command::Close => TraciCmd::Close,
            Command::Get(get) => get.cmd,
            Command::Set(set) => set.cmd,
            Command::Subscribe { cmd, .. } => *cmd,
        }
    }

    pub fn cmd_type(&self) -> CmdType {
        self.cmd().cmd_type()
    }

    /// Encode the command body (opcode + payload), without length field
    pub fn encode(&self, table: &CommandTable) -> Result<Bytes> {
        let mut w = TraciWriter::new();
        w.write_u8(table.id_of(self.cmd()));

        match self {
            Command::GetVersion | Command::Close => {}
            Command::Load { options } => {
                w.write_string_list(options)?;
            }
            Command::SimStep { target_time } => {
                w.write_f64(*target_time);
            }
            Command::SetOrder { order } => {
                w.write_i32(*order);
            }
            Command::SendFile { scenario } => {
                w.write_string(scenario)?;
            }
            Command::Get(get) => {
                w.write_u8(get.variable_id).write_string(&get.element_id)?;
            }
            Command::Set(set) => {
                w.write_u8(set.variable_id)
                    .write_string(&set.element_id)?
                    .write_value(&set.value)?;
            }
            Command::Subscribe { payload, .. } => {
                w.write_bytes(payload);
            }
        }

        Ok(w.freeze())
    }
}
