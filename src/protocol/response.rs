//! Response definitions
//!
//! Represents responses to clients. Every reply starts with a status
//! response; some commands append one payload command after it.

use bytes::Bytes;

use crate::error::{Result, TraciError};
use super::cmd::{CmdType, CommandTable, TraciCmd};
use super::command::RawCommand;
use super::data_type::TraciValue;
use super::reader::TraciReader;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    Ok = 0x00,
    NotImplemented = 0x01,
    Err = 0xFF,
}

impl StatusCode {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0x00 => Ok(StatusCode::Ok),
            0x01 => Ok(StatusCode::NotImplemented),
            0xFF => Ok(StatusCode::Err),
            other => Err(TraciError::Framing(format!(
                "unknown response status 0x{:02X}",
                other
            ))),
        }
    }
}

/// `[command id][status][description]`
#[derive(Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub cmd_id: u8,
    pub code: StatusCode,
    pub description: String,
}

impl StatusResponse {
    pub fn ok(cmd_id: u8) -> Self {
        Self {
            cmd_id,
            code: StatusCode::Ok,
            description: String::new(),
        }
    }

    pub fn err(cmd_id: u8, description: impl Into<String>) -> Self {
        Self {
            cmd_id,
            code: StatusCode::Err,
            description: description.into(),
        }
    }

    pub fn not_implemented(cmd_id: u8, description: impl Into<String>) -> Self {
        Self {
            cmd_id,
            code: StatusCode::NotImplemented,
            description: description.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    fn read(raw: &RawCommand) -> Result<Self> {
        let mut reader = TraciReader::new(raw.payload.clone());
        let code = StatusCode::from_id(reader.read_u8()?)?;
        let description = reader.read_string()?;
        reader.expect_end("status response")?;
        Ok(Self {
            cmd_id: raw.id,
            code,
            description,
        })
    }
}

/// Reply to a GET command:
/// `[response id][variable id][element id][type tag][value]`
#[derive(Debug, Clone, PartialEq)]
pub struct GetResponse {
    pub status: StatusResponse,
    pub response_id: u8,
    pub variable_id: u8,
    pub element_id: String,
    pub value: TraciValue,
}

/// Reply to GET_VERSION: `[0x00][version id][version string]`
#[derive(Debug, Clone, PartialEq)]
pub struct VersionResponse {
    pub status: StatusResponse,
    pub version_id: i32,
    pub version_string: String,
}

/// Reply to SIM_STEP: `[0x02][type tag][subscription data]`
#[derive(Debug, Clone, PartialEq)]
pub struct SimTimeResponse {
    pub status: StatusResponse,
    pub data: TraciValue,
}

/// A decoded reply, as seen by a client
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Status(StatusResponse),
    Get(GetResponse),
    Version(VersionResponse),
    SimTime(SimTimeResponse),
}

impl Response {
    pub fn status(&self) -> &StatusResponse {
        match self {
            Response::Status(s) => s,
            Response::Get(r) => &r.status,
            Response::Version(r) => &r.status,
            Response::SimTime(r) => &r.status,
        }
    }

    /// Decode every response in a packet body (length field stripped)
    pub fn decode_all(table: &CommandTable, body: Bytes) -> Result<Vec<Response>> {
        let mut reader = TraciReader::new(body);
        let mut responses = Vec::new();

        while reader.has_remaining() {
            let raw = RawCommand::from_body(reader.next_framed_command()?)?;
            let status = StatusResponse::read(&raw)?;

            if !status.is_ok() || !Self::has_payload(table, status.cmd_id) {
                responses.push(Response::Status(status));
                continue;
            }

            let payload = RawCommand::from_body(reader.next_framed_command()?)?;
            responses.push(Self::decode_payload(table, status, &payload)?);
        }

        Ok(responses)
    }

    fn has_payload(table: &CommandTable, cmd_id: u8) -> bool {
        match table.lookup(cmd_id) {
            Ok(TraciCmd::GetVersion) | Ok(TraciCmd::SimStep) => true,
            Ok(cmd) => cmd.cmd_type() == CmdType::ValueGet,
            Err(_) => false,
        }
    }

    fn decode_payload(
        table: &CommandTable,
        status: StatusResponse,
        raw: &RawCommand,
    ) -> Result<Response> {
        let mut reader = TraciReader::new(raw.payload.clone());
        let response = match table.lookup(status.cmd_id)? {
            TraciCmd::GetVersion => Response::Version(VersionResponse {
                version_id: reader.read_i32()?,
                version_string: reader.read_string()?,
                status,
            }),
            TraciCmd::SimStep => Response::SimTime(SimTimeResponse {
                data: reader.read_tagged_value()?,
                status,
            }),
            cmd => {
                let expected = cmd.response().map(|r| table.id_of(r));
                if expected != Some(raw.id) {
                    return Err(TraciError::Framing(format!(
                        "response id 0x{:02X} does not answer {}",
                        raw.id, cmd
                    )));
                }
                Response::Get(GetResponse {
                    response_id: raw.id,
                    variable_id: reader.read_u8()?,
                    element_id: reader.read_string()?,
                    value: reader.read_tagged_value()?,
                    status,
                })
            }
        };
        reader.expect_end("response payload")?;
        Ok(response)
    }
}
