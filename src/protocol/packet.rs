//! Outbound packet builder
//!
//! ## Packet Format
//! ```text
//! ┌────────────────┬──────────────────┬──────────────────┬─────┐
//! │ Total len (4)  │ Framed command 1 │ Framed command 2 │ ... │
//! └────────────────┴──────────────────┴──────────────────┴─────┘
//! ```
//! The total length counts the 4-byte length field itself.
//!
//! A packet is either *open* (more commands may be appended) or
//! *finalized*. Packets started with [`TraciPacket::create`] carry a
//! placeholder length that is patched exactly once, either by
//! [`TraciPacket::finalize_packet`] or by [`TraciPacket::send`].
//! [`TraciPacket::send_status`] sizes its length field up front and is
//! finalized immediately.

use bytes::Bytes;

use crate::error::{Result, TraciError};
use super::data_type::TraciValue;
use super::response::{GetResponse, SimTimeResponse, StatusCode, StatusResponse, VersionResponse};
use super::writer::{framed_len, TraciWriter};

/// Size of the packet length field
pub const PACKET_LENGTH_FIELD: usize = 4;

/// Response identifier of the GET_VERSION payload
const VERSION_RESPONSE_ID: u8 = 0x00;

/// Response identifier of the SIM_STEP payload
const SIM_TIME_RESPONSE_ID: u8 = 0x02;

/// An outbound TraCI packet
#[derive(Debug)]
pub struct TraciPacket {
    writer: TraciWriter,
    length_placeholder: bool,
    finalized: bool,
}

impl TraciPacket {
    /// Start an open packet with a placeholder length field
    pub fn create() -> Self {
        let mut writer = TraciWriter::with_capacity(64);
        writer.write_i32(-1);
        Self {
            writer,
            length_placeholder: true,
            finalized: false,
        }
    }

    /// Build a finalized packet holding a single status response
    pub fn send_status(cmd_id: u8, code: StatusCode, description: &str) -> Result<Self> {
        let body = status_body(cmd_id, code, description)?;
        let total = PACKET_LENGTH_FIELD + framed_len(body.len());

        let mut writer = TraciWriter::with_capacity(total);
        writer.write_i32(packet_len(total)?);
        writer.write_framed_command(&body)?;

        Ok(Self {
            writer,
            length_placeholder: false,
            finalized: true,
        })
    }

    /// Resolve the length field and refuse further writes
    pub fn finalize_packet(&mut self) -> Result<&mut Self> {
        if self.finalized {
            return Ok(self);
        }
        self.patch_length()?;
        self.finalized = true;
        Ok(self)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Current size in bytes, including the length field
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.len() <= PACKET_LENGTH_FIELD
    }

    /// Return the wire bytes, resolving the placeholder length if needed
    pub fn send(mut self) -> Result<Bytes> {
        if !self.finalized && self.length_placeholder {
            self.patch_length()?;
        }
        Ok(self.writer.freeze())
    }

    fn patch_length(&mut self) -> Result<()> {
        if !self.length_placeholder {
            return Ok(());
        }
        let total = packet_len(self.writer.len())?;
        self.writer.as_mut_slice()[..PACKET_LENGTH_FIELD].copy_from_slice(&total.to_be_bytes());
        self.length_placeholder = false;
        Ok(())
    }

    fn throw_if_finalized(&self) -> Result<()> {
        if self.finalized {
            return Err(TraciError::PacketFinalized);
        }
        Ok(())
    }

    // =========================================================================
    // Status Responses
    // =========================================================================

    /// Append an OK status without description
    pub fn add_ok_status(&mut self, cmd_id: u8) -> Result<&mut Self> {
        self.add_status(cmd_id, StatusCode::Ok, "")
    }

    pub fn add_err_status(&mut self, cmd_id: u8, description: &str) -> Result<&mut Self> {
        self.add_status(cmd_id, StatusCode::Err, description)
    }

    pub fn add_status_response(&mut self, status: &StatusResponse) -> Result<&mut Self> {
        self.add_status(status.cmd_id, status.code, &status.description)
    }

    /// Append `[len][command id][status][description]`
    pub fn add_status(
        &mut self,
        cmd_id: u8,
        code: StatusCode,
        description: &str,
    ) -> Result<&mut Self> {
        self.throw_if_finalized()?;
        let body = status_body(cmd_id, code, description)?;
        self.writer.write_framed_command(&body)?;
        Ok(self)
    }

    // =========================================================================
    // Commands and Wrapped Responses
    // =========================================================================

    /// Append a command body (opcode + payload) with its length field
    pub fn add_command(&mut self, body: &[u8]) -> Result<&mut Self> {
        self.throw_if_finalized()?;
        self.writer.write_framed_command(body)?;
        Ok(self)
    }

    pub fn wrap_get_response(&mut self, res: &GetResponse) -> Result<&mut Self> {
        self.throw_if_finalized()?;
        let mut body = TraciWriter::new();
        body.write_u8(res.response_id)
            .write_u8(res.variable_id)
            .write_string(&res.element_id)?
            .write_value(&res.value)?;
        self.add_status_response(&res.status)?;
        self.add_command(body.as_slice())
    }

    pub fn wrap_version_response(&mut self, res: &VersionResponse) -> Result<&mut Self> {
        self.throw_if_finalized()?;
        let mut body = TraciWriter::new();
        body.write_u8(VERSION_RESPONSE_ID)
            .write_i32(res.version_id)
            .write_string(&res.version_string)?;
        if res.status.is_ok() {
            self.add_ok_status(res.status.cmd_id)?;
        } else {
            self.add_status_response(&res.status)?;
        }
        self.add_command(body.as_slice())
    }

    pub fn wrap_sim_time_response(&mut self, res: &SimTimeResponse) -> Result<&mut Self> {
        self.throw_if_finalized()?;
        let mut body = TraciWriter::new();
        body.write_u8(SIM_TIME_RESPONSE_ID).write_value(&res.data)?;
        self.add_status_response(&res.status)?;
        self.add_command(body.as_slice())
    }

    /// Append a status response followed by a typed GET payload
    pub fn add_get_value(
        &mut self,
        cmd_id: u8,
        response_id: u8,
        variable_id: u8,
        element_id: &str,
        value: TraciValue,
    ) -> Result<&mut Self> {
        self.wrap_get_response(&GetResponse {
            status: StatusResponse::ok(cmd_id),
            response_id,
            variable_id,
            element_id: element_id.to_string(),
            value,
        })
    }
}

fn status_body(cmd_id: u8, code: StatusCode, description: &str) -> Result<Vec<u8>> {
    let mut body = TraciWriter::with_capacity(6 + description.len());
    body.write_u8(cmd_id).write_u8(code as u8).write_string(description)?;
    Ok(body.as_slice().to_vec())
}

fn packet_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| TraciError::Capacity {
        what: "packet",
        len,
        max: i32::MAX as usize,
    })
}
