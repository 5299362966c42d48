//! Protocol codec
//!
//! Stream helpers moving whole packets between a socket and the packet
//! level types.
//!
//! ## Packet Format
//! ```text
//! ┌────────────────┬───────────────────────────────────────────┐
//! │ Total len (4)  │  [len][opcode][payload] [len][opcode]...  │
//! └────────────────┴───────────────────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::Bytes;

use crate::error::{Result, TraciError};
use super::command::RawCommand;
use super::packet::PACKET_LENGTH_FIELD;
use super::reader::TraciReader;

/// Read one packet from a stream and return its body (length field stripped).
///
/// Returns `Ok(None)` when the stream ends before the first byte of a
/// packet (clean disconnect). A stream ending inside the length field is
/// a framing error.
pub fn read_packet<R: Read>(reader: &mut R, max_packet_size: usize) -> Result<Option<Bytes>> {
    let mut header = [0u8; PACKET_LENGTH_FIELD];
    let mut filled = 0;
    while filled < PACKET_LENGTH_FIELD {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(TraciError::Framing(format!(
                    "truncated packet length: got {} of {} bytes",
                    filled, PACKET_LENGTH_FIELD
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(TraciError::Io(e)),
        }
    }

    let total = i32::from_be_bytes(header);
    let total = usize::try_from(total)
        .ok()
        .filter(|&t| t >= PACKET_LENGTH_FIELD)
        .ok_or_else(|| TraciError::Framing(format!("invalid packet length {}", total)))?;

    if total > max_packet_size {
        return Err(TraciError::Framing(format!(
            "Packet too large: {} bytes (max {})",
            total, max_packet_size
        )));
    }

    let mut body = vec![0u8; total - PACKET_LENGTH_FIELD];
    if !body.is_empty() {
        reader.read_exact(&mut body)?;
    }

    Ok(Some(Bytes::from(body)))
}

/// Write a complete packet to a stream
pub fn write_packet<W: Write>(writer: &mut W, packet: &[u8]) -> Result<()> {
    writer.write_all(packet)?;
    writer.flush()?;
    Ok(())
}

/// Iterator over the framed commands of a packet body.
///
/// Stops after the first framing error, since the rest of the body can no
/// longer be delimited.
pub struct FramedCommands {
    reader: TraciReader,
    failed: bool,
}

impl FramedCommands {
    pub fn new(body: Bytes) -> Self {
        Self {
            reader: TraciReader::new(body),
            failed: false,
        }
    }
}

impl Iterator for FramedCommands {
    type Item = Result<RawCommand>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.reader.has_remaining() {
            return None;
        }
        let next = self
            .reader
            .next_framed_command()
            .and_then(RawCommand::from_body);
        if next.is_err() {
            self.failed = true;
        }
        Some(next)
    }
}

/// Split a packet body into its framed commands
pub fn split_commands(body: Bytes) -> Result<Vec<RawCommand>> {
    FramedCommands::new(body).collect()
}
