//! TraCI writer
//!
//! Encodes primitive and typed TraCI values into a growable byte buffer.
//! All multi-byte numbers are big-endian.
//!
//! ## Command Length Field
//! ```text
//! len <= 255:  ┌─────────┐
//!              │ len (1) │
//!              └─────────┘
//! len  > 255:  ┌──────────┬───────────────┐
//!              │ 0x00 (1) │ len + 4 (4)   │
//!              └──────────┴───────────────┘
//! ```
//! `len` always counts the single length byte of the short form, so the
//! extended value counts the whole five byte field.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TraciError};
use super::data_type::{TraciValue, MAX_SHORT_LIST_LEN};

/// Largest command length that fits the single-byte length field
pub const MAX_SHORT_COMMAND_LEN: usize = 255;

/// Size of the extended length field (0x00 marker + 4-byte length)
pub const EXTENDED_LENGTH_FIELD: usize = 5;

/// Byte buffer writer for the TraCI wire format
#[derive(Debug, Default, Clone)]
pub struct TraciWriter {
    buf: BytesMut,
}

impl TraciWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable view used to patch already written fields
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Consume the writer and return the written bytes
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    pub fn write_u8(&mut self, val: u8) -> &mut Self {
        self.buf.put_u8(val);
        self
    }

    pub fn write_i8(&mut self, val: i8) -> &mut Self {
        self.buf.put_i8(val);
        self
    }

    pub fn write_i32(&mut self, val: i32) -> &mut Self {
        self.buf.put_i32(val);
        self
    }

    pub fn write_f64(&mut self, val: f64) -> &mut Self {
        self.buf.put_f64(val);
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    /// Write a length-prefixed ASCII string (no terminator)
    pub fn write_string(&mut self, val: &str) -> Result<&mut Self> {
        check_ascii(val)?;
        self.write_i32(to_wire_len(val.len())?);
        self.buf.put_slice(val.as_bytes());
        Ok(self)
    }

    /// Write a 4-byte element count followed by each string
    pub fn write_string_list(&mut self, val: &[String]) -> Result<&mut Self> {
        for s in val {
            check_ascii(s)?;
        }
        self.write_i32(to_wire_len(val.len())?);
        for s in val {
            self.write_i32(to_wire_len(s.len())?);
            self.buf.put_slice(s.as_bytes());
        }
        Ok(self)
    }

    // =========================================================================
    // Typed Values
    // =========================================================================

    /// Write the type tag of `value` followed by its encoding.
    ///
    /// The value is validated up front, so a rejected value leaves the
    /// buffer untouched.
    pub fn write_value(&mut self, value: &TraciValue) -> Result<&mut Self> {
        validate(value)?;
        self.write_u8(value.data_type().id());
        self.put_value(value);
        Ok(self)
    }

    // Only called on validated values.
    fn put_value(&mut self, value: &TraciValue) {
        match value {
            TraciValue::UByte(v) => {
                self.buf.put_u8(*v);
            }
            TraciValue::Byte(v) => {
                self.buf.put_i8(*v);
            }
            TraciValue::Integer(v) => {
                self.buf.put_i32(*v);
            }
            TraciValue::Double(v) => {
                self.buf.put_f64(*v);
            }
            TraciValue::String(s) => self.put_str(s),
            TraciValue::StringList(list) => {
                self.buf.put_i32(list.len() as i32);
                for s in list {
                    self.put_str(s);
                }
            }
            TraciValue::Position2D(p) => {
                self.buf.put_f64(p.x);
                self.buf.put_f64(p.y);
            }
            TraciValue::Position3D { x, y, z } => {
                self.buf.put_f64(*x);
                self.buf.put_f64(*y);
                self.buf.put_f64(*z);
            }
            TraciValue::RoadMapPosition { road_id, pos, lane_id } => {
                self.put_str(road_id);
                self.buf.put_f64(*pos);
                self.buf.put_u8(*lane_id);
            }
            TraciValue::LonLatPosition { lon, lat } => {
                self.buf.put_f64(*lon);
                self.buf.put_f64(*lat);
            }
            TraciValue::LonLatAltPosition { lon, lat, alt } => {
                self.buf.put_f64(*lon);
                self.buf.put_f64(*lat);
                self.buf.put_f64(*alt);
            }
            TraciValue::Polygon(points) => {
                self.buf.put_u8(points.len() as u8);
                for p in points {
                    self.buf.put_f64(p.x);
                    self.buf.put_f64(p.y);
                }
            }
            TraciValue::TrafficLightPhaseList(phases) => {
                self.buf.put_u8(phases.len() as u8);
                for phase in phases {
                    self.put_str(&phase.preceding_road);
                    self.put_str(&phase.succeeding_road);
                    self.buf.put_u8(phase.phase as u8);
                }
            }
            TraciValue::Color(c) => {
                self.buf.put_slice(&[c.r, c.g, c.b, c.a]);
            }
        }
    }

    fn put_str(&mut self, s: &str) {
        self.buf.put_i32(s.len() as i32);
        self.buf.put_slice(s.as_bytes());
    }

    // =========================================================================
    // Command Framing
    // =========================================================================

    /// Write a command length field.
    ///
    /// `cmd_len` is the number of bytes of the command *including* one byte
    /// for the length field. Lengths above 255 switch to the extended form,
    /// whose 4-byte value also covers the four extra length bytes. Zero is
    /// rejected: a lone `0x00` marks the extended form.
    pub fn write_command_length(&mut self, cmd_len: usize) -> Result<&mut Self> {
        if cmd_len == 0 {
            return Err(TraciError::Framing(
                "command length must count its own length field".to_string(),
            ));
        }
        if cmd_len <= MAX_SHORT_COMMAND_LEN {
            self.write_u8(cmd_len as u8);
        } else {
            let extended = to_wire_len(cmd_len + 4)?;
            self.write_u8(0);
            self.write_i32(extended);
        }
        Ok(self)
    }

    /// Write `body` (opcode + payload) preceded by its length field
    pub fn write_framed_command(&mut self, body: &[u8]) -> Result<&mut Self> {
        self.write_command_length(body.len() + 1)?;
        self.buf.put_slice(body);
        Ok(self)
    }
}

/// Bytes occupied by a framed command whose body has `body_len` bytes
pub fn framed_len(body_len: usize) -> usize {
    if body_len + 1 <= MAX_SHORT_COMMAND_LEN {
        body_len + 1
    } else {
        body_len + EXTENDED_LENGTH_FIELD
    }
}

fn to_wire_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| {
        TraciError::Capacity {
            what: "length field",
            len,
            max: i32::MAX as usize,
        }
    })
}

fn check_ascii(s: &str) -> Result<()> {
    if !s.is_ascii() {
        return Err(TraciError::Encoding(format!(
            "string {:?} is not ASCII",
            s
        )));
    }
    Ok(())
}

fn check_short_list(what: &'static str, len: usize) -> Result<()> {
    if len > MAX_SHORT_LIST_LEN {
        return Err(TraciError::Capacity {
            what,
            len,
            max: MAX_SHORT_LIST_LEN,
        });
    }
    Ok(())
}

fn validate(value: &TraciValue) -> Result<()> {
    match value {
        TraciValue::String(s) => check_ascii(s),
        TraciValue::StringList(list) => {
            to_wire_len(list.len())?;
            list.iter().try_for_each(|s| check_ascii(s))
        }
        TraciValue::RoadMapPosition { road_id, .. } => check_ascii(road_id),
        TraciValue::Polygon(points) => check_short_list("polygon", points.len()),
        TraciValue::TrafficLightPhaseList(phases) => {
            check_short_list("traffic light phase list", phases.len())?;
            phases.iter().try_for_each(|p| {
                check_ascii(&p.preceding_road)?;
                check_ascii(&p.succeeding_road)
            })
        }
        _ => Ok(()),
    }
}
