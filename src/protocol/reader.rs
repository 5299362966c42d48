//! TraCI reader
//!
//! Decodes primitive and typed TraCI values from a byte buffer. Every read
//! checks the remaining length first, so a truncated buffer surfaces as a
//! framing error instead of a panic.

use bytes::{Buf, Bytes};

use crate::error::{Result, TraciError};
use super::data_type::{
    Color, LightPhase, Point2D, TraciDataType, TraciValue, TrafficLightPhase,
};
use super::writer::EXTENDED_LENGTH_FIELD;

/// Cursor over an already received byte buffer
#[derive(Debug, Clone)]
pub struct TraciReader {
    buf: Bytes,
}

impl TraciReader {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    fn ensure(&self, needed: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(TraciError::Framing(format!(
                "truncated buffer reading {}: need {} bytes, have {}",
                what,
                needed,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    /// Fail if any bytes are left over
    pub fn expect_end(&self, what: &str) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(TraciError::Framing(format!(
                "{} trailing bytes after {}",
                self.buf.remaining(),
                what
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1, "unsigned byte")?;
        Ok(self.buf.get_u8())
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.ensure(1, "byte")?;
        Ok(self.buf.get_i8())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4, "integer")?;
        Ok(self.buf.get_i32())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.ensure(8, "double")?;
        Ok(self.buf.get_f64())
    }

    /// Split off the next `len` bytes without copying
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len, "raw bytes")?;
        Ok(self.buf.split_to(len))
    }

    /// Read a 4-byte length-prefixed ASCII string
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| {
            TraciError::Framing(format!("negative string length {}", len))
        })?;
        self.ensure(len, "string")?;
        let raw = self.buf.split_to(len);
        if !raw.is_ascii() {
            return Err(TraciError::Encoding(
                "string contains non-ASCII bytes".to_string(),
            ));
        }
        // ASCII is valid UTF-8
        Ok(raw.iter().map(|&b| b as char).collect())
    }

    /// Read a 4-byte element count followed by that many strings
    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        let count = self.read_i32()?;
        let count = usize::try_from(count).map_err(|_| {
            TraciError::Framing(format!("negative string list length {}", count))
        })?;
        // every string needs at least its 4-byte length
        self.ensure(count.saturating_mul(4), "string list")?;
        (0..count).map(|_| self.read_string()).collect()
    }

    // =========================================================================
    // Typed Values
    // =========================================================================

    /// Read a type tag followed by the value it announces
    pub fn read_tagged_value(&mut self) -> Result<TraciValue> {
        let data_type = TraciDataType::from_id(self.read_u8()?)?;
        self.read_type_value(data_type)
    }

    /// Read a tagged value and require it to be of `expected` type
    pub fn read_tagged_value_as(&mut self, expected: TraciDataType) -> Result<TraciValue> {
        let tag = self.read_u8()?;
        let data_type = TraciDataType::from_id(tag)?;
        if data_type != expected {
            return Err(TraciError::TypeMismatch {
                expected: expected.to_string(),
                got: data_type.to_string(),
            });
        }
        self.read_type_value(data_type)
    }

    /// Read the untagged encoding of a `data_type` value
    pub fn read_type_value(&mut self, data_type: TraciDataType) -> Result<TraciValue> {
        let value = match data_type {
            TraciDataType::UByte => TraciValue::UByte(self.read_u8()?),
            TraciDataType::Byte => TraciValue::Byte(self.read_i8()?),
            TraciDataType::Integer => TraciValue::Integer(self.read_i32()?),
            TraciDataType::Double => TraciValue::Double(self.read_f64()?),
            TraciDataType::String => TraciValue::String(self.read_string()?),
            TraciDataType::StringList => TraciValue::StringList(self.read_string_list()?),
            TraciDataType::Position2D => TraciValue::Position2D(self.read_point()?),
            TraciDataType::Position3D => TraciValue::Position3D {
                x: self.read_f64()?,
                y: self.read_f64()?,
                z: self.read_f64()?,
            },
            TraciDataType::RoadMapPosition => TraciValue::RoadMapPosition {
                road_id: self.read_string()?,
                pos: self.read_f64()?,
                lane_id: self.read_u8()?,
            },
            TraciDataType::LonLatPosition => TraciValue::LonLatPosition {
                lon: self.read_f64()?,
                lat: self.read_f64()?,
            },
            TraciDataType::LonLatAltPosition => TraciValue::LonLatAltPosition {
                lon: self.read_f64()?,
                lat: self.read_f64()?,
                alt: self.read_f64()?,
            },
            TraciDataType::Polygon => {
                let count = self.read_u8()? as usize;
                self.ensure(count * 16, "polygon")?;
                let points = (0..count)
                    .map(|_| self.read_point())
                    .collect::<Result<Vec<_>>>()?;
                TraciValue::Polygon(points)
            }
            TraciDataType::TrafficLightPhaseList => {
                let count = self.read_u8()? as usize;
                let mut phases = Vec::with_capacity(count);
                for _ in 0..count {
                    phases.push(TrafficLightPhase {
                        preceding_road: self.read_string()?,
                        succeeding_road: self.read_string()?,
                        phase: LightPhase::from_id(self.read_u8()?)?,
                    });
                }
                TraciValue::TrafficLightPhaseList(phases)
            }
            TraciDataType::Color => {
                self.ensure(4, "color")?;
                TraciValue::Color(Color::rgba(
                    self.buf.get_u8(),
                    self.buf.get_u8(),
                    self.buf.get_u8(),
                    self.buf.get_u8(),
                ))
            }
        };
        Ok(value)
    }

    fn read_point(&mut self) -> Result<Point2D> {
        Ok(Point2D::new(self.read_f64()?, self.read_f64()?))
    }

    // =========================================================================
    // Command Framing
    // =========================================================================

    /// Read a command length field and return the number of bytes that
    /// follow it (opcode + payload).
    ///
    /// A leading `0x00` selects the extended form.
    pub fn read_command_length(&mut self) -> Result<usize> {
        let short = self.read_u8()?;
        if short != 0 {
            return Ok(short as usize - 1);
        }

        let extended = self.read_i32()?;
        if extended < EXTENDED_LENGTH_FIELD as i32 {
            return Err(TraciError::Framing(format!(
                "extended command length {} is smaller than its own field",
                extended
            )));
        }
        Ok(extended as usize - EXTENDED_LENGTH_FIELD)
    }

    /// Split off the next framed command body (opcode + payload)
    pub fn next_framed_command(&mut self) -> Result<Bytes> {
        let body_len = self.read_command_length()?;
        self.ensure(body_len, "framed command")?;
        Ok(self.buf.split_to(body_len))
    }
}
