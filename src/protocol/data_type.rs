//! TraCI value types
//!
//! Every typed value on the wire is preceded by a one-byte tag naming its
//! shape. [`TraciDataType`] is the closed tag table and [`TraciValue`] the
//! decoded value; the two are kept in lock-step by [`TraciValue::data_type`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraciError};

/// Largest element count of a polygon or traffic light phase list
pub const MAX_SHORT_LIST_LEN: usize = 255;

/// Wire value kinds with their one-byte type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TraciDataType {
    LonLatPosition = 0x00,
    Position2D = 0x01,
    LonLatAltPosition = 0x02,
    Position3D = 0x03,
    RoadMapPosition = 0x04,
    Polygon = 0x06,
    UByte = 0x07,
    Byte = 0x08,
    Integer = 0x09,
    Double = 0x0B,
    String = 0x0C,
    TrafficLightPhaseList = 0x0D,
    StringList = 0x0E,
    Color = 0x11,
}

impl TraciDataType {
    /// Look up a type by its wire tag
    pub fn from_id(id: u8) -> Result<Self> {
        let data_type = match id {
            0x00 => TraciDataType::LonLatPosition,
            0x01 => TraciDataType::Position2D,
            0x02 => TraciDataType::LonLatAltPosition,
            0x03 => TraciDataType::Position3D,
            0x04 => TraciDataType::RoadMapPosition,
            0x06 => TraciDataType::Polygon,
            0x07 => TraciDataType::UByte,
            0x08 => TraciDataType::Byte,
            0x09 => TraciDataType::Integer,
            0x0B => TraciDataType::Double,
            0x0C => TraciDataType::String,
            0x0D => TraciDataType::TrafficLightPhaseList,
            0x0E => TraciDataType::StringList,
            0x11 => TraciDataType::Color,
            other => return Err(TraciError::UnknownDataType(other)),
        };
        Ok(data_type)
    }

    /// Wire tag of this type
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for TraciDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02X})", self, self.id())
    }
}

/// A point in the simulation plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Signal state of a traffic light phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LightPhase {
    Red = 0x01,
    Yellow = 0x02,
    Green = 0x03,
    OffBlink = 0x04,
    Off = 0x05,
}

impl LightPhase {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0x01 => Ok(LightPhase::Red),
            0x02 => Ok(LightPhase::Yellow),
            0x03 => Ok(LightPhase::Green),
            0x04 => Ok(LightPhase::OffBlink),
            0x05 => Ok(LightPhase::Off),
            other => Err(TraciError::Framing(format!(
                "unknown traffic light phase 0x{:02X}",
                other
            ))),
        }
    }
}

/// One entry of a traffic light phase list
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficLightPhase {
    pub preceding_road: String,
    pub succeeding_road: String,
    pub phase: LightPhase,
}

/// A decoded, typed TraCI value
#[derive(Debug, Clone, PartialEq)]
pub enum TraciValue {
    UByte(u8),
    Byte(i8),
    Integer(i32),
    Double(f64),
    String(String),
    StringList(Vec<String>),
    Position2D(Point2D),
    Position3D { x: f64, y: f64, z: f64 },
    RoadMapPosition { road_id: String, pos: f64, lane_id: u8 },
    LonLatPosition { lon: f64, lat: f64 },
    LonLatAltPosition { lon: f64, lat: f64, alt: f64 },
    Polygon(Vec<Point2D>),
    TrafficLightPhaseList(Vec<TrafficLightPhase>),
    Color(Color),
}

impl TraciValue {
    /// The tag that must precede this value on the wire
    pub fn data_type(&self) -> TraciDataType {
        match self {
            TraciValue::UByte(_) => TraciDataType::UByte,
            TraciValue::Byte(_) => TraciDataType::Byte,
            TraciValue::Integer(_) => TraciDataType::Integer,
            TraciValue::Double(_) => TraciDataType::Double,
            TraciValue::String(_) => TraciDataType::String,
            TraciValue::StringList(_) => TraciDataType::StringList,
            TraciValue::Position2D(_) => TraciDataType::Position2D,
            TraciValue::Position3D { .. } => TraciDataType::Position3D,
            TraciValue::RoadMapPosition { .. } => TraciDataType::RoadMapPosition,
            TraciValue::LonLatPosition { .. } => TraciDataType::LonLatPosition,
            TraciValue::LonLatAltPosition { .. } => TraciDataType::LonLatAltPosition,
            TraciValue::Polygon(_) => TraciDataType::Polygon,
            TraciValue::TrafficLightPhaseList(_) => TraciDataType::TrafficLightPhaseList,
            TraciValue::Color(_) => TraciDataType::Color,
        }
    }

    /// Fail with a type mismatch unless this value has the expected type
    pub fn expect_type(&self, expected: TraciDataType) -> Result<()> {
        let got = self.data_type();
        if got != expected {
            return Err(TraciError::TypeMismatch {
                expected: expected.to_string(),
                got: got.to_string(),
            });
        }
        Ok(())
    }

    pub fn as_double(&self) -> Result<f64> {
        match self {
            TraciValue::Double(v) => Ok(*v),
            other => Err(mismatch(TraciDataType::Double, other)),
        }
    }

    pub fn as_integer(&self) -> Result<i32> {
        match self {
            TraciValue::Integer(v) => Ok(*v),
            other => Err(mismatch(TraciDataType::Integer, other)),
        }
    }

    pub fn as_string_list(&self) -> Result<&[String]> {
        match self {
            TraciValue::StringList(v) => Ok(v),
            other => Err(mismatch(TraciDataType::StringList, other)),
        }
    }

    pub fn as_position_2d(&self) -> Result<Point2D> {
        match self {
            TraciValue::Position2D(p) => Ok(*p),
            other => Err(mismatch(TraciDataType::Position2D, other)),
        }
    }
}

fn mismatch(expected: TraciDataType, got: &TraciValue) -> TraciError {
    TraciError::TypeMismatch {
        expected: expected.to_string(),
        got: got.data_type().to_string(),
    }
}
