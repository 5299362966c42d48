//! Variable identifiers of the supported GET/SET domains

use crate::error::{Result, TraciError};
use super::data_type::TraciDataType;

/// Variables of the simulation domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationVar {
    CurrSimTime,
    NumLoadedVehicles,
    LoadedVehiclesIds,
    NumDepartedVehicles,
    DepartedVehiclesIds,
    NumVehiclesStartTeleport,
    VehiclesStartTeleportIds,
    NumVehiclesEndTeleport,
    VehiclesEndTeleportIds,
    VehiclesStartParkingIds,
    VehiclesStopParkingIds,
    NetworkBoundingBox2D,
}

impl SimulationVar {
    pub fn from_id(id: u8) -> Result<Self> {
        let var = match id {
            0x66 => SimulationVar::CurrSimTime,
            0x71 => SimulationVar::NumLoadedVehicles,
            0x72 => SimulationVar::LoadedVehiclesIds,
            0x73 => SimulationVar::NumDepartedVehicles,
            0x74 => SimulationVar::DepartedVehiclesIds,
            0x75 => SimulationVar::NumVehiclesStartTeleport,
            0x76 => SimulationVar::VehiclesStartTeleportIds,
            0x77 => SimulationVar::NumVehiclesEndTeleport,
            0x78 => SimulationVar::VehiclesEndTeleportIds,
            0x6d => SimulationVar::VehiclesStartParkingIds,
            0x6f => SimulationVar::VehiclesStopParkingIds,
            0x7c => SimulationVar::NetworkBoundingBox2D,
            other => {
                return Err(TraciError::UnknownVariable {
                    domain: "simulation",
                    var: other,
                })
            }
        };
        Ok(var)
    }

    pub fn id(self) -> u8 {
        match self {
            SimulationVar::CurrSimTime => 0x66,
            SimulationVar::NumLoadedVehicles => 0x71,
            SimulationVar::LoadedVehiclesIds => 0x72,
            SimulationVar::NumDepartedVehicles => 0x73,
            SimulationVar::DepartedVehiclesIds => 0x74,
            SimulationVar::NumVehiclesStartTeleport => 0x75,
            SimulationVar::VehiclesStartTeleportIds => 0x76,
            SimulationVar::NumVehiclesEndTeleport => 0x77,
            SimulationVar::VehiclesEndTeleportIds => 0x78,
            SimulationVar::VehiclesStartParkingIds => 0x6d,
            SimulationVar::VehiclesStopParkingIds => 0x6f,
            SimulationVar::NetworkBoundingBox2D => 0x7c,
        }
    }

    /// Type of the value returned for this variable
    pub fn return_type(self) -> TraciDataType {
        match self {
            SimulationVar::CurrSimTime => TraciDataType::Double,
            SimulationVar::NumLoadedVehicles
            | SimulationVar::NumDepartedVehicles
            | SimulationVar::NumVehiclesStartTeleport
            | SimulationVar::NumVehiclesEndTeleport => TraciDataType::Integer,
            SimulationVar::LoadedVehiclesIds
            | SimulationVar::DepartedVehiclesIds
            | SimulationVar::VehiclesStartTeleportIds
            | SimulationVar::VehiclesEndTeleportIds
            | SimulationVar::VehiclesStartParkingIds
            | SimulationVar::VehiclesStopParkingIds => TraciDataType::StringList,
            SimulationVar::NetworkBoundingBox2D => TraciDataType::Polygon,
        }
    }
}

/// Variables of the person domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonVar {
    IdList,
    Count,
    Speed,
    Position,
    Position3D,
}

impl PersonVar {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0x00 => Ok(PersonVar::IdList),
            0x01 => Ok(PersonVar::Count),
            0x40 => Ok(PersonVar::Speed),
            0x42 => Ok(PersonVar::Position),
            0x39 => Ok(PersonVar::Position3D),
            other => Err(TraciError::UnknownVariable {
                domain: "person",
                var: other,
            }),
        }
    }

    pub fn id(self) -> u8 {
        match self {
            PersonVar::IdList => 0x00,
            PersonVar::Count => 0x01,
            PersonVar::Speed => 0x40,
            PersonVar::Position => 0x42,
            PersonVar::Position3D => 0x39,
        }
    }

    pub fn return_type(self) -> TraciDataType {
        match self {
            PersonVar::IdList => TraciDataType::StringList,
            PersonVar::Count => TraciDataType::Integer,
            PersonVar::Speed => TraciDataType::Double,
            PersonVar::Position => TraciDataType::Position2D,
            PersonVar::Position3D => TraciDataType::Position3D,
        }
    }

    /// Whether SET commands may change this variable
    pub fn writable(self) -> bool {
        matches!(self, PersonVar::Speed | PersonVar::Position)
    }
}
