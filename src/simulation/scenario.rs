//! Scenario description
//!
//! JSON document describing topography, timing and the initial crowd.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraciError};
use crate::protocol::Point2D;

/// Topography bounds, anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Topography {
    pub width: f64,
    pub height: f64,
}

impl Default for Topography {
    fn default() -> Self {
        Self {
            width: 10.0,
            height: 10.0,
        }
    }
}

impl Topography {
    pub fn contains(&self, p: Point2D) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }
}

/// Initial state of one pedestrian
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PedestrianSpec {
    pub id: i32,
    pub position: Point2D,
    #[serde(default)]
    pub velocity: Point2D,
}

/// A parsed scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,

    /// Simulated seconds per internal step
    #[serde(default = "default_step_length")]
    pub sim_time_step_length: f64,

    /// Simulated time at which the run ends
    #[serde(default = "default_finish_time")]
    pub finish_time: f64,

    #[serde(default)]
    pub topography: Topography,

    #[serde(default)]
    pub pedestrians: Vec<PedestrianSpec>,
}

fn default_step_length() -> f64 {
    0.4
}

fn default_finish_time() -> f64 {
    500.0
}

impl Scenario {
    /// Parse and validate a scenario JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read and parse a scenario file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TraciError::Load(format!("cannot read scenario {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if !(self.sim_time_step_length > 0.0) {
            return Err(TraciError::Load(format!(
                "simTimeStepLength must be positive, got {}",
                self.sim_time_step_length
            )));
        }
        if !(self.finish_time > 0.0) {
            return Err(TraciError::Load(format!(
                "finishTime must be positive, got {}",
                self.finish_time
            )));
        }
        let mut seen = HashSet::new();
        for ped in &self.pedestrians {
            if !seen.insert(ped.id) {
                return Err(TraciError::Load(format!("duplicate pedestrian id {}", ped.id)));
            }
        }
        Ok(())
    }
}
