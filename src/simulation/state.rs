//! Simulation state snapshot
//!
//! The live state owned by the simulation thread. The session hands out
//! `&mut SimulationState` only between steps.

use std::collections::BTreeMap;

use crate::error::{Result, TraciError};
use crate::protocol::Point2D;
use super::scenario::{Scenario, Topography};

/// A pedestrian in the running simulation
#[derive(Debug, Clone, PartialEq)]
pub struct Pedestrian {
    pub id: i32,
    pub position: Point2D,
    pub velocity: Point2D,
}

impl Pedestrian {
    /// Magnitude of the velocity
    pub fn speed(&self) -> f64 {
        self.velocity.x.hypot(self.velocity.y)
    }

    /// Rescale the velocity to `speed`, keeping its heading.
    ///
    /// A standing pedestrian starts walking along +x.
    pub fn set_speed(&mut self, speed: f64) {
        let current = self.speed();
        if current > 0.0 {
            let factor = speed / current;
            self.velocity = Point2D::new(self.velocity.x * factor, self.velocity.y * factor);
        } else {
            self.velocity = Point2D::new(speed, 0.0);
        }
    }
}

/// Snapshot of a running simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    /// Number of completed steps
    pub step: u64,

    /// Simulated seconds
    pub sim_time: f64,

    pub topography: Topography,

    pub pedestrians: BTreeMap<i32, Pedestrian>,
}

impl SimulationState {
    /// Initial state of a scenario
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let pedestrians = scenario
            .pedestrians
            .iter()
            .map(|ped| {
                (
                    ped.id,
                    Pedestrian {
                        id: ped.id,
                        position: ped.position,
                        velocity: ped.velocity,
                    },
                )
            })
            .collect();

        Self {
            step: 0,
            sim_time: 0.0,
            topography: scenario.topography,
            pedestrians,
        }
    }

    /// Pedestrian ids as strings, in ascending order
    pub fn pedestrian_ids(&self) -> Vec<String> {
        self.pedestrians.keys().map(|id| id.to_string()).collect()
    }

    /// Look up a pedestrian by its TraCI element id
    pub fn pedestrian(&self, element_id: &str) -> Result<&Pedestrian> {
        let id = parse_id(element_id)?;
        self.pedestrians
            .get(&id)
            .ok_or_else(|| unknown_pedestrian(element_id))
    }

    pub fn pedestrian_mut(&mut self, element_id: &str) -> Result<&mut Pedestrian> {
        let id = parse_id(element_id)?;
        self.pedestrians
            .get_mut(&id)
            .ok_or_else(|| unknown_pedestrian(element_id))
    }

    /// Lower-left and upper-right corner of the topography
    pub fn bounding_box(&self) -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(self.topography.width, self.topography.height),
        ]
    }
}

fn parse_id(element_id: &str) -> Result<i32> {
    element_id
        .parse()
        .map_err(|_| TraciError::StateAccess(format!("invalid pedestrian id {:?}", element_id)))
}

fn unknown_pedestrian(element_id: &str) -> TraciError {
    TraciError::StateAccess(format!("no pedestrian with id {}", element_id))
}
