//! Movement models
//!
//! The locomotion model advances the simulation state by one step.

use crate::error::Result;
use crate::protocol::Point2D;
use super::state::SimulationState;

/// Advances a simulation state by one step of `dt` simulated seconds
pub trait SimulationModel: Send + 'static {
    fn update(&mut self, state: &mut SimulationState, dt: f64) -> Result<()>;
}

/// Moves every pedestrian along its velocity, stopping at the topography border
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantVelocityModel;

impl SimulationModel for ConstantVelocityModel {
    fn update(&mut self, state: &mut SimulationState, dt: f64) -> Result<()> {
        let bounds = state.topography;
        for ped in state.pedestrians.values_mut() {
            let next = Point2D::new(
                ped.position.x + ped.velocity.x * dt,
                ped.position.y + ped.velocity.y * dt,
            );
            if bounds.contains(next) {
                ped.position = next;
            } else {
                ped.position = Point2D::new(
                    next.x.clamp(0.0, bounds.width),
                    next.y.clamp(0.0, bounds.height),
                );
                ped.velocity = Point2D::default();
            }
        }
        Ok(())
    }
}
