//! Simulation Module
//!
//! The simulation driven over TraCI.
//!
//! ## Responsibilities
//! - Parse scenario descriptions (JSON)
//! - Hold the live simulation state
//! - Run the step loop on a dedicated thread
//! - Report step completion, run completion and failures to a listener
//!
//! The movement model is pluggable through [`SimulationModel`]; the crate
//! ships a constant-velocity model.

mod model;
mod run;
mod scenario;
mod state;

pub use model::{ConstantVelocityModel, SimulationModel};
pub use run::{RunListener, RunOutcome, ScenarioRun};
pub use scenario::{PedestrianSpec, Scenario, Topography};
pub use state::{Pedestrian, SimulationState};
