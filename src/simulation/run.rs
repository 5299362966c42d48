//! Scenario run
//!
//! Owns the simulation thread. The thread sits idle until it receives a step
//! request, advances the state, then reports back through a [`RunListener`]
//! and waits again.
//!
//! ```text
//!   session ──Step(target)──▶ ┌──────────────────┐
//!                             │ simulation thread │──step_finished──▶ listener
//!   session ──Stop──────────▶ └──────────────────┘──run_finished───▶ listener
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{Result, TraciError};
use super::model::SimulationModel;
use super::scenario::Scenario;
use super::state::SimulationState;

const TIME_EPSILON: f64 = 1e-9;

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Reached the scenario's finish time
    Completed,

    /// Stopped on request
    Stopped,

    /// The model failed while stepping
    Failed(String),
}

/// Callbacks invoked from the simulation thread
pub trait RunListener: Send + Sync {
    /// A requested step completed; the run waits for the next command
    fn step_finished(&self, run_id: u64, sim_time: f64);

    /// The run ended and its thread is about to exit
    fn run_finished(&self, run_id: u64, outcome: &RunOutcome);
}

enum RunCommand {
    Step(Option<f64>),
    Stop,
}

enum StepEnd {
    Paused(f64),
    Completed,
}

struct RunShared {
    id: u64,
    state: Mutex<SimulationState>,
    wait_for_sim_command: AtomicBool,
    failure: Mutex<Option<String>>,
    listener: Arc<dyn RunListener>,
}

impl RunShared {
    fn step_finished(&self, sim_time: f64) {
        self.wait_for_sim_command.store(true, Ordering::SeqCst);
        self.listener.step_finished(self.id, sim_time);
    }

    fn simulation_failed(&self, reason: String) {
        tracing::warn!("Simulation run {} failed: {}", self.id, reason);
        *self.failure.lock() = Some(reason.clone());
        self.listener.run_finished(self.id, &RunOutcome::Failed(reason));
    }

    fn finished(&self, outcome: RunOutcome) {
        tracing::info!("Simulation run {} finished: {:?}", self.id, outcome);
        self.listener.run_finished(self.id, &outcome);
    }
}

/// The currently executing scenario and its simulation thread
pub struct ScenarioRun {
    shared: Arc<RunShared>,
    scenario_name: String,
    commands: Sender<RunCommand>,
    thread: Option<JoinHandle<()>>,
}

impl ScenarioRun {
    /// Spawn the simulation thread for `scenario`.
    ///
    /// The run starts idle, waiting for its first step command.
    pub fn start(
        id: u64,
        scenario: &Scenario,
        model: Box<dyn SimulationModel>,
        listener: Arc<dyn RunListener>,
    ) -> Result<Self> {
        let shared = Arc::new(RunShared {
            id,
            state: Mutex::new(SimulationState::from_scenario(scenario)),
            wait_for_sim_command: AtomicBool::new(true),
            failure: Mutex::new(None),
            listener,
        });

        let (tx, rx) = channel::unbounded();
        let thread_shared = Arc::clone(&shared);
        let step_length = scenario.sim_time_step_length;
        let finish_time = scenario.finish_time;

        let thread = thread::Builder::new()
            .name(format!("simulation-{}", id))
            .spawn(move || run_loop(thread_shared, rx, model, step_length, finish_time))
            .map_err(|e| {
                TraciError::SimulationFailed(format!("cannot start simulation thread: {}", e))
            })?;

        tracing::info!("Start scenario {} with remote control (run {})", scenario.name, id);

        Ok(Self {
            shared,
            scenario_name: scenario.name.clone(),
            commands: tx,
            thread: Some(thread),
        })
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    /// Whether the simulation thread is idle between steps
    pub fn is_wait_for_sim_command(&self) -> bool {
        self.shared.wait_for_sim_command.load(Ordering::SeqCst)
    }

    /// Failure reason, once the run has failed
    pub fn failure(&self) -> Option<String> {
        self.shared.failure.lock().clone()
    }

    /// Live simulation state; locked by the simulation thread while stepping
    pub(crate) fn state(&self) -> &Mutex<SimulationState> {
        &self.shared.state
    }

    /// Ask the simulation thread to advance to `target` (one step if `None`)
    pub fn next_sim_command(&self, target: Option<f64>) -> Result<()> {
        if let Some(reason) = self.failure() {
            return Err(TraciError::SimulationFailed(reason));
        }
        self.shared.wait_for_sim_command.store(false, Ordering::SeqCst);
        self.commands.send(RunCommand::Step(target)).map_err(|_| {
            self.shared.wait_for_sim_command.store(true, Ordering::SeqCst);
            TraciError::StateAccess("simulation thread has exited".to_string())
        })
    }

    /// Stop the simulation thread.
    ///
    /// Joins the thread when it is idle. A thread still inside a step is
    /// detached; it exits after the step, and its callbacks carry a stale
    /// run id.
    pub fn stop(mut self) {
        let _ = self.commands.send(RunCommand::Stop);
        if let Some(handle) = self.thread.take() {
            if self.is_wait_for_sim_command() || handle.is_finished() {
                if handle.join().is_err() {
                    tracing::warn!("Simulation thread of run {} panicked", self.shared.id);
                }
            } else {
                tracing::debug!("Detaching busy simulation thread of run {}", self.shared.id);
            }
        }
    }
}

impl Drop for ScenarioRun {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.commands.send(RunCommand::Stop);
        }
    }
}

fn run_loop(
    shared: Arc<RunShared>,
    commands: Receiver<RunCommand>,
    mut model: Box<dyn SimulationModel>,
    step_length: f64,
    finish_time: f64,
) {
    loop {
        let target = match commands.recv() {
            Ok(RunCommand::Step(target)) => target,
            Ok(RunCommand::Stop) | Err(_) => {
                shared.finished(RunOutcome::Stopped);
                return;
            }
        };

        match advance(&shared, model.as_mut(), target, step_length, finish_time) {
            Ok(StepEnd::Paused(sim_time)) => shared.step_finished(sim_time),
            Ok(StepEnd::Completed) => {
                shared.finished(RunOutcome::Completed);
                return;
            }
            Err(reason) => {
                shared.simulation_failed(reason);
                return;
            }
        }
    }
}

/// Step until `target` is reached (or once if `None`). The state lock is
/// held for the duration of each individual step.
fn advance(
    shared: &RunShared,
    model: &mut dyn SimulationModel,
    target: Option<f64>,
    step_length: f64,
    finish_time: f64,
) -> std::result::Result<StepEnd, String> {
    loop {
        let mut state = shared.state.lock();

        let update = panic::catch_unwind(AssertUnwindSafe(|| model.update(&mut state, step_length)));
        match update {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.to_string()),
            Err(payload) => return Err(panic_message(payload)),
        }

        state.step += 1;
        state.sim_time = state.step as f64 * step_length;
        tracing::trace!("Run {} step {} at t={}", shared.id, state.step, state.sim_time);

        if state.sim_time >= finish_time - TIME_EPSILON {
            return Ok(StepEnd::Completed);
        }
        match target {
            Some(t) if state.sim_time < t - TIME_EPSILON => continue,
            _ => return Ok(StepEnd::Paused(state.sim_time)),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("model panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("model panicked: {}", s)
    } else {
        "model panicked".to_string()
    }
}
