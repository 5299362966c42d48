//! Remote manager
//!
//! Owns the single active scenario run and serializes access to its state
//! between the connection thread and the simulation thread.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, TraciError};
use crate::simulation::{
    ConstantVelocityModel, RunListener, RunOutcome, Scenario, ScenarioRun, SimulationModel,
    SimulationState,
};

/// Builds the movement model for a freshly loaded scenario
pub type ModelFactory = Box<dyn Fn(&Scenario) -> Box<dyn SimulationModel> + Send + Sync>;

/// Lifecycle of the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No scenario loaded yet (or the last one was closed)
    NoScenario,

    /// Run loaded and waiting for a command
    LoadedIdle,

    /// A step request is being executed
    Stepping,

    /// The run reached its finish time
    Finished,

    /// The model failed; latched until the next load
    Failed(String),
}

struct Slot {
    run_id: u64,
    state: SessionState,
}

/// Step-completion rendezvous between the simulation thread and callers
/// of [`RemoteManager::access_state`].
///
/// The predicate lives under the same lock as the condition variable, so a
/// signal sent before anyone waits is not lost. One waiter at a time is
/// supported; the manager's run lock guarantees that.
struct StepRendezvous {
    slot: Mutex<Slot>,
    step_done: Condvar,
}

impl StepRendezvous {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                run_id: 0,
                state: SessionState::NoScenario,
            }),
            step_done: Condvar::new(),
        }
    }

    fn reset(&self, run_id: u64, state: SessionState) {
        let mut slot = self.slot.lock();
        slot.run_id = run_id;
        slot.state = state;
        self.step_done.notify_all();
    }

    fn state(&self) -> SessionState {
        self.slot.lock().state.clone()
    }

    /// Move an idle run into `Stepping`
    fn begin_step(&self, run_id: u64) -> Result<()> {
        let mut slot = self.slot.lock();
        check_usable(&slot, run_id)?;
        if slot.state == SessionState::Stepping {
            return Err(TraciError::StateAccess(
                "a simulation step is already in progress".to_string(),
            ));
        }
        slot.state = SessionState::Stepping;
        Ok(())
    }

    /// Undo `begin_step` when the request never reached the run
    fn abort_step(&self, run_id: u64) {
        let mut slot = self.slot.lock();
        if slot.run_id == run_id && slot.state == SessionState::Stepping {
            slot.state = SessionState::LoadedIdle;
        }
    }

    /// Block until the current step of `run_id` has ended
    fn wait_for_step_end(&self, run_id: u64) -> Result<()> {
        let mut slot = self.slot.lock();
        while slot.run_id == run_id && slot.state == SessionState::Stepping {
            self.step_done.wait(&mut slot);
        }
        if slot.run_id != run_id {
            return Err(TraciError::StateAccess(
                "interrupted while waiting for the simulation step".to_string(),
            ));
        }
        check_usable(&slot, run_id)
    }
}

fn check_usable(slot: &Slot, run_id: u64) -> Result<()> {
    if slot.run_id != run_id {
        return Err(TraciError::StateAccess("simulation run was replaced".to_string()));
    }
    match &slot.state {
        SessionState::NoScenario => Err(no_scenario()),
        SessionState::Finished => Err(TraciError::StateAccess(
            "simulation run has finished".to_string(),
        )),
        SessionState::Failed(reason) => Err(TraciError::SimulationFailed(reason.clone())),
        SessionState::LoadedIdle | SessionState::Stepping => Ok(()),
    }
}

fn no_scenario() -> TraciError {
    TraciError::StateAccess("no scenario loaded".to_string())
}

impl RunListener for StepRendezvous {
    fn step_finished(&self, run_id: u64, sim_time: f64) {
        let mut slot = self.slot.lock();
        if slot.run_id != run_id {
            return;
        }
        if slot.state == SessionState::Stepping {
            slot.state = SessionState::LoadedIdle;
        }
        tracing::debug!("Run {} step finished at t={}", run_id, sim_time);
        self.step_done.notify_all();
    }

    fn run_finished(&self, run_id: u64, outcome: &RunOutcome) {
        let mut slot = self.slot.lock();
        if slot.run_id != run_id {
            return;
        }
        slot.state = match outcome {
            RunOutcome::Completed => SessionState::Finished,
            RunOutcome::Failed(reason) => SessionState::Failed(reason.clone()),
            RunOutcome::Stopped => SessionState::NoScenario,
        };
        self.step_done.notify_all();
    }
}

/// Session over the single active simulation run
///
/// ## Concurrency Model
///
/// - `current` is the exclusive lock: `load_scenario`, `next_step`,
///   `access_state` and `close` never overlap.
/// - The simulation thread never takes `current`; it only locks the run's
///   state during a step and the rendezvous when reporting.
/// - `access_state` waits on the rendezvous while a step is in progress, so
///   handlers only ever see the state between steps.
///
/// Waits have no timeout: a stalled simulation thread blocks the accessor.
pub struct RemoteManager {
    current: Mutex<Option<ScenarioRun>>,
    rendezvous: Arc<StepRendezvous>,
    next_run_id: AtomicU64,
    model_factory: ModelFactory,
}

impl RemoteManager {
    /// Create a manager using the constant-velocity model
    pub fn new() -> Self {
        Self::with_model_factory(Box::new(
            |_: &Scenario| -> Box<dyn SimulationModel> { Box::new(ConstantVelocityModel) },
        ))
    }

    /// Create a manager building its movement model with `factory`
    pub fn with_model_factory(factory: ModelFactory) -> Self {
        Self {
            current: Mutex::new(None),
            rendezvous: Arc::new(StepRendezvous::new()),
            next_run_id: AtomicU64::new(1),
            model_factory: factory,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.rendezvous.state()
    }

    /// Parse a scenario and start a fresh run, replacing any previous one
    pub fn load_scenario(&self, json: &str) -> Result<()> {
        let scenario = Scenario::from_json(json)?;
        self.start_run(scenario)
    }

    /// Load a scenario from a file
    pub fn load_scenario_file(&self, path: &Path) -> Result<()> {
        let scenario = Scenario::from_file(path)?;
        self.start_run(scenario)
    }

    fn start_run(&self, scenario: Scenario) -> Result<()> {
        let mut current = self.current.lock();

        if let Some(old) = current.take() {
            tracing::info!("Replacing run {} ({})", old.id(), old.scenario_name());
            old.stop();
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        self.rendezvous.reset(run_id, SessionState::LoadedIdle);

        let model = (self.model_factory)(&scenario);
        let listener: Arc<dyn RunListener> = self.rendezvous.clone();
        match ScenarioRun::start(run_id, &scenario, model, listener) {
            Ok(run) => {
                *current = Some(run);
                Ok(())
            }
            Err(e) => {
                self.rendezvous.reset(0, SessionState::NoScenario);
                Err(e)
            }
        }
    }

    /// Ask the run to advance to `target` simulated seconds, or by one
    /// internal step if `None`.
    ///
    /// Returns once the request is handed to the simulation thread; use
    /// [`RemoteManager::access_state`] to wait for the step to end.
    pub fn next_step(&self, target: Option<f64>) -> Result<()> {
        let current = self.current.lock();
        let run = current.as_ref().ok_or_else(no_scenario)?;

        self.rendezvous.begin_step(run.id())?;
        if let Err(e) = run.next_sim_command(target) {
            self.rendezvous.abort_step(run.id());
            return Err(e);
        }
        Ok(())
    }

    /// Run `handler` against the simulation state between steps.
    ///
    /// Blocks while a step is in progress. The handler runs under the
    /// exclusive lock and must not call back into the manager.
    pub fn access_state<F, R>(&self, handler: F) -> Result<R>
    where
        F: FnOnce(&mut SimulationState) -> R,
    {
        let current = self.current.lock();
        let run = current.as_ref().ok_or_else(no_scenario)?;

        if !run.is_wait_for_sim_command() {
            tracing::trace!("Waiting for run {} to finish its step", run.id());
        }
        self.rendezvous.wait_for_step_end(run.id())?;

        let mut state = run.state().lock();
        Ok(handler(&mut state))
    }

    /// Stop the current run, if any
    pub fn close(&self) {
        let mut current = self.current.lock();
        if let Some(run) = current.take() {
            tracing::info!("Closing run {} ({})", run.id(), run.scenario_name());
            self.rendezvous.reset(0, SessionState::NoScenario);
            run.stop();
        }
    }
}

impl Default for RemoteManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RemoteManager {
    fn drop(&mut self) {
        if let Some(run) = self.current.get_mut().take() {
            run.stop();
        }
    }
}
