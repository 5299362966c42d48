//! Tests for RemoteManager
//!
//! These tests verify:
//! - State machine transitions (load, step, finish, fail, close)
//! - Stepping to a target time
//! - State access waits for the running step
//! - State accesses never overlap
//! - Reloading replaces the active run

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use traci_manager::protocol::Point2D;
use traci_manager::session::{RemoteManager, SessionState};
use traci_manager::simulation::{
    ConstantVelocityModel, Scenario, SimulationModel, SimulationState,
};
use traci_manager::{Result, TraciError};

// =============================================================================
// Helper Functions
// =============================================================================

fn scenario_json(name: &str, finish_time: f64) -> String {
    format!(
        r#"{{
            "name": "{}",
            "simTimeStepLength": 0.4,
            "finishTime": {},
            "topography": {{"width": 20.0, "height": 20.0}},
            "pedestrians": [
                {{"id": 1, "position": {{"x": 1.0, "y": 1.0}}, "velocity": {{"x": 1.0, "y": 0.0}}}},
                {{"id": 2, "position": {{"x": 5.0, "y": 5.0}}}}
            ]
        }}"#,
        name, finish_time
    )
}

fn loaded_manager() -> RemoteManager {
    let manager = RemoteManager::new();
    manager.load_scenario(&scenario_json("corridor", 100.0)).unwrap();
    manager
}

/// Blocks every step until the test sends on the gate; `false` fails the step
struct GatedModel {
    gate: Receiver<bool>,
}

impl SimulationModel for GatedModel {
    fn update(&mut self, _state: &mut SimulationState, _dt: f64) -> Result<()> {
        match self.gate.recv() {
            Ok(false) => Err(TraciError::SimulationFailed("gate closed".to_string())),
            _ => Ok(()),
        }
    }
}

fn gated_manager(gate: Receiver<bool>) -> RemoteManager {
    RemoteManager::with_model_factory(Box::new(
        move |_: &Scenario| -> Box<dyn SimulationModel> {
            Box::new(GatedModel { gate: gate.clone() })
        },
    ))
}

fn factory_manager(build: fn() -> Box<dyn SimulationModel>) -> RemoteManager {
    RemoteManager::with_model_factory(Box::new(
        move |_: &Scenario| -> Box<dyn SimulationModel> { build() },
    ))
}

struct FailingModel;

impl SimulationModel for FailingModel {
    fn update(&mut self, _state: &mut SimulationState, _dt: f64) -> Result<()> {
        Err(TraciError::SimulationFailed("model diverged".to_string()))
    }
}

struct PanickingModel;

impl SimulationModel for PanickingModel {
    fn update(&mut self, _state: &mut SimulationState, _dt: f64) -> Result<()> {
        panic!("pedestrian left the universe")
    }
}

// =============================================================================
// State Machine Tests
// =============================================================================

#[test]
fn test_no_scenario_is_rejected() {
    let manager = RemoteManager::new();
    assert_eq!(manager.state(), SessionState::NoScenario);

    assert!(matches!(
        manager.next_step(None),
        Err(TraciError::StateAccess(_))
    ));
    assert!(matches!(
        manager.access_state(|s| s.sim_time),
        Err(TraciError::StateAccess(_))
    ));
}

#[test]
fn test_load_starts_idle_at_time_zero() {
    let manager = loaded_manager();
    assert_eq!(manager.state(), SessionState::LoadedIdle);

    let (time, count) = manager
        .access_state(|s| (s.sim_time, s.pedestrians.len()))
        .unwrap();
    assert_eq!(time, 0.0);
    assert_eq!(count, 2);
}

#[test]
fn test_invalid_scenario_is_a_load_error() {
    let manager = RemoteManager::new();
    assert!(matches!(
        manager.load_scenario("{ not json"),
        Err(TraciError::Load(_))
    ));
    assert_eq!(manager.state(), SessionState::NoScenario);
}

#[test]
fn test_single_step() {
    let manager = loaded_manager();
    manager.next_step(None).unwrap();

    let (step, time, pos) = manager
        .access_state(|s| (s.step, s.sim_time, s.pedestrians[&1].position))
        .unwrap();
    assert_eq!(step, 1);
    assert!((time - 0.4).abs() < 1e-9);
    assert!((pos.x - 1.4).abs() < 1e-9);
    assert_eq!(manager.state(), SessionState::LoadedIdle);
}

#[test]
fn test_step_to_target_time() {
    let manager = loaded_manager();
    manager.next_step(Some(2.0)).unwrap();

    let (step, time) = manager.access_state(|s| (s.step, s.sim_time)).unwrap();
    assert_eq!(step, 5);
    assert!((time - 2.0).abs() < 1e-9);

    // a target in the past still advances by one step
    manager.next_step(Some(1.0)).unwrap();
    let step = manager.access_state(|s| s.step).unwrap();
    assert_eq!(step, 6);
}

#[test]
fn test_state_changes_are_visible_to_the_next_step() {
    let manager = loaded_manager();
    manager
        .access_state(|s| {
            let ped = s.pedestrian_mut("2").unwrap();
            ped.velocity = Point2D::new(0.0, 1.0);
        })
        .unwrap();

    manager.next_step(None).unwrap();
    let pos = manager
        .access_state(|s| s.pedestrian("2").unwrap().position)
        .unwrap();
    assert!((pos.y - 5.4).abs() < 1e-9);
}

#[test]
fn test_run_reaches_finish_time() {
    let manager = RemoteManager::new();
    manager.load_scenario(&scenario_json("short", 0.8)).unwrap();

    manager.next_step(None).unwrap();
    assert!(manager.access_state(|s| s.step).is_ok());

    manager.next_step(None).unwrap();
    assert!(matches!(
        manager.access_state(|s| s.step),
        Err(TraciError::StateAccess(_))
    ));
    assert_eq!(manager.state(), SessionState::Finished);
    assert!(manager.next_step(None).is_err());
}

#[test]
fn test_close_returns_to_no_scenario() {
    let manager = loaded_manager();
    manager.next_step(None).unwrap();
    manager.close();

    assert_eq!(manager.state(), SessionState::NoScenario);
    assert!(manager.access_state(|s| s.step).is_err());

    // closing twice is harmless
    manager.close();
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_model_error_fails_the_run() {
    let manager = factory_manager(|| Box::new(FailingModel));
    manager.load_scenario(&scenario_json("broken", 100.0)).unwrap();
    manager.next_step(None).unwrap();

    let err = manager.access_state(|s| s.step).unwrap_err();
    assert!(matches!(err, TraciError::SimulationFailed(_)));
    assert!(matches!(manager.state(), SessionState::Failed(_)));

    // failure is latched
    assert!(matches!(
        manager.next_step(None),
        Err(TraciError::SimulationFailed(_))
    ));
}

#[test]
fn test_model_panic_fails_the_run() {
    let manager = factory_manager(|| Box::new(PanickingModel));
    manager.load_scenario(&scenario_json("panics", 100.0)).unwrap();
    manager.next_step(None).unwrap();

    match manager.access_state(|s| s.step) {
        Err(TraciError::SimulationFailed(reason)) => {
            assert!(reason.contains("pedestrian left the universe"))
        }
        other => panic!("Expected SimulationFailed, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_reload_recovers_from_failure() {
    let manager = RemoteManager::with_model_factory(Box::new(
        |scenario: &Scenario| -> Box<dyn SimulationModel> {
            if scenario.name == "broken" {
                Box::new(FailingModel)
            } else {
                Box::new(ConstantVelocityModel)
            }
        },
    ));
    manager.load_scenario(&scenario_json("broken", 100.0)).unwrap();
    manager.next_step(None).unwrap();
    assert!(manager.access_state(|s| s.step).is_err());

    manager.load_scenario(&scenario_json("fine", 100.0)).unwrap();
    manager.next_step(None).unwrap();
    assert_eq!(manager.access_state(|s| s.step).unwrap(), 1);
}

#[test]
fn test_reload_replaces_the_run() {
    let manager = loaded_manager();
    manager.next_step(Some(4.0)).unwrap();
    assert_eq!(manager.access_state(|s| s.step).unwrap(), 10);

    let other = r#"{"name": "empty", "pedestrians": []}"#;
    manager.load_scenario(other).unwrap();

    let (step, count) = manager
        .access_state(|s| (s.step, s.pedestrians.len()))
        .unwrap();
    assert_eq!(step, 0);
    assert_eq!(count, 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_access_waits_for_running_step() {
    let (gate_tx, gate_rx) = channel::unbounded();
    let manager = Arc::new(gated_manager(gate_rx));
    manager.load_scenario(&scenario_json("gated", 100.0)).unwrap();

    // returns immediately, the step blocks on the gate
    manager.next_step(None).unwrap();
    assert_eq!(manager.state(), SessionState::Stepping);

    let (done_tx, done_rx) = channel::bounded(1);
    let waiter = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let step = manager.access_state(|s| s.step);
            done_tx.send(step.map_err(|e| e.to_string())).unwrap();
        })
    };

    assert_eq!(
        done_rx.recv_timeout(Duration::from_millis(200)),
        Err(RecvTimeoutError::Timeout)
    );

    gate_tx.send(true).unwrap();
    let step = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(step, Ok(1));
    waiter.join().unwrap();
}

#[test]
fn test_waiter_is_released_on_failure() {
    let (gate_tx, gate_rx) = channel::unbounded();
    let manager = Arc::new(gated_manager(gate_rx));
    manager.load_scenario(&scenario_json("gated", 100.0)).unwrap();
    manager.next_step(None).unwrap();

    let waiter = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.access_state(|s| s.step).map_err(|e| e.to_string()))
    };

    thread::sleep(Duration::from_millis(50));
    gate_tx.send(false).unwrap();

    let result = waiter.join().unwrap();
    assert!(result.unwrap_err().contains("gate closed"));
}

#[test]
fn test_step_while_stepping_is_rejected() {
    let (gate_tx, gate_rx) = channel::unbounded();
    let manager = gated_manager(gate_rx);
    manager.load_scenario(&scenario_json("gated", 100.0)).unwrap();

    manager.next_step(None).unwrap();
    assert!(matches!(
        manager.next_step(None),
        Err(TraciError::StateAccess(_))
    ));

    gate_tx.send(true).unwrap();
    assert_eq!(manager.access_state(|s| s.step).unwrap(), 1);
}

#[test]
fn test_concurrent_accesses_do_not_overlap() {
    let manager = Arc::new(loaded_manager());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            thread::spawn(move || {
                for _ in 0..25 {
                    manager
                        .access_state(|_| {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_micros(200));
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_interleaved_steps_and_accesses() {
    let manager = Arc::new(loaded_manager());

    let stepper = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            for _ in 0..20 {
                manager.next_step(None).unwrap();
                manager.access_state(|s| s.step).unwrap();
            }
        })
    };

    let mut last = 0;
    for _ in 0..20 {
        let step = manager.access_state(|s| s.step).unwrap();
        assert!(step >= last, "steps must never go backwards");
        last = step;
    }
    stepper.join().unwrap();

    let final_step = manager.access_state(|s| s.step).unwrap();
    assert_eq!(final_step, 20);
}
