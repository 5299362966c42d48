//! Session Module
//!
//! The boundary between the connection thread and the simulation thread.
//!
//! ## State Machine
//! ```text
//!  NoScenario ──load──▶ LoadedIdle ──next_step──▶ Stepping
//!                          ▲                         │
//!                          └──────step finished──────┤
//!                                                    ├──finish time──▶ Finished
//!                                                    └──model error──▶ Failed
//! ```
//! Loading a scenario from any state replaces the run and returns to
//! `LoadedIdle`.

mod manager;

pub use manager::{ModelFactory, RemoteManager, SessionState};
