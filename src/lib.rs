//! # TraCI Manager
//!
//! A server that lets an external client drive a pedestrian simulation over
//! the TraCI binary protocol:
//! - Big-endian wire codec for the TraCI data types
//! - Packet builder with length back-patching
//! - One active scenario run per session, stepped on its own thread
//! - Blocking state access that never observes a half-finished step
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │                   (one client)                              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ packets
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Command Handler                            │
//! │          (codec ▸ command model ▸ packet builder)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Remote Manager                             │
//! │        (exclusive run lock + step rendezvous)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ RunCommand channel / RunListener
//!                       ▼
//!               ┌───────────────┐
//!               │ Simulation    │
//!               │   thread      │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod simulation;
pub mod session;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TraciError};
pub use config::Config;
pub use session::RemoteManager;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the TraCI manager
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
