//! Error types for the TraCI manager
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TraciError
pub type Result<T> = std::result::Result<T, TraciError>;

/// Unified error type for TraCI manager operations
#[derive(Debug, Error)]
pub enum TraciError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing / Decoding Errors
    // -------------------------------------------------------------------------
    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Unknown command id: 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("Unknown variable id 0x{var:02X} for {domain}")]
    UnknownVariable { domain: &'static str, var: u8 },

    #[error("Unknown data type tag: 0x{0:02X}")]
    UnknownDataType(u8),

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Capacity exceeded: {what} has {len} elements (max {max})")]
    Capacity {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A parse failure re-wrapped with the opcode of the command being built
    #[error("Command 0x{cmd:02X} failed: {source}")]
    Command {
        cmd: u8,
        #[source]
        source: Box<TraciError>,
    },

    // -------------------------------------------------------------------------
    // Packet Errors
    // -------------------------------------------------------------------------
    #[error("Cannot change finalized TraCI packet")]
    PacketFinalized,

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("State access error: {0}")]
    StateAccess(String),

    #[error("Scenario load error: {0}")]
    Load(String),

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-OK status
    #[error("Command 0x{cmd:02X} rejected by server: {description}")]
    Rejected { cmd: u8, description: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TraciError {
    /// Wrap a low-level failure with the opcode of the originating command.
    ///
    /// Already-wrapped errors are passed through unchanged.
    pub fn cmd_err(cmd: u8, err: TraciError) -> Self {
        match err {
            wrapped @ TraciError::Command { .. } => wrapped,
            other => TraciError::Command {
                cmd,
                source: Box::new(other),
            },
        }
    }

    /// Opcode of the command this error was raised for, if any
    pub fn command_id(&self) -> Option<u8> {
        match self {
            TraciError::Command { cmd, .. } => Some(*cmd),
            TraciError::UnknownCommand(cmd) => Some(*cmd),
            _ => None,
        }
    }

    /// The innermost error, skipping the command wrapper
    pub fn root(&self) -> &TraciError {
        match self {
            TraciError::Command { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the connection must be torn down after this error.
    ///
    /// Only socket-level failures are fatal; everything else is answered with
    /// an ERR status and the connection stays open.
    pub fn is_fatal(&self) -> bool {
        matches!(self.root(), TraciError::Io(_) | TraciError::Network(_))
    }
}

impl From<serde_json::Error> for TraciError {
    fn from(e: serde_json::Error) -> Self {
        TraciError::Load(e.to_string())
    }
}
