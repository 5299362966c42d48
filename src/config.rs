//! Configuration for the TraCI manager
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, TraciError};

/// TraCI API version reported by GET_VERSION
pub const TRACI_API_VERSION: i32 = 20;

/// Main configuration for a TraCI manager instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Connection read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    /// Largest inbound packet accepted (in bytes, including the length field)
    pub max_packet_size: usize,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Version id returned by GET_VERSION
    pub version_id: i32,

    /// Version string returned by GET_VERSION
    pub version_string: String,

    /// Opcodes that are assignable per deployment
    pub command_ids: CommandIds,

    // -------------------------------------------------------------------------
    // Client Configuration
    // -------------------------------------------------------------------------
    /// Connection attempts before the client gives up
    pub client_connect_attempts: u32,

    /// Wait before the second attempt; doubles after every failure (milliseconds)
    pub client_initial_backoff_ms: u64,
}

/// Opcodes of the two SET commands that collided in older releases.
///
/// Both stay distinct logical commands; [`Config::validate`] refuses an
/// assignment that maps them onto the same byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandIds {
    pub set_simulation_state: u8,
    pub set_gui_state: u8,
}

impl Default for CommandIds {
    fn default() -> Self {
        Self {
            set_simulation_state: 0xcb,
            set_gui_state: 0xcc,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:9999".to_string(),
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            max_packet_size: 16 * 1024 * 1024, // 16 MB
            version_id: TRACI_API_VERSION,
            version_string: format!("traci-manager {}", crate::VERSION),
            command_ids: CommandIds::default(),
            client_connect_attempts: 14,
            client_initial_backoff_ms: 500,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration for inconsistencies
    pub fn validate(&self) -> Result<()> {
        if self.command_ids.set_simulation_state == self.command_ids.set_gui_state {
            return Err(TraciError::Config(format!(
                "SET_SIMULATION_STATE and SET_GUI_STATE share opcode 0x{:02X}",
                self.command_ids.set_gui_state
            )));
        }
        if self.max_packet_size < 4 {
            return Err(TraciError::Config(format!(
                "max_packet_size must be at least 4 bytes, got {}",
                self.max_packet_size
            )));
        }
        if self.client_connect_attempts == 0 {
            return Err(TraciError::Config(
                "client_connect_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the largest inbound packet accepted
    pub fn max_packet_size(mut self, size: usize) -> Self {
        self.config.max_packet_size = size;
        self
    }

    /// Set the version reported to clients
    pub fn version(mut self, id: i32, text: impl Into<String>) -> Self {
        self.config.version_id = id;
        self.config.version_string = text.into();
        self
    }

    /// Set the assignable opcodes
    pub fn command_ids(mut self, ids: CommandIds) -> Self {
        self.config.command_ids = ids;
        self
    }

    /// Set the number of client connection attempts
    pub fn client_connect_attempts(mut self, attempts: u32) -> Self {
        self.config.client_connect_attempts = attempts;
        self
    }

    /// Set the initial client backoff (in milliseconds)
    pub fn client_initial_backoff_ms(mut self, ms: u64) -> Self {
        self.config.client_initial_backoff_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
