//! TraCI Server Binary
//!
//! Serves a pedestrian simulation over TraCI.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use traci_manager::network::Server;
use traci_manager::{Config, RemoteManager};

/// TraCI Server
#[derive(Parser, Debug)]
#[command(name = "traci-server")]
#[command(about = "Pedestrian simulation controllable over TraCI")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9999")]
    listen: String,

    /// Scenario to load before the first client connects
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Read timeout per connection in ms (0 = wait forever)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,

    /// Largest accepted packet in MB
    #[arg(long, default_value = "16")]
    max_packet_mb: usize,

    /// Opcode of SET_SIMULATION_STATE
    #[arg(long, default_value = "203")]
    set_simulation_state_id: u8,

    /// Opcode of SET_GUI_STATE
    #[arg(long, default_value = "204")]
    set_gui_state_id: u8,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,traci_manager=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("TraCI Server v{}", traci_manager::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .read_timeout_ms(args.read_timeout_ms)
        .max_packet_size(args.max_packet_mb * 1024 * 1024)
        .command_ids(traci_manager::config::CommandIds {
            set_simulation_state: args.set_simulation_state_id,
            set_gui_state: args.set_gui_state_id,
        })
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let session = Arc::new(RemoteManager::new());

    if let Some(path) = &args.scenario {
        if let Err(e) = session.load_scenario_file(path) {
            tracing::error!("Failed to load {}: {}", path.display(), e);
            std::process::exit(1);
        }
        tracing::info!("Scenario {} loaded", path.display());
    }

    let server = match Server::bind(config, session) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
