//! TraCI CLI Client
//!
//! Command-line interface for driving a TraCI server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use traci_manager::network::TraciClient;
use traci_manager::protocol::{Domain, PersonVar, SimulationVar, TraciValue};
use traci_manager::{Config, Result};

/// TraCI CLI
#[derive(Parser, Debug)]
#[command(name = "traci-cli")]
#[command(about = "CLI for the TraCI manager")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9999")]
    server: String,

    /// Connection attempts before giving up
    #[arg(long, default_value = "14")]
    attempts: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the server's TraCI version
    Version,

    /// Send a local scenario file to the server and load it
    SendFile {
        /// Scenario JSON file
        path: PathBuf,
    },

    /// Ask the server to load a scenario file from its own disk
    Load {
        /// Scenario path as seen by the server
        path: String,
    },

    /// Advance the simulation
    Step {
        /// Number of single steps to run
        #[arg(short, long, default_value = "1")]
        count: u32,

        /// Advance to this simulated time instead
        #[arg(short, long)]
        target: Option<f64>,
    },

    /// List pedestrians with their positions
    Persons,

    /// Print the current simulated time
    Time,

    /// Set the speed of a pedestrian
    SetSpeed {
        /// Pedestrian id
        id: String,

        /// New speed in m/s
        speed: f64,
    },

    /// End the session
    Close,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::builder()
        .client_connect_attempts(args.attempts)
        .build();
    let mut client = TraciClient::connect(&args.server, &config)?;

    match args.command {
        Commands::Version => {
            let v = client.get_version()?;
            println!("{} (api {})", v.version_string, v.version_id);
        }
        Commands::SendFile { path } => {
            let json = std::fs::read_to_string(&path)?;
            client.send_file(&json)?;
            println!("OK");
        }
        Commands::Load { path } => {
            client.load(vec!["-c".to_string(), path])?;
            println!("OK");
        }
        Commands::Step { count, target } => match target {
            Some(t) => {
                client.next_step(t)?;
                print_time(&mut client)?;
            }
            None => {
                for _ in 0..count {
                    client.next_step(0.0)?;
                }
                print_time(&mut client)?;
            }
        },
        Commands::Persons => {
            let ids = client.get_value(Domain::Person, PersonVar::IdList.id(), "")?;
            for id in ids.value.as_string_list()? {
                let pos = client.get_value(Domain::Person, PersonVar::Position.id(), id)?;
                let p = pos.value.as_position_2d()?;
                println!("{}\t{:.3}\t{:.3}", id, p.x, p.y);
            }
        }
        Commands::Time => print_time(&mut client)?,
        Commands::SetSpeed { id, speed } => {
            client.set_value(
                Domain::Person,
                PersonVar::Speed.id(),
                &id,
                TraciValue::Double(speed),
            )?;
            println!("OK");
        }
        Commands::Close => {
            client.close()?;
            println!("OK");
        }
    }

    Ok(())
}

fn print_time(client: &mut TraciClient) -> Result<()> {
    let r = client.get_value(Domain::Simulation, SimulationVar::CurrSimTime.id(), "")?;
    println!("t = {}", r.value.as_double()?);
    Ok(())
}
