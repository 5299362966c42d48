//! Command Handler
//!
//! Executes parsed commands against the session and appends the reply of
//! each one to the outbound packet.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{Result, TraciError};
use crate::protocol::{
    Command, CommandTable, Domain, FramedCommands, GetCommand, PersonVar, RawCommand,
    SetCommand, SimTimeResponse, SimulationVar, StatusResponse, TraciPacket,
    TraciValue, VersionResponse,
};
use crate::session::RemoteManager;
use crate::simulation::SimulationState;

/// Status id used when a command could not even be delimited
const UNFRAMED_CMD_ID: u8 = 0x00;

/// What the connection does after a packet was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Dispatches inbound commands
pub struct CommandHandler {
    config: Arc<Config>,
    table: CommandTable,
    session: Arc<RemoteManager>,
}

impl CommandHandler {
    /// Create a handler; fails on an inconsistent configuration
    pub fn new(config: Arc<Config>, session: Arc<RemoteManager>) -> Result<Self> {
        config.validate()?;
        let table = CommandTable::new(config.command_ids)?;
        Ok(Self {
            config,
            table,
            session,
        })
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn session(&self) -> &Arc<RemoteManager> {
        &self.session
    }

    /// Handle every framed command of a packet body and build the reply.
    ///
    /// Only fatal errors are returned; everything else becomes an ERR
    /// status inside the reply.
    pub fn handle_packet(&self, body: Bytes) -> Result<(TraciPacket, Flow)> {
        let mut packet = TraciPacket::create();

        for raw in FramedCommands::new(body) {
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Malformed packet: {}", e);
                    packet.add_status_response(&StatusResponse::err(
                        UNFRAMED_CMD_ID,
                        ascii_lossy(&e.to_string()),
                    ))?;
                    break;
                }
            };

            if self.handle_raw(&raw, &mut packet)? == Flow::Close {
                return Ok((packet, Flow::Close));
            }
        }

        Ok((packet, Flow::Continue))
    }

    /// Parse and execute one framed command
    pub fn handle_raw(&self, raw: &RawCommand, packet: &mut TraciPacket) -> Result<Flow> {
        let outcome = Command::parse(&self.table, raw).and_then(|command| {
            tracing::trace!("Executing {:?}", command);
            self.execute(raw.id, command, packet)
        });

        match outcome {
            Ok(flow) => Ok(flow),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("Command 0x{:02X} failed: {}", raw.id, e);
                packet.add_status_response(&StatusResponse::err(raw.id, ascii_lossy(&e.to_string())))?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute(&self, cmd_id: u8, command: Command, packet: &mut TraciPacket) -> Result<Flow> {
        match command {
            Command::GetVersion => packet.wrap_version_response(&VersionResponse {
                status: StatusResponse::ok(cmd_id),
                version_id: self.config.version_id,
                version_string: self.config.version_string.clone(),
            }),
            Command::Load { options } => {
                let path = scenario_path(&options)?;
                self.session.load_scenario_file(&path)?;
                packet.add_ok_status(cmd_id)
            }
            Command::SendFile { scenario } => {
                self.session.load_scenario(&scenario)?;
                packet.add_ok_status(cmd_id)
            }
            Command::SimStep { target_time } => {
                let target = (target_time > 0.0).then_some(target_time);
                self.session.next_step(target)?;
                let sim_time = self.session.access_state(|state| state.sim_time)?;
                tracing::debug!("Simulation step done at t={}", sim_time);
                // subscriptions are not supported, so no results follow
                packet.wrap_sim_time_response(&SimTimeResponse {
                    status: StatusResponse::ok(cmd_id),
                    data: TraciValue::Integer(0),
                })
            }
            Command::SetOrder { order } => {
                tracing::debug!("Client order set to {}", order);
                packet.add_ok_status(cmd_id)
            }
            Command::Close => {
                self.session.close();
                packet.add_ok_status(cmd_id)?;
                return Ok(Flow::Close);
            }
            Command::Get(get) => self.handle_get(cmd_id, &get, packet),
            Command::Set(set) => self.handle_set(cmd_id, &set, packet),
            Command::Subscribe { cmd, .. } => not_implemented(packet, cmd_id, &cmd.to_string()),
        }?;
        Ok(Flow::Continue)
    }

    fn handle_get<'p>(
        &self,
        cmd_id: u8,
        get: &GetCommand,
        packet: &'p mut TraciPacket,
    ) -> Result<&'p mut TraciPacket> {
        let value = match get.domain() {
            Some(Domain::Simulation) => {
                let var = SimulationVar::from_id(get.variable_id)?;
                self.session.access_state(|state| simulation_value(var, state))?
            }
            Some(Domain::Person) => {
                let var = PersonVar::from_id(get.variable_id)?;
                self.session
                    .access_state(|state| person_value(var, &get.element_id, state))??
            }
            _ => return not_implemented(packet, cmd_id, &get.cmd.to_string()),
        };

        let response_id = match get.cmd.response() {
            Some(response) => self.table.id_of(response),
            None => return Err(TraciError::UnknownCommand(cmd_id)),
        };
        packet.add_get_value(cmd_id, response_id, get.variable_id, &get.element_id, value)
    }

    fn handle_set<'p>(
        &self,
        cmd_id: u8,
        set: &SetCommand,
        packet: &'p mut TraciPacket,
    ) -> Result<&'p mut TraciPacket> {
        if set.domain() != Some(Domain::Person) {
            return not_implemented(packet, cmd_id, &set.cmd.to_string());
        }

        let var = PersonVar::from_id(set.variable_id)?;
        if !var.writable() {
            return Err(TraciError::UnknownVariable {
                domain: "writable person",
                var: set.variable_id,
            });
        }
        set.value.expect_type(var.return_type())?;

        self.session.access_state(|state| -> Result<()> {
            let ped = state.pedestrian_mut(&set.element_id)?;
            match var {
                PersonVar::Speed => ped.set_speed(set.value.as_double()?),
                PersonVar::Position => ped.position = set.value.as_position_2d()?,
                _ => {}
            }
            Ok(())
        })??;

        packet.add_ok_status(cmd_id)
    }
}

fn not_implemented<'p>(
    packet: &'p mut TraciPacket,
    cmd_id: u8,
    what: &str,
) -> Result<&'p mut TraciPacket> {
    packet.add_status_response(&StatusResponse::not_implemented(
        cmd_id,
        format!("{} is not implemented", what),
    ))
}

fn simulation_value(var: SimulationVar, state: &SimulationState) -> TraciValue {
    match var {
        SimulationVar::CurrSimTime => TraciValue::Double(state.sim_time),
        // pedestrian simulation: there are never any vehicles
        SimulationVar::NumLoadedVehicles
        | SimulationVar::NumDepartedVehicles
        | SimulationVar::NumVehiclesStartTeleport
        | SimulationVar::NumVehiclesEndTeleport => TraciValue::Integer(0),
        SimulationVar::LoadedVehiclesIds
        | SimulationVar::DepartedVehiclesIds
        | SimulationVar::VehiclesStartTeleportIds
        | SimulationVar::VehiclesEndTeleportIds
        | SimulationVar::VehiclesStartParkingIds
        | SimulationVar::VehiclesStopParkingIds => TraciValue::StringList(Vec::new()),
        SimulationVar::NetworkBoundingBox2D => TraciValue::Polygon(state.bounding_box()),
    }
}

fn person_value(var: PersonVar, element_id: &str, state: &SimulationState) -> Result<TraciValue> {
    let value = match var {
        PersonVar::IdList => TraciValue::StringList(state.pedestrian_ids()),
        PersonVar::Count => TraciValue::Integer(state.pedestrians.len() as i32),
        PersonVar::Speed => TraciValue::Double(state.pedestrian(element_id)?.speed()),
        PersonVar::Position => TraciValue::Position2D(state.pedestrian(element_id)?.position),
        PersonVar::Position3D => {
            let p = state.pedestrian(element_id)?.position;
            TraciValue::Position3D { x: p.x, y: p.y, z: 0.0 }
        }
    };
    Ok(value)
}

/// Scenario file named by `-c <path>` or `--scenario <path>`
fn scenario_path(options: &[String]) -> Result<PathBuf> {
    options
        .windows(2)
        .find(|pair| pair[0] == "-c" || pair[0] == "--scenario")
        .map(|pair| PathBuf::from(&pair[1]))
        .ok_or_else(|| {
            TraciError::Load(format!(
                "LOAD expects '-c <scenario file>', got {:?}",
                options
            ))
        })
}

/// Status descriptions are ASCII on the wire
fn ascii_lossy(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii() { c } else { '?' }).collect()
}
