//! Command identifiers
//!
//! Maps one-byte opcodes to logical commands. Opcodes are grouped by object
//! domain: a domain's GET, SET and SUBSCRIBE opcodes share the low nibble.
//!
//! | Range       | Category                   |
//! |-------------|----------------------------|
//! | 0x00-0x7F   | control                    |
//! | 0xa0-0xae   | value retrieval            |
//! | 0xb0-0xbe   | value retrieval response   |
//! | 0xc2-0xce   | state change               |
//! | 0xd0-0xdb   | variable subscription      |
//! | 0xe0-0xeb   | subscription response      |

use std::fmt;

use crate::config::CommandIds;
use crate::error::{Result, TraciError};

/// Command category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmdType {
    Ctrl,
    ValueGet,
    ValueSet,
    ValueSub,
    Response,
}

/// Object domain addressed by GET/SET/SUBSCRIBE commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    InductionLoop,
    MultiEntryExitDetector,
    TrafficLight,
    Lane,
    Vehicle,
    VehicleType,
    Route,
    Poi,
    Polygon,
    Junction,
    Edge,
    Simulation,
    Gui,
    LaneAreaDetector,
    Person,
}

impl Domain {
    pub const ALL: [Domain; 15] = [
        Domain::InductionLoop,
        Domain::MultiEntryExitDetector,
        Domain::TrafficLight,
        Domain::Lane,
        Domain::Vehicle,
        Domain::VehicleType,
        Domain::Route,
        Domain::Poi,
        Domain::Polygon,
        Domain::Junction,
        Domain::Edge,
        Domain::Simulation,
        Domain::Gui,
        Domain::LaneAreaDetector,
        Domain::Person,
    ];

    /// Low nibble shared by the domain's opcodes
    pub fn offset(self) -> u8 {
        match self {
            Domain::InductionLoop => 0x0,
            Domain::MultiEntryExitDetector => 0x1,
            Domain::TrafficLight => 0x2,
            Domain::Lane => 0x3,
            Domain::Vehicle => 0x4,
            Domain::VehicleType => 0x5,
            Domain::Route => 0x6,
            Domain::Poi => 0x7,
            Domain::Polygon => 0x8,
            Domain::Junction => 0x9,
            Domain::Edge => 0xa,
            Domain::Simulation => 0xb,
            Domain::Gui => 0xc,
            Domain::LaneAreaDetector => 0xd,
            Domain::Person => 0xe,
        }
    }

    /// Whether the domain accepts state-change commands
    pub fn settable(self) -> bool {
        !matches!(
            self,
            Domain::InductionLoop
                | Domain::MultiEntryExitDetector
                | Domain::Junction
                | Domain::LaneAreaDetector
        )
    }

    /// Whether the domain accepts variable subscriptions
    pub fn subscribable(self) -> bool {
        self.offset() <= Domain::Simulation.offset()
    }

    pub fn name(self) -> &'static str {
        match self {
            Domain::InductionLoop => "induction loop",
            Domain::MultiEntryExitDetector => "multi entry/exit detector",
            Domain::TrafficLight => "traffic light",
            Domain::Lane => "lane",
            Domain::Vehicle => "vehicle",
            Domain::VehicleType => "vehicle type",
            Domain::Route => "route",
            Domain::Poi => "poi",
            Domain::Polygon => "polygon",
            Domain::Junction => "junction",
            Domain::Edge => "edge",
            Domain::Simulation => "simulation",
            Domain::Gui => "gui",
            Domain::LaneAreaDetector => "lane area detector",
            Domain::Person => "person",
        }
    }
}

/// Logical TraCI command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraciCmd {
    GetVersion,
    Load,
    SimStep,
    SetOrder,
    SendFile,
    Close,
    Get(Domain),
    GetResponse(Domain),
    Set(Domain),
    Subscribe(Domain),
    SubscribeResponse(Domain),
}

impl TraciCmd {
    pub fn cmd_type(self) -> CmdType {
        match self {
            TraciCmd::GetVersion
            | TraciCmd::Load
            | TraciCmd::SimStep
            | TraciCmd::SetOrder
            | TraciCmd::SendFile
            | TraciCmd::Close => CmdType::Ctrl,
            TraciCmd::Get(_) => CmdType::ValueGet,
            TraciCmd::Set(_) => CmdType::ValueSet,
            TraciCmd::Subscribe(_) => CmdType::ValueSub,
            TraciCmd::GetResponse(_) | TraciCmd::SubscribeResponse(_) => CmdType::Response,
        }
    }

    /// Response command paired with a GET or SUBSCRIBE command
    pub fn response(self) -> Option<TraciCmd> {
        match self {
            TraciCmd::Get(domain) => Some(TraciCmd::GetResponse(domain)),
            TraciCmd::Subscribe(domain) => Some(TraciCmd::SubscribeResponse(domain)),
            _ => None,
        }
    }

    /// Opcode of every command with a fixed id. The SET commands of the
    /// simulation and gui domains are assigned by [`CommandIds`].
    fn fixed_id(self) -> Option<u8> {
        let id = match self {
            TraciCmd::GetVersion => 0x00,
            TraciCmd::Load => 0x01,
            TraciCmd::SimStep => 0x02,
            TraciCmd::SetOrder => 0x03,
            TraciCmd::SendFile => 0x75,
            TraciCmd::Close => 0x7F,
            TraciCmd::Get(d) => 0xa0 + d.offset(),
            TraciCmd::GetResponse(d) => 0xb0 + d.offset(),
            TraciCmd::Set(Domain::Simulation) | TraciCmd::Set(Domain::Gui) => return None,
            TraciCmd::Set(d) => 0xc0 + d.offset(),
            TraciCmd::Subscribe(d) => 0xd0 + d.offset(),
            TraciCmd::SubscribeResponse(d) => 0xe0 + d.offset(),
        };
        Some(id)
    }

    /// Every command known to the protocol
    pub fn all() -> Vec<TraciCmd> {
        let mut cmds = vec![
            TraciCmd::GetVersion,
            TraciCmd::Load,
            TraciCmd::SimStep,
            TraciCmd::SetOrder,
            TraciCmd::SendFile,
            TraciCmd::Close,
        ];
        for domain in Domain::ALL {
            cmds.push(TraciCmd::Get(domain));
            cmds.push(TraciCmd::GetResponse(domain));
            if domain.settable() {
                cmds.push(TraciCmd::Set(domain));
            }
            if domain.subscribable() {
                cmds.push(TraciCmd::Subscribe(domain));
                cmds.push(TraciCmd::SubscribeResponse(domain));
            }
        }
        cmds
    }
}

impl fmt::Display for TraciCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraciCmd::Get(d) => write!(f, "GET {}", d.name()),
            TraciCmd::GetResponse(d) => write!(f, "RESPONSE GET {}", d.name()),
            TraciCmd::Set(d) => write!(f, "SET {}", d.name()),
            TraciCmd::Subscribe(d) => write!(f, "SUBSCRIBE {}", d.name()),
            TraciCmd::SubscribeResponse(d) => write!(f, "RESPONSE SUBSCRIBE {}", d.name()),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Opcode dispatch table, built once at startup
#[derive(Debug, Clone)]
pub struct CommandTable {
    by_id: [Option<TraciCmd>; 256],
    ids: CommandIds,
}

impl CommandTable {
    /// Build the table, failing if two commands would share an opcode
    pub fn new(ids: CommandIds) -> Result<Self> {
        let mut table = Self {
            by_id: [None; 256],
            ids,
        };
        for cmd in TraciCmd::all() {
            let id = table.id_of(cmd);
            if let Some(existing) = table.by_id[id as usize] {
                return Err(TraciError::Config(format!(
                    "opcode 0x{:02X} assigned to both {} and {}",
                    id, existing, cmd
                )));
            }
            table.by_id[id as usize] = Some(cmd);
        }
        Ok(table)
    }

    /// Look up the command for an opcode
    pub fn lookup(&self, id: u8) -> Result<TraciCmd> {
        self.by_id[id as usize].ok_or(TraciError::UnknownCommand(id))
    }

    /// Opcode of a command
    pub fn id_of(&self, cmd: TraciCmd) -> u8 {
        assigned_id(&self.ids, cmd)
    }
}

fn assigned_id(ids: &CommandIds, cmd: TraciCmd) -> u8 {
    match cmd {
        TraciCmd::Set(Domain::Simulation) => ids.set_simulation_state,
        TraciCmd::Set(Domain::Gui) => ids.set_gui_state,
        // fixed_id covers everything else
        other => other.fixed_id().unwrap_or_default(),
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        let ids = CommandIds::default();
        let mut by_id = [None; 256];
        for cmd in TraciCmd::all() {
            by_id[assigned_id(&ids, cmd) as usize] = Some(cmd);
        }
        Self { by_id, ids }
    }
}
