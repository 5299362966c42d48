//! TraCI client
//!
//! Blocking client for driving a TraCI server. Used by the CLI binary and
//! the end-to-end tests.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, TraciError};
use crate::protocol::{
    read_packet, write_packet, Command, CommandTable, Domain, GetCommand, GetResponse, Response,
    SetCommand, SimTimeResponse, StatusResponse, TraciPacket, TraciValue, VersionResponse,
};

/// Connection to a TraCI server
pub struct TraciClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    table: CommandTable,
    max_packet_size: usize,
}

impl TraciClient {
    /// Connect, retrying with doubling back-off while the server comes up
    pub fn connect(addr: &str, config: &Config) -> Result<Self> {
        let attempts = config.client_connect_attempts.max(1);
        let mut backoff = Duration::from_millis(config.client_initial_backoff_ms);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match TcpStream::connect(addr) {
                Ok(stream) => {
                    tracing::debug!("Connected to {} on attempt {}", addr, attempt);
                    return Self::from_stream(stream, config);
                }
                Err(e) => {
                    tracing::debug!(
                        "Connect attempt {}/{} to {} failed: {}",
                        attempt,
                        attempts,
                        addr,
                        e
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        thread::sleep(backoff);
                        backoff *= 2;
                    }
                }
            }
        }

        Err(TraciError::Network(format!(
            "cannot connect to {} after {} attempts: {}",
            addr,
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream, config: &Config) -> Result<Self> {
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            table: CommandTable::new(config.command_ids)?,
            max_packet_size: config.max_packet_size,
        })
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Send several commands in one packet and decode the reply packet
    pub fn send_commands(&mut self, commands: &[Command]) -> Result<Vec<Response>> {
        let mut packet = TraciPacket::create();
        for command in commands {
            packet.add_command(&command.encode(&self.table)?)?;
        }
        self.send_packet(packet)
    }

    /// Send a pre-built packet and decode the reply
    pub fn send_packet(&mut self, packet: TraciPacket) -> Result<Vec<Response>> {
        write_packet(&mut self.writer, &packet.send()?)?;

        let body = read_packet(&mut self.reader, self.max_packet_size)?
            .ok_or_else(|| TraciError::Network("server closed the connection".to_string()))?;
        Response::decode_all(&self.table, body)
    }

    fn request(&mut self, command: Command) -> Result<Response> {
        let cmd_id = self.table.id_of(command.cmd());
        let response = self
            .send_commands(std::slice::from_ref(&command))?
            .into_iter()
            .next()
            .ok_or_else(|| TraciError::Framing("empty reply packet".to_string()))?;

        let status = response.status();
        if !status.is_ok() {
            return Err(TraciError::Rejected {
                cmd: cmd_id,
                description: status.description.clone(),
            });
        }
        Ok(response)
    }

    fn request_status(&mut self, command: Command) -> Result<StatusResponse> {
        let response = self.request(command)?;
        Ok(response.status().clone())
    }

    pub fn get_version(&mut self) -> Result<VersionResponse> {
        match self.request(Command::GetVersion)? {
            Response::Version(v) => Ok(v),
            other => Err(unexpected("version", &other)),
        }
    }

    /// Load a scenario by sending its JSON text
    pub fn send_file(&mut self, scenario_json: &str) -> Result<StatusResponse> {
        self.request_status(Command::SendFile {
            scenario: scenario_json.to_string(),
        })
    }

    /// Load a scenario from a file on the server's side
    pub fn load(&mut self, options: Vec<String>) -> Result<StatusResponse> {
        self.request_status(Command::Load { options })
    }

    /// Advance to `target_time`; zero or less advances by one step
    pub fn next_step(&mut self, target_time: f64) -> Result<SimTimeResponse> {
        match self.request(Command::SimStep { target_time })? {
            Response::SimTime(r) => Ok(r),
            other => Err(unexpected("simulation step", &other)),
        }
    }

    pub fn get_value(
        &mut self,
        domain: Domain,
        variable_id: u8,
        element_id: &str,
    ) -> Result<GetResponse> {
        let command = Command::Get(GetCommand::new(domain, variable_id, element_id));
        match self.request(command)? {
            Response::Get(r) => Ok(r),
            other => Err(unexpected("value", &other)),
        }
    }

    pub fn set_value(
        &mut self,
        domain: Domain,
        variable_id: u8,
        element_id: &str,
        value: TraciValue,
    ) -> Result<StatusResponse> {
        self.request_status(Command::Set(SetCommand::new(
            domain,
            variable_id,
            element_id,
            value,
        )))
    }

    /// End the session; the server closes the connection afterwards
    pub fn close(mut self) -> Result<StatusResponse> {
        self.request_status(Command::Close)
    }
}

fn unexpected(wanted: &str, got: &Response) -> TraciError {
    TraciError::Framing(format!("expected {} response, got {:?}", wanted, got))
}
