//! Connection Handler
//!
//! Handles a single TraCI client connection.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TraciError};
use crate::protocol::{read_packet, write_packet, StatusCode, TraciPacket};

use super::handler::{CommandHandler, Flow};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Executes the commands of each packet
    handler: Arc<CommandHandler>,

    /// Largest inbound packet accepted
    max_packet_size: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        handler: Arc<CommandHandler>,
        max_packet_size: usize,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm; every reply is a single small packet
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            handler,
            max_packet_size,
            peer_addr,
        })
    }

    /// Configure connection timeouts; zero leaves a direction unbounded
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve packets until the client disconnects, sends CLOSE or a fatal
    /// error occurs.
    ///
    /// Every inbound packet is answered with exactly one outbound packet.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let body = match read_packet(&mut self.reader, self.max_packet_size) {
                Ok(Some(body)) => body,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(TraciError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Connection to {} ended: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(TraciError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    // the stream cannot be resynchronized after a bad length field
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let reply = TraciPacket::send_status(0x00, StatusCode::Err, "malformed packet");
                    if let Ok(packet) = reply {
                        let _ = self.send(packet);
                    }
                    return Err(e);
                }
            };

            tracing::trace!("Received {} byte packet from {}", body.len(), self.peer_addr);

            let (packet, flow) = self.handler.handle_packet(body)?;

            if let Err(e) = self.send(packet) {
                if let TraciError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) || io_err.kind() == ErrorKind::BrokenPipe {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }

            if flow == Flow::Close {
                tracing::info!("Client {} closed the session", self.peer_addr);
                return Ok(());
            }
        }
    }

    fn send(&mut self, packet: TraciPacket) -> Result<()> {
        let bytes = packet.send()?;
        write_packet(&mut self.writer, &bytes)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}
