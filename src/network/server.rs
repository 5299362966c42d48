//! TCP Server
//!
//! Accepts TraCI clients one at a time and serves each until it closes.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, TraciError};
use crate::session::RemoteManager;

use super::connection::Connection;
use super::handler::CommandHandler;

/// How often the accept loop checks the shutdown flag
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for the TraCI manager
///
/// TraCI is a single-client protocol: the simulation is driven by exactly
/// one peer, so connections are served sequentially on the calling thread.
pub struct Server {
    config: Arc<Config>,
    handler: Arc<CommandHandler>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, session: Arc<RemoteManager>) -> Result<Self> {
        let config = Arc::new(config);
        let handler = Arc::new(CommandHandler::new(Arc::clone(&config), session)?);

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            TraciError::Network(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            handler,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Signal the server to shut down.
    ///
    /// Takes effect between connections; a client being served is not cut off.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Accept and serve clients until shutdown (blocking)
    pub fn run(&self) -> Result<()> {
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::info!("Client connected from {}", addr);
                    stream.set_nonblocking(false)?;
                    self.serve(stream);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Server shutting down");
        self.handler.session().close();
        Ok(())
    }

    fn serve(&self, stream: std::net::TcpStream) {
        let mut conn = match Connection::new(
            stream,
            Arc::clone(&self.handler),
            self.config.max_packet_size,
        ) {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Failed to set up connection: {}", e);
                return;
            }
        };

        let timeouts = conn.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms);
        if let Err(e) = timeouts {
            tracing::warn!("Failed to set timeouts for {}: {}", conn.peer_addr(), e);
        }

        match conn.handle() {
            Ok(()) => tracing::info!("Client {} done", conn.peer_addr()),
            Err(e) => tracing::warn!("Connection {} failed: {}", conn.peer_addr(), e),
        }
    }
}
