//! Network Module
//!
//! TCP server, per-connection loop, command dispatch and a blocking client.
//!
//! ## Architecture
//! ```text
//!   TcpListener ──accept──▶ Connection ──packet body──▶ CommandHandler
//!                               ▲                            │
//!                               └──────── reply packet ◀─────┤
//!                                                            ▼
//!                                                      RemoteManager
//! ```
//! - One client at a time, served on the accepting thread
//! - Each inbound packet gets exactly one reply packet
//! - Per-command failures become ERR statuses; only socket errors end the
//!   connection

mod client;
mod connection;
mod handler;
mod server;

pub use client::TraciClient;
pub use connection::Connection;
pub use handler::{CommandHandler, Flow};
pub use server::Server;
