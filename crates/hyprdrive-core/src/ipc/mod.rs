//! IPC module for daemon-client communication
//!
//! Unix socket based, newline-delimited JSON-RPC. The socket is local only
//! and created with mode 0600.

mod client;
mod protocol;
mod server;

pub use client::{is_daemon_running, DaemonClient};
pub use protocol::*;
pub use server::DaemonServer;
