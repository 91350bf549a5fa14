pub mod action;
pub mod config;
pub mod error;
pub mod ipc;
pub mod process;
pub mod service;

pub use config::{ActionConfig, ActionEntry, DaemonConfig};
pub use error::{Error, Result};
pub use ipc::{DaemonClient, DaemonServer};
pub use service::{ActionOutcome, ActionSource, DaemonService, KillOutcome, ReloadOutcome};
