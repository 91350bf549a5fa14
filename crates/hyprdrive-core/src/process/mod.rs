//! Spawned child processes and the table that tracks them
//!
//! Every successful launch registers a [`ProcessRecord`] keyed by pid and
//! starts a reaper task that waits for the child to exit, drops the record and
//! deletes the child's log file. Logs of children still running when the
//! daemon dies are left behind.

mod models;
mod table;

pub use models::{ProcessInfo, ProcessRecord};
pub use table::{ProcessTable, KILL_GRACE};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Command is empty")]
    EmptyCommand,

    #[error("Executable '{program}' not found: {message}")]
    NotFound { program: String, message: String },

    #[error("Failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("Cannot create log file {path}: {message}")]
    LogFile { path: String, message: String },
}

impl LaunchError {
    fn from_spawn(program: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            LaunchError::NotFound {
                program: program.to_string(),
                message: err.to_string(),
            }
        } else {
            LaunchError::Spawn {
                program: program.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KillError {
    #[error("Process {0} is not tracked")]
    NotTracked(u32),

    #[error("Failed to signal process {pid}: {message}")]
    Signal { pid: u32, message: String },
}
