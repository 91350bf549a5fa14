use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The daemon could not be reached or the connection broke mid-call
    #[error("Transport error: {0}")]
    Transport(String),

    /// The daemon answered with an RPC-level error
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when the daemon could not be reached at all
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
