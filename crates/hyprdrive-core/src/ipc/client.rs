//! IPC Client for connecting to daemon
//!
//! Provides a type-safe interface for communicating with the daemon. Calls are
//! never retried; a daemon that cannot be reached surfaces as
//! [`Error::Transport`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use super::protocol::*;
use crate::process::ProcessInfo;
use crate::service::{ActionOutcome, KillOutcome, ReloadOutcome, StatusResponse};
use crate::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for communicating with the daemon
#[derive(Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound every round trip by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Check if daemon is running by sending a ping
    pub async fn ping(&self) -> Result<bool> {
        match self.call(methods::PING, serde_json::Value::Null).await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        let result = self.call(methods::STATUS, serde_json::Value::Null).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Run the action `key` from `section` with extra arguments
    pub async fn perform_action(
        &self,
        section: &str,
        key: &str,
        args: &[String],
    ) -> Result<ActionOutcome> {
        let params = serde_json::to_value(PerformActionParams {
            section: section.to_string(),
            key: key.to_string(),
            args: args.to_vec(),
        })?;
        let result = self.call(methods::ACTION_PERFORM, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn list_processes(&self) -> Result<Vec<ProcessInfo>> {
        let result = self.call(methods::PROCESS_LIST, serde_json::Value::Null).await?;
        let response: ProcessListResponse = serde_json::from_value(result)?;
        Ok(response.processes)
    }

    pub async fn kill_process(&self, pid: u32) -> Result<KillOutcome> {
        let params = serde_json::json!({ "pid": pid });
        let result = self.call(methods::PROCESS_KILL, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn reload_config(&self) -> Result<ReloadOutcome> {
        let result = self.call(methods::CONFIG_RELOAD, serde_json::Value::Null).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        tokio::time::timeout(self.timeout, self.exchange(method, params))
            .await
            .map_err(|_| {
                Error::Transport(format!(
                    "Daemon at {} did not answer '{}' within {}s",
                    self.socket_path.display(),
                    method,
                    self.timeout.as_secs()
                ))
            })?
    }

    /// Send a request and receive a response
    async fn exchange(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            Error::Transport(format!(
                "Failed to connect to daemon at {}: {}. Is the daemon running? Start it with `hyprdrive daemon start`",
                self.socket_path.display(),
                e
            ))
        })?;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let request = Request::new(method).with_params(params);
        let request_json = serde_json::to_string(&request)?;

        let lost = |e: std::io::Error| Error::Transport(format!("Lost connection to daemon: {}", e));

        writer.write_all(request_json.as_bytes()).await.map_err(lost)?;
        writer.write_all(b"\n").await.map_err(lost)?;
        writer.flush().await.map_err(lost)?;

        let mut response_line = String::new();
        let bytes_read = reader.read_line(&mut response_line).await.map_err(lost)?;
        if bytes_read == 0 {
            return Err(Error::Transport(
                "Daemon closed the connection without answering".to_string(),
            ));
        }

        let response: Response = serde_json::from_str(&response_line)?;

        if let Some(error) = response.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        response
            .result
            .ok_or_else(|| Error::Other("Empty response".to_string()))
    }
}

/// Check if daemon is reachable
pub async fn is_daemon_running(socket_path: &Path) -> bool {
    let client = DaemonClient::new(socket_path.to_path_buf());
    client.ping().await.unwrap_or(false)
}
