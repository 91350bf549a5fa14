//! IPC Server for daemon
//!
//! Listens on Unix socket and dispatches client requests to the
//! [`DaemonService`].

use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::protocol::*;
use crate::service::DaemonService;
use crate::Result;

/// Maximum number of requests processed at the same time
const MAX_CONCURRENT_REQUESTS: usize = 8;

/// IPC Server that handles client connections
pub struct DaemonServer {
    service: Arc<DaemonService>,
    socket_path: PathBuf,
    request_semaphore: Arc<Semaphore>,
}

impl DaemonServer {
    pub fn new(service: Arc<DaemonService>, socket_path: PathBuf) -> Self {
        Self {
            service,
            socket_path,
            request_semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        }
    }

    /// Run the IPC server until `shutdown_rx` turns true
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        // Remove old socket file if exists
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = bind_private(&self.socket_path)?;
        info!("IPC server listening on: {}", self.socket_path.display());

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let service = self.service.clone();
                            let semaphore = self.request_semaphore.clone();
                            // Runs to completion even if the client hangs up mid-request
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, service, semaphore).await {
                                    warn!("Error handling connection: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                result = shutdown_rx.changed() => {
                    // A dropped sender also means shutdown
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("IPC server shutting down");
                        break;
                    }
                }
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }
}

/// Bind `path` so that no other user can ever connect.
///
/// The socket is created inside a fresh 0700 directory, restricted to 0600,
/// then renamed into place.
fn bind_private(path: &Path) -> std::io::Result<UnixListener> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("hyprdrive.sock");
    let staging = parent.join(format!(".bind-{}", std::process::id()));

    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    std::fs::DirBuilder::new().mode(0o700).create(&staging)?;

    let staged = staging.join(name);
    let result = UnixListener::bind(&staged).and_then(|listener| {
        std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(0o600))?;
        std::fs::rename(&staged, path)?;
        Ok(listener)
    });

    let _ = std::fs::remove_dir_all(&staging);
    result
}

async fn handle_connection(
    stream: UnixStream,
    service: Arc<DaemonService>,
    semaphore: Arc<Semaphore>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // Connection closed
        }

        let _permit = semaphore
            .acquire()
            .await
            .map_err(|e| crate::Error::Other(format!("Failed to acquire semaphore: {}", e)))?;

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                debug!("Received request: {} (id: {})", request.method, request.id);
                handle_request(request, &service).await
            }
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                Response::error(Uuid::nil(), ERR_PARSE, format!("Parse error: {}", e))
            }
        };

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

async fn handle_request(request: Request, service: &DaemonService) -> Response {
    let id = request.id;

    match request.method.as_str() {
        methods::PING => Response::from_serializable(id, &PingResponse { ok: true }),

        methods::STATUS => Response::from_serializable(id, &service.status().await),

        methods::ACTION_PERFORM => {
            match serde_json::from_value::<PerformActionParams>(request.params) {
                Ok(params) => {
                    let outcome = service
                        .perform_action(&params.section, &params.key, &params.args)
                        .await;
                    Response::from_serializable(id, &outcome)
                }
                Err(e) => Response::error(id, ERR_INVALID_PARAMS, e.to_string()),
            }
        }

        methods::PROCESS_LIST => {
            let processes = service.list_processes().await;
            Response::from_serializable(id, &ProcessListResponse { processes })
        }

        methods::PROCESS_KILL => match serde_json::from_value::<KillParams>(request.params) {
            Ok(params) => Response::from_serializable(id, &service.kill_process(params.pid).await),
            Err(e) => Response::error(id, ERR_INVALID_PARAMS, e.to_string()),
        },

        methods::CONFIG_RELOAD => Response::from_serializable(id, &service.reload_config().await),

        _ => Response::error(id, ERR_METHOD_NOT_FOUND, "Method not found"),
    }
}
