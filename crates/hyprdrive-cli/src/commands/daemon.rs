use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::sync::watch;
use tracing::{info, warn};

use hyprdrive_core::ipc::is_daemon_running as socket_answers;
use hyprdrive_core::{DaemonClient, DaemonConfig, DaemonServer, DaemonService};

/// Get the PID file path
fn pid_file_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("hyprdrive")
        .join("daemon.pid")
}

/// Check if daemon is running
fn is_daemon_running() -> Option<u32> {
    let pid_path = pid_file_path();
    if !pid_path.exists() {
        return None;
    }

    let mut file = fs::File::open(&pid_path).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    let pid: u32 = contents.trim().parse().ok()?;

    // Signal 0 only checks that the process exists
    if kill(Pid::from_raw(pid as i32), None).is_ok() {
        return Some(pid);
    }

    // Process not running, clean up stale PID file
    let _ = fs::remove_file(&pid_path);
    None
}

/// Write PID file
fn write_pid_file() -> Result<()> {
    let pid_path = pid_file_path();
    if let Some(parent) = pid_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(&pid_path)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(())
}

/// Remove PID file
fn remove_pid_file() {
    let _ = fs::remove_file(pid_file_path());
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

/// Start the daemon
pub async fn start(mut config: DaemonConfig, actions: Option<PathBuf>) -> Result<()> {
    if let Some(pid) = is_daemon_running() {
        println!("Daemon is already running (PID: {})", pid);
        return Ok(());
    }

    // Another instance may be running without a PID file
    if socket_answers(&config.socket_path()).await {
        println!(
            "A daemon is already answering on {}",
            config.socket_path().display()
        );
        return Ok(());
    }

    if actions.is_some() {
        config.actions_path = actions;
    }

    println!("Starting hyprdrive daemon...");

    write_pid_file()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let service = Arc::new(DaemonService::from_config(&config));
    let socket_path = config.socket_path();
    let server = DaemonServer::new(service, socket_path.clone());

    println!(
        "Daemon started (PID: {}). Press Ctrl+C or run 'hyprdrive daemon stop' to stop.",
        std::process::id()
    );
    println!("  Socket: {}", socket_path.display());
    println!("  Process logs: {}", config.log_dir().display());

    // Blocks until shutdown
    let result = server.run(shutdown_rx).await;

    remove_pid_file();
    result?;
    println!("Daemon stopped.");

    Ok(())
}

/// Stop the daemon
pub async fn stop() -> Result<()> {
    match is_daemon_running() {
        Some(pid) => {
            println!("Stopping daemon (PID: {})...", pid);
            let target = Pid::from_raw(pid as i32);

            if let Err(e) = kill(target, Signal::SIGTERM) {
                println!(
                    "Failed to stop daemon ({}). You may need to kill it manually: kill {}",
                    e, pid
                );
                return Ok(());
            }

            // Wait a moment for graceful shutdown
            tokio::time::sleep(Duration::from_secs(2)).await;

            if is_daemon_running().is_none() {
                println!("Daemon stopped successfully.");
            } else {
                let _ = kill(target, Signal::SIGKILL);
                remove_pid_file();
                println!("Daemon forcefully terminated.");
            }
        }
        None => {
            println!("Daemon is not running.");
        }
    }

    Ok(())
}

/// Show daemon status
pub async fn status(client: &DaemonClient) -> Result<()> {
    match is_daemon_running() {
        Some(pid) => {
            println!("Daemon is running (PID: {})", pid);
            println!("PID file: {}", pid_file_path().display());
            if !client.ping().await? {
                println!(
                    "Warning: socket {} is not answering",
                    client.socket_path().display()
                );
            }
        }
        None => {
            println!("Daemon is not running.");
        }
    }

    Ok(())
}
