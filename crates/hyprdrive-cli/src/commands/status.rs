use anyhow::Result;

use hyprdrive_core::DaemonClient;

pub async fn run(client: &DaemonClient) -> Result<()> {
    let status = client.status().await?;

    println!("Daemon is running (uptime: {}s)", status.uptime_secs);
    println!("  Socket: {}", client.socket_path().display());
    println!("  Tracked processes: {}", status.processes);

    match (&status.config_path, status.config_loaded) {
        (Some(path), true) => println!("  Actions: {}", path.display()),
        (Some(path), false) => println!("  Actions: {} (not loaded)", path.display()),
        (None, _) => println!("  Actions: no configuration file found"),
    }
    if let Some(error) = &status.config_error {
        println!("  Config error: {}", error);
    }

    Ok(())
}
