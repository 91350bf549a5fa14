use anyhow::Result;
use chrono::Local;

use hyprdrive_core::DaemonClient;

pub async fn run(client: &DaemonClient) -> Result<()> {
    let processes = client.list_processes().await?;

    if processes.is_empty() {
        println!("No processes running");
        return Ok(());
    }

    println!("Running processes:");

    for process in &processes {
        println!("PID: {}", process.pid);
        println!("  Command: {}", process.command_line());
        println!(
            "  Started: {}",
            process.start_time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
        println!("  Runtime: {:.1} seconds", process.runtime_secs);
        println!("  Section: {}", process.section);
        println!("  Key: {}", process.key);
        println!("  Log: {}", process.log_path.display());
        println!("---");
    }

    Ok(())
}
