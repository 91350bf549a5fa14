use anyhow::Result;

use hyprdrive_core::DaemonClient;

pub async fn run(client: &DaemonClient, pid: u32) -> Result<()> {
    let outcome = client.kill_process(pid).await?;
    println!("{}", outcome.message());
    Ok(())
}
