use anyhow::Result;

use hyprdrive_core::DaemonClient;

pub async fn run(client: &DaemonClient) -> Result<()> {
    let outcome = client.reload_config().await?;
    println!("{}", outcome.message());
    Ok(())
}
