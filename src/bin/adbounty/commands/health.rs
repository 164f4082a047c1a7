//! Health command

use crate::client::AdBountyClient;
use crate::style::*;
use anyhow::Result;

pub async fn run(client: &AdBountyClient) -> Result<()> {
    let health = client.health().await?;

    if health.status == "healthy" {
        print_success(&format!("{} is healthy", health.service));
    } else {
        print_error(&format!("{} reports: {}", health.service, health.status));
    }
    println!("Server time:      {}", health.timestamp);
    if let Some(version) = health.version {
        println!("Version:          {}", version);
    }
    if let Some(uptime) = health.uptime_secs {
        println!("Uptime:           {}s", uptime);
    }

    Ok(())
}
