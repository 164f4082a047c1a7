//! Channels command - verified channel directory

use crate::client::AdBountyClient;
use crate::style::*;
use anyhow::Result;

pub async fn run(client: &AdBountyClient) -> Result<()> {
    print_header("Verified Channels");

    let channels = client.verified_channels().await?;
    if channels.is_empty() {
        print_info("No verified channels yet.");
        return Ok(());
    }

    println!();
    println!(
        "{:<16}  {:<24}  {:>12}  {:<14}  Owner",
        "Channel", "Name", "Subscribers", "Niche"
    );
    println!("{}", "─".repeat(80));

    for ch in &channels {
        println!(
            "{:<16}  {:<24}  {:>12}  {:<14}  {}",
            ch.channel_id,
            truncate_text(&ch.channel_name, 24),
            ch.subscribers,
            ch.niche,
            style_dim(&ch.owner_id.to_string())
        );
    }

    println!();
    println!("Total channels: {}", channels.len());

    Ok(())
}
