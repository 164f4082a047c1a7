//! Bounty command - show one bounty

use crate::client::AdBountyClient;
use crate::style::*;
use anyhow::Result;

pub async fn run(client: &AdBountyClient, bounty_id: &str) -> Result<()> {
    let bounty = client.get_bounty(bounty_id).await?;

    print_header(&format!("Bounty {}", bounty.bounty_id));
    println!("Status:           {}", style_status(bounty.status));
    println!("Amount:           {} TON", style_bold(&bounty.ton_amount.to_string()));
    println!("Advertiser:       {}", bounty.advertiser_id);
    println!("Ad text:          {}", bounty.ad_text);
    println!("Ad link:          {}", style_cyan(&bounty.ad_link));
    println!(
        "Target channels:  {}",
        bounty
            .target_channels
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let Some(escrow) = &bounty.escrow_address {
        println!("Escrow:           {}", escrow);
    }
    println!("Created:          {}", bounty.created_at.format("%Y-%m-%d %H:%M"));
    println!("Deadline:         {}", bounty.deadline.format("%Y-%m-%d %H:%M"));

    Ok(())
}
