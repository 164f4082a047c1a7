//! Deals command - bids placed by a channel owner

use crate::client::AdBountyClient;
use crate::style::*;
use anyhow::Result;

pub async fn run(client: &AdBountyClient, user_id: i64) -> Result<()> {
    print_header("📋 Your Active Deals");

    let deals = client.user_deals(user_id).await?;
    if deals.is_empty() {
        print_info("You don't have any active deals yet.");
        return Ok(());
    }

    for deal in &deals {
        println!();
        println!("📢 {}", style_bold(&truncate_text(&deal.ad_text, 60)));
        println!("   💰 {} TON", deal.amount);
        println!(
            "   Bounty {} ({})  Bid {} ({})",
            deal.bounty_id,
            style_status(deal.bounty_status),
            deal.bid_id,
            deal.bid_status
        );
        println!("   Channel: {}", style_dim(&deal.channel_id.to_string()));
    }

    println!();
    println!("Total deals: {}", deals.len());

    Ok(())
}
