//! My-bounties command

use crate::client::AdBountyClient;
use crate::style::*;
use anyhow::Result;

pub async fn run(client: &AdBountyClient, user_id: i64) -> Result<()> {
    print_header("📊 Your Bounties");

    let bounties = client.user_bounties(user_id).await?;
    if bounties.is_empty() {
        print_info("You don't have any bounties yet. Create one to get started!");
        return Ok(());
    }

    println!();
    println!(
        "{:<12}  {:>10}  {:<10}  {:<16}  Ad",
        "Bounty", "TON", "Status", "Deadline"
    );
    println!("{}", "─".repeat(75));

    for bounty in &bounties {
        // pad outside the ANSI codes so columns stay aligned
        let pad = " ".repeat(10usize.saturating_sub(bounty.status.as_str().len()));
        println!(
            "{:<12}  {:>10}  {}{}  {:<16}  {}",
            bounty.bounty_id,
            bounty.ton_amount,
            style_status(bounty.status),
            pad,
            bounty.deadline.format("%Y-%m-%d %H:%M"),
            style_dim(&truncate_text(&bounty.ad_text, 30))
        );
    }

    println!();
    println!("Total bounties: {}", bounties.len());

    Ok(())
}
