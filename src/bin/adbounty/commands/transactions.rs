//! Transactions command

use crate::client::AdBountyClient;
use crate::style::*;
use anyhow::Result;

pub async fn run(client: &AdBountyClient, user_id: i64) -> Result<()> {
    print_header("Transaction History");

    let txs = client.transactions(user_id).await?;
    if txs.is_empty() {
        print_info("No transactions yet.");
        return Ok(());
    }

    println!();
    println!(
        "{:<8}  {:<8}  {:>12}  {:<12}  {:<16}  Counterparty",
        "Tx", "Type", "TON", "Bounty", "Date"
    );
    println!("{}", "─".repeat(80));

    let mut received = 0.0;
    let mut paid = 0.0;
    for tx in &txs {
        let incoming = tx.to_user == user_id;
        let (amount, counterparty) = if incoming {
            received += tx.amount;
            (format!("{:>12}", format!("+{}", tx.amount)), tx.from_user)
        } else {
            paid += tx.amount;
            (format!("{:>12}", format!("-{}", tx.amount)), tx.to_user)
        };
        println!(
            "{:<8}  {:<8}  {}  {:<12}  {:<16}  {}",
            tx.tx_id,
            tx.tx_type,
            if incoming {
                style_green(&amount)
            } else {
                style_red(&amount)
            },
            tx.bounty_id.as_deref().unwrap_or("-"),
            tx.created_at.format("%Y-%m-%d %H:%M"),
            counterparty
        );
    }

    println!();
    println!("Received: {} TON", style_green(&received.to_string()));
    println!("Paid:     {} TON", style_red(&paid.to_string()));

    Ok(())
}
