//! AdBounty CLI
//!
//! Command-line view of bounties, deals and payouts.

mod client;
mod commands;
mod style;

use clap::{Parser, Subcommand};
use style::*;

#[derive(Parser)]
#[command(name = "adbounty")]
#[command(version)]
#[command(about = "AdBounty - Ad marketplace for Telegram channels", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// AdBounty API endpoint
    #[arg(
        short,
        long,
        env = "BACKEND_URL",
        default_value = "http://localhost:8000",
        global = true
    )]
    api: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the API is up
    Health,

    /// Show a single bounty
    #[command(visible_alias = "b")]
    Bounty {
        /// Bounty id, e.g. bounty_1
        bounty_id: String,
    },

    /// List bounties you created as an advertiser
    #[command(visible_alias = "mb")]
    MyBounties {
        /// Your Telegram user id
        #[arg(short, long, env = "TELEGRAM_ID")]
        user: i64,
    },

    /// List your bids and the bounties they target
    #[command(visible_alias = "d")]
    Deals {
        /// Your Telegram user id
        #[arg(short, long, env = "TELEGRAM_ID")]
        user: i64,
    },

    /// Show payouts sent or received
    #[command(visible_alias = "tx")]
    Transactions {
        /// Your Telegram user id
        #[arg(short, long, env = "TELEGRAM_ID")]
        user: i64,
    },

    /// List verified channels
    #[command(visible_alias = "ch")]
    Channels,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    let client = client::AdBountyClient::new(&cli.api);

    let result = match cli.command {
        Commands::Health => commands::health::run(&client).await,
        Commands::Bounty { bounty_id } => commands::bounty::run(&client, &bounty_id).await,
        Commands::MyBounties { user } => commands::bounties::run(&client, user).await,
        Commands::Deals { user } => commands::deals::run(&client, user).await,
        Commands::Transactions { user } => commands::transactions::run(&client, user).await,
        Commands::Channels => commands::channels::run(&client).await,
    };

    if let Err(e) = result {
        print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
