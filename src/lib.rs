//! AdBounty - Ad marketplace backend for Telegram channels
//!
//! Advertisers fund bounties to get an ad posted to channels; channel owners
//! bid, post the ad, and are paid once views are confirmed.
//!
//! # How it works
//!
//! 1. Users authenticate with their Telegram id (first call creates the user)
//! 2. Channel owners verify their channels
//! 3. Advertisers create bounties (`pending`)
//! 4. Channel owners bid; the bot posts the ad (`posted`)
//! 5. Views are confirmed (`confirmed`) and a payout is appended to the ledger
//!
//! Ad posts and payout notices are relayed to Telegram in the background and
//! never block or roll back the ledger.

pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod server;
pub mod sqlite_storage;
pub mod storage;
pub mod telegram;

pub use config::{Config, StorageBackend};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{AuthOutcome, BountyLedger};
pub use notify::{Notification, NotificationGateway, NotificationRelay, NotificationSender};
pub use sqlite_storage::SqliteStorage;
pub use storage::{LedgerStorage, MemoryStorage};
pub use telegram::{LogGateway, TelegramGateway};
