//! Marketplace records
//!
//! Field names follow the JSON wire format consumed by the mini app and bots.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Telegram user id (also used for channel owners and advertisers)
pub type UserId = i64;

/// Telegram chat id of a channel (usually negative, e.g. -100...)
pub type ChannelId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub telegram_id: UserId,
    pub username: String,
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub subscribers: i64,
    pub niche: String,
    pub verified: bool,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounty {
    pub bounty_id: String,
    pub advertiser_id: UserId,
    pub ton_amount: f64,
    pub ad_text: String,
    pub ad_link: String,
    pub target_channels: Vec<ChannelId>,
    pub status: BountyStatus,
    pub escrow_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub bid_id: String,
    pub bounty_id: String,
    pub channel_owner_id: UserId,
    pub channel_id: ChannelId,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: String,
    pub from_user: UserId,
    pub to_user: UserId,
    pub amount: f64,
    pub tx_type: TxType,
    pub status: TxStatus,
    pub bounty_id: Option<String>,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// True when the user is either side of the transfer
    pub fn involves(&self, user_id: UserId) -> bool {
        self.from_user == user_id || self.to_user == user_id
    }
}

/// Input for bounty creation
#[derive(Debug, Clone, Deserialize)]
pub struct NewBounty {
    pub advertiser_id: UserId,
    pub ton_amount: f64,
    pub ad_text: String,
    pub ad_link: String,
    pub target_channels: Vec<ChannelId>,
    #[serde(default)]
    pub deadline_days: Option<i64>,
}

impl Bounty {
    pub fn from_request(bounty_id: String, req: NewBounty, default_deadline_days: i64) -> Self {
        let created_at = Utc::now();
        let days = req.deadline_days.unwrap_or(default_deadline_days);
        Self {
            bounty_id,
            advertiser_id: req.advertiser_id,
            ton_amount: req.ton_amount,
            ad_text: req.ad_text,
            ad_link: req.ad_link,
            target_channels: req.target_channels,
            status: BountyStatus::Pending,
            escrow_address: None,
            created_at,
            deadline: created_at + Duration::days(days),
        }
    }
}

/// A deal is a bid seen together with the bounty it targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub bid_id: String,
    pub bounty_id: String,
    pub advertiser_id: UserId,
    pub channel_owner_id: UserId,
    pub channel_id: ChannelId,
    pub amount: f64,
    pub ad_text: String,
    pub bid_status: BidStatus,
    pub bounty_status: BountyStatus,
    pub created_at: DateTime<Utc>,
}

impl Deal {
    pub fn new(bid: Bid, bounty: &Bounty) -> Self {
        Self {
            bid_id: bid.bid_id,
            bounty_id: bid.bounty_id,
            advertiser_id: bounty.advertiser_id,
            channel_owner_id: bid.channel_owner_id,
            channel_id: bid.channel_id,
            amount: bounty.ton_amount,
            ad_text: bounty.ad_text.clone(),
            bid_status: bid.status,
            bounty_status: bounty.status,
            created_at: bid.created_at,
        }
    }
}

// ============================================================================
// STATUS ENUMERATIONS
// ============================================================================

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(LedgerError::Storage(format!(
                        "unknown {} value: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// Bounty lifecycle: pending -> posted -> confirmed.
/// `Cancelled` is declared but no operation produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BountyStatus {
    Pending,
    Posted,
    Confirmed,
    Cancelled,
}

string_enum!(BountyStatus {
    Pending => "pending",
    Posted => "posted",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
});

/// Only `Pending` is ever produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

string_enum!(BidStatus {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
    Completed => "completed",
});

/// Only `Payout` is ever produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Deposit,
    Payout,
    Refund,
}

string_enum!(TxType {
    Deposit => "deposit",
    Payout => "payout",
    Refund => "refund",
});

/// Only `Success` is ever produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

string_enum!(TxStatus {
    Pending => "pending",
    Success => "success",
    Failed => "failed",
});
