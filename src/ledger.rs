//! Bounty ledger
//!
//! Owns the marketplace state machine:
//!
//! - users are upserted on first authentication (first write wins)
//! - channels are verified on registration (last write wins)
//! - bounties move `pending -> posted -> confirmed`
//! - every confirmation appends one payout to the append-only ledger
//!
//! All operations run under a single lock around the storage, so the writes of
//! one operation become visible together. Notifications are queued only after
//! the lock is released.

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Bid, BidStatus, Bounty, BountyStatus, Channel, ChannelId, Deal, NewBounty, Transaction,
    TxStatus, TxType, User, UserId,
};
use crate::notify::{Notification, NotificationSender};
use crate::storage::{IdKind, LedgerStorage};

pub const DEFAULT_DEADLINE_DAYS: i64 = 7;

/// Upper bound on `deadline_days` in either direction (100 years)
const MAX_DEADLINE_DAYS: i64 = 36_500;

/// Result of [`BountyLedger::authenticate`]
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: User,
    pub created: bool,
}

pub struct BountyLedger {
    storage: Mutex<Box<dyn LedgerStorage>>,
    notifier: Option<NotificationSender>,
    default_deadline_days: i64,
}

impl BountyLedger {
    pub fn new(storage: Box<dyn LedgerStorage>) -> Self {
        Self {
            storage: Mutex::new(storage),
            notifier: None,
            default_deadline_days: DEFAULT_DEADLINE_DAYS,
        }
    }

    pub fn with_notifier(mut self, notifier: NotificationSender) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_default_deadline_days(mut self, days: i64) -> Self {
        let clamped = days.clamp(-MAX_DEADLINE_DAYS, MAX_DEADLINE_DAYS);
        if clamped != days {
            warn!(
                "default_deadline_days {} out of range, using {}",
                days, clamped
            );
        }
        self.default_deadline_days = clamped;
        self
    }

    fn notify(&self, msg: Notification) {
        if let Some(notifier) = &self.notifier {
            notifier.send(msg);
        }
    }

    // ========================================================================
    // IDENTITY & CHANNELS
    // ========================================================================

    /// Return the existing user unchanged, or create it
    pub fn authenticate(&self, telegram_id: UserId, username: &str) -> LedgerResult<AuthOutcome> {
        let mut storage = self.storage.lock();
        if let Some(user) = storage.get_user(telegram_id)? {
            debug!("User {} already exists", telegram_id);
            return Ok(AuthOutcome {
                user,
                created: false,
            });
        }

        let user = User {
            telegram_id,
            username: username.to_string(),
            wallet_address: None,
            created_at: Utc::now(),
        };
        storage.put_user(&user)?;
        info!("User authenticated: {}", telegram_id);
        Ok(AuthOutcome {
            user,
            created: true,
        })
    }

    pub fn update_wallet(&self, telegram_id: UserId, wallet_address: &str) -> LedgerResult<User> {
        let mut storage = self.storage.lock();
        let mut user = storage
            .get_user(telegram_id)?
            .ok_or(LedgerError::UserNotFound(telegram_id))?;
        user.wallet_address = Some(wallet_address.to_string());
        storage.put_user(&user)?;
        info!("Wallet updated for user {}", telegram_id);
        Ok(user)
    }

    /// Register a channel as verified, replacing any earlier record
    pub fn verify_channel(
        &self,
        channel_id: ChannelId,
        channel_name: &str,
        owner_id: UserId,
        subscribers: i64,
        niche: &str,
    ) -> LedgerResult<Channel> {
        let channel = Channel {
            channel_id,
            channel_name: channel_name.to_string(),
            subscribers,
            niche: niche.to_string(),
            verified: true,
            owner_id,
            created_at: Utc::now(),
        };
        let mut storage = self.storage.lock();
        if let Some(previous) = storage.get_channel(channel_id)? {
            debug!(
                "Re-verifying channel {} (previous owner: {})",
                channel_id, previous.owner_id
            );
        }
        storage.put_channel(&channel)?;
        info!("Channel verified: {}", channel_id);
        Ok(channel)
    }

    pub fn list_verified_channels(&self) -> LedgerResult<Vec<Channel>> {
        let channels = self.storage.lock().list_channels()?;
        Ok(channels.into_iter().filter(|c| c.verified).collect())
    }

    // ========================================================================
    // BOUNTY LIFECYCLE
    // ========================================================================

    pub fn create_bounty(&self, req: NewBounty) -> LedgerResult<Bounty> {
        if !req.ton_amount.is_finite() {
            return Err(LedgerError::Validation(
                "ton_amount must be a finite number".to_string(),
            ));
        }
        if let Some(days) = req.deadline_days {
            if !(-MAX_DEADLINE_DAYS..=MAX_DEADLINE_DAYS).contains(&days) {
                return Err(LedgerError::Validation(format!(
                    "deadline_days must be within ±{}",
                    MAX_DEADLINE_DAYS
                )));
            }
        }

        let mut storage = self.storage.lock();
        let bounty_id = IdKind::Bounty.format(storage.next_id(IdKind::Bounty)?);
        let bounty = Bounty::from_request(bounty_id, req, self.default_deadline_days);
        storage.put_bounty(&bounty)?;
        info!("Bounty created: {}", bounty.bounty_id);
        Ok(bounty)
    }

    pub fn get_bounty(&self, bounty_id: &str) -> LedgerResult<Bounty> {
        self.storage
            .lock()
            .get_bounty(bounty_id)?
            .ok_or_else(|| LedgerError::BountyNotFound(bounty_id.to_string()))
    }

    pub fn list_bounties_for_advertiser(&self, advertiser_id: UserId) -> LedgerResult<Vec<Bounty>> {
        let bounties = self.storage.lock().list_bounties()?;
        Ok(bounties
            .into_iter()
            .filter(|b| b.advertiser_id == advertiser_id)
            .collect())
    }

    /// Record a pending bid. Repeated bids by the same owner are allowed.
    pub fn place_bid(
        &self,
        bounty_id: &str,
        channel_owner_id: UserId,
        channel_id: ChannelId,
    ) -> LedgerResult<Bid> {
        let mut storage = self.storage.lock();
        if storage.get_bounty(bounty_id)?.is_none() {
            return Err(LedgerError::BountyNotFound(bounty_id.to_string()));
        }

        let bid = Bid {
            bid_id: IdKind::Bid.format(storage.next_id(IdKind::Bid)?),
            bounty_id: bounty_id.to_string(),
            channel_owner_id,
            channel_id,
            status: BidStatus::Pending,
            created_at: Utc::now(),
        };
        storage.insert_bid(&bid)?;
        info!("Bid placed: {} on bounty {}", bid.bid_id, bounty_id);
        Ok(bid)
    }

    /// Bids placed by a channel owner, each with its bounty
    pub fn list_deals_for_owner(&self, channel_owner_id: UserId) -> LedgerResult<Vec<Deal>> {
        let storage = self.storage.lock();
        let mut deals = Vec::new();
        for bid in storage
            .list_bids()?
            .into_iter()
            .filter(|b| b.channel_owner_id == channel_owner_id)
        {
            if let Some(bounty) = storage.get_bounty(&bid.bounty_id)? {
                deals.push(Deal::new(bid, &bounty));
            }
        }
        Ok(deals)
    }

    /// Flip the bounty to `posted` and queue the ad for the channel
    pub fn mark_posted(&self, bounty_id: &str, channel_id: ChannelId) -> LedgerResult<Bounty> {
        let bounty = {
            let mut storage = self.storage.lock();
            let mut bounty = storage
                .get_bounty(bounty_id)?
                .ok_or_else(|| LedgerError::BountyNotFound(bounty_id.to_string()))?;

            if matches!(
                bounty.status,
                BountyStatus::Confirmed | BountyStatus::Cancelled
            ) {
                return Err(LedgerError::InvalidTransition {
                    bounty_id: bounty_id.to_string(),
                    from: bounty.status,
                    to: BountyStatus::Posted,
                });
            }

            bounty.status = BountyStatus::Posted;
            storage.put_bounty(&bounty)?;
            bounty
        };

        info!("Ad posted to channel {} for bounty {}", channel_id, bounty_id);
        self.notify(Notification::PostAd {
            bounty_id: bounty.bounty_id.clone(),
            channel_id,
            ad_text: bounty.ad_text.clone(),
            ad_link: bounty.ad_link.clone(),
        });
        Ok(bounty)
    }

    /// Confirm the bounty and pay its full amount to the channel owner.
    ///
    /// A bounty is paid at most once: confirming an already confirmed bounty
    /// fails with [`LedgerError::AlreadyConfirmed`] and writes nothing.
    pub fn confirm_views(
        &self,
        bounty_id: &str,
        channel_owner_id: UserId,
        proof_url: Option<&str>,
    ) -> LedgerResult<(Bounty, Transaction)> {
        let (bounty, tx) = {
            let mut storage = self.storage.lock();
            let mut bounty = storage
                .get_bounty(bounty_id)?
                .ok_or_else(|| LedgerError::BountyNotFound(bounty_id.to_string()))?;

            match bounty.status {
                BountyStatus::Confirmed => {
                    return Err(LedgerError::AlreadyConfirmed(bounty_id.to_string()))
                }
                BountyStatus::Cancelled => {
                    return Err(LedgerError::InvalidTransition {
                        bounty_id: bounty_id.to_string(),
                        from: bounty.status,
                        to: BountyStatus::Confirmed,
                    })
                }
                BountyStatus::Pending | BountyStatus::Posted => {}
            }

            let tx = Transaction {
                tx_id: IdKind::Transaction.format(storage.next_id(IdKind::Transaction)?),
                from_user: bounty.advertiser_id,
                to_user: channel_owner_id,
                amount: bounty.ton_amount,
                tx_type: TxType::Payout,
                status: TxStatus::Success,
                bounty_id: Some(bounty.bounty_id.clone()),
                tx_hash: None,
                created_at: Utc::now(),
            };

            bounty.status = BountyStatus::Confirmed;
            storage.record_confirmation(&bounty, &tx)?;
            (bounty, tx)
        };

        info!(
            "Views confirmed for bounty {}, payout {} triggered (proof: {})",
            bounty_id,
            tx.tx_id,
            proof_url.unwrap_or("none")
        );
        self.notify(Notification::PayoutReleased {
            user_id: channel_owner_id,
            amount: tx.amount,
            bounty_id: bounty.bounty_id.clone(),
        });
        Ok((bounty, tx))
    }

    // ========================================================================
    // TRANSACTION LEDGER
    // ========================================================================

    pub fn list_transactions_for_user(&self, user_id: UserId) -> LedgerResult<Vec<Transaction>> {
        let txs = self.storage.lock().list_transactions()?;
        Ok(txs.into_iter().filter(|tx| tx.involves(user_id)).collect())
    }
}
