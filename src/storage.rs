//! Ledger storage
//!
//! `LedgerStorage` is the repository seam: one set of CRUD calls per entity plus
//! the id sequences. The ledger serializes all access, so implementations take
//! `&mut self` and do no locking of their own.

use std::collections::HashMap;

use crate::error::LedgerResult;
use crate::models::{Bid, Bounty, Channel, ChannelId, Transaction, User, UserId};

/// Entities that receive sequence-derived ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Bounty,
    Bid,
    Transaction,
}

impl IdKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            IdKind::Bounty => "bounty",
            IdKind::Bid => "bid",
            IdKind::Transaction => "tx",
        }
    }

    /// Render a sequence value, e.g. `bounty_1`
    pub fn format(&self, seq: u64) -> String {
        format!("{}_{}", self.prefix(), seq)
    }
}

pub trait LedgerStorage: Send {
    /// Next value of a monotonic per-kind sequence, starting at 1
    fn next_id(&mut self, kind: IdKind) -> LedgerResult<u64>;

    fn get_user(&self, telegram_id: UserId) -> LedgerResult<Option<User>>;
    /// Insert or replace
    fn put_user(&mut self, user: &User) -> LedgerResult<()>;

    fn get_channel(&self, channel_id: ChannelId) -> LedgerResult<Option<Channel>>;
    /// Insert or replace; a replaced channel keeps its original list position
    fn put_channel(&mut self, channel: &Channel) -> LedgerResult<()>;
    fn list_channels(&self) -> LedgerResult<Vec<Channel>>;

    fn get_bounty(&self, bounty_id: &str) -> LedgerResult<Option<Bounty>>;
    fn put_bounty(&mut self, bounty: &Bounty) -> LedgerResult<()>;
    fn list_bounties(&self) -> LedgerResult<Vec<Bounty>>;

    fn insert_bid(&mut self, bid: &Bid) -> LedgerResult<()>;
    fn list_bids(&self) -> LedgerResult<Vec<Bid>>;

    fn list_transactions(&self) -> LedgerResult<Vec<Transaction>>;

    /// Store a confirmed bounty together with its payout; neither write is
    /// visible unless both succeed. Ledger entries are append-only.
    fn record_confirmation(&mut self, bounty: &Bounty, payout: &Transaction) -> LedgerResult<()>;
}

/// Keyed records kept in insertion order
#[derive(Debug)]
struct Ordered<K, V> {
    index: HashMap<K, usize>,
    items: Vec<V>,
}

impl<K: std::hash::Hash + Eq, V: Clone> Ordered<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            items: Vec::new(),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.index.get(key).map(|&i| self.items[i].clone())
    }

    fn upsert(&mut self, key: K, value: V) {
        match self.index.get(&key) {
            Some(&i) => self.items[i] = value,
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(value);
            }
        }
    }
}

/// Process-local storage; contents are lost on restart
#[derive(Debug)]
pub struct MemoryStorage {
    sequences: HashMap<IdKind, u64>,
    users: Ordered<UserId, User>,
    channels: Ordered<ChannelId, Channel>,
    bounties: Ordered<String, Bounty>,
    bids: Vec<Bid>,
    transactions: Vec<Transaction>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            sequences: HashMap::new(),
            users: Ordered::new(),
            channels: Ordered::new(),
            bounties: Ordered::new(),
            bids: Vec::new(),
            transactions: Vec::new(),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStorage for MemoryStorage {
    fn next_id(&mut self, kind: IdKind) -> LedgerResult<u64> {
        let seq = self.sequences.entry(kind).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    fn get_user(&self, telegram_id: UserId) -> LedgerResult<Option<User>> {
        Ok(self.users.get(&telegram_id))
    }

    fn put_user(&mut self, user: &User) -> LedgerResult<()> {
        self.users.upsert(user.telegram_id, user.clone());
        Ok(())
    }

    fn get_channel(&self, channel_id: ChannelId) -> LedgerResult<Option<Channel>> {
        Ok(self.channels.get(&channel_id))
    }

    fn put_channel(&mut self, channel: &Channel) -> LedgerResult<()> {
        self.channels.upsert(channel.channel_id, channel.clone());
        Ok(())
    }

    fn list_channels(&self) -> LedgerResult<Vec<Channel>> {
        Ok(self.channels.items.clone())
    }

    fn get_bounty(&self, bounty_id: &str) -> LedgerResult<Option<Bounty>> {
        Ok(self.bounties.get(&bounty_id.to_string()))
    }

    fn put_bounty(&mut self, bounty: &Bounty) -> LedgerResult<()> {
        self.bounties.upsert(bounty.bounty_id.clone(), bounty.clone());
        Ok(())
    }

    fn list_bounties(&self) -> LedgerResult<Vec<Bounty>> {
        Ok(self.bounties.items.clone())
    }

    fn insert_bid(&mut self, bid: &Bid) -> LedgerResult<()> {
        self.bids.push(bid.clone());
        Ok(())
    }

    fn list_bids(&self) -> LedgerResult<Vec<Bid>> {
        Ok(self.bids.clone())
    }

    fn list_transactions(&self) -> LedgerResult<Vec<Transaction>> {
        Ok(self.transactions.clone())
    }

    fn record_confirmation(&mut self, bounty: &Bounty, payout: &Transaction) -> LedgerResult<()> {
        self.bounties.upsert(bounty.bounty_id.clone(), bounty.clone());
        self.transactions.push(payout.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn channel(id: ChannelId, name: &str) -> Channel {
        Channel {
            channel_id: id,
            channel_name: name.to_string(),
            subscribers: 100,
            niche: "technology".to_string(),
            verified: true,
            owner_id: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sequences_are_per_kind() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.next_id(IdKind::Bounty).unwrap(), 1);
        assert_eq!(storage.next_id(IdKind::Bounty).unwrap(), 2);
        assert_eq!(storage.next_id(IdKind::Bid).unwrap(), 1);
        assert_eq!(IdKind::Transaction.format(3), "tx_3");
    }

    #[test]
    fn test_channel_replace_keeps_position() {
        let mut storage = MemoryStorage::new();
        storage.put_channel(&channel(-1, "first")).unwrap();
        storage.put_channel(&channel(-2, "second")).unwrap();
        storage.put_channel(&channel(-1, "renamed")).unwrap();

        let channels = storage.list_channels().unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].channel_name, "renamed");
        assert_eq!(channels[1].channel_id, -2);
    }

    #[test]
    fn test_get_channel_after_replace() {
        let mut storage = MemoryStorage::new();
        assert!(storage.get_channel(-1).unwrap().is_none());
        storage.put_channel(&channel(-1, "first")).unwrap();
        storage.put_channel(&channel(-1, "renamed")).unwrap();
        assert_eq!(
            storage.get_channel(-1).unwrap().unwrap().channel_name,
            "renamed"
        );
    }

    #[test]
    fn test_missing_records() {
        let storage = MemoryStorage::new();
        assert!(storage.get_user(42).unwrap().is_none());
        assert!(storage.get_bounty("bounty_1").unwrap().is_none());
        assert!(storage.list_transactions().unwrap().is_empty());
    }
}
