//! SQLite-backed ledger storage

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Bid, Bounty, Channel, ChannelId, Transaction, User, UserId};
use crate::storage::{IdKind, LedgerStorage};

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sequences (
    kind TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    telegram_id INTEGER PRIMARY KEY,
    username TEXT NOT NULL,
    wallet_address TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS channels (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id INTEGER NOT NULL UNIQUE,
    channel_name TEXT NOT NULL,
    subscribers INTEGER NOT NULL,
    niche TEXT NOT NULL,
    verified INTEGER NOT NULL,
    owner_id INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bounties (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    bounty_id TEXT NOT NULL UNIQUE,
    advertiser_id INTEGER NOT NULL,
    ton_amount REAL NOT NULL,
    ad_text TEXT NOT NULL,
    ad_link TEXT NOT NULL,
    target_channels TEXT NOT NULL,
    status TEXT NOT NULL,
    escrow_address TEXT,
    created_at TEXT NOT NULL,
    deadline TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bids (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    bid_id TEXT NOT NULL UNIQUE,
    bounty_id TEXT NOT NULL,
    channel_owner_id INTEGER NOT NULL,
    channel_id INTEGER NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    tx_id TEXT NOT NULL UNIQUE,
    from_user INTEGER NOT NULL,
    to_user INTEGER NOT NULL,
    amount REAL NOT NULL,
    tx_type TEXT NOT NULL,
    status TEXT NOT NULL,
    bounty_id TEXT,
    tx_hash TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_from ON transactions(from_user);
CREATE INDEX IF NOT EXISTS idx_transactions_to ON transactions(to_user);
CREATE INDEX IF NOT EXISTS idx_bids_owner ON bids(channel_owner_id);
"#;

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn new(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.run_migrations()?;
        info!("SQLite ledger opened at {}", path.display());
        Ok(storage)
    }

    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.run_migrations()?;
        Ok(storage)
    }

    fn run_migrations(&self) -> LedgerResult<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }
        self.conn.execute_batch(SCHEMA)?;
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
        Ok(())
    }
}

fn conversion_error<E>(e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_time(value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(conversion_error)
}

fn parse_enum<T: std::str::FromStr<Err = LedgerError>>(value: String) -> rusqlite::Result<T> {
    value.parse().map_err(conversion_error)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        telegram_id: row.get(0)?,
        username: row.get(1)?,
        wallet_address: row.get(2)?,
        created_at: parse_time(row.get(3)?)?,
    })
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        channel_id: row.get(0)?,
        channel_name: row.get(1)?,
        subscribers: row.get(2)?,
        niche: row.get(3)?,
        verified: row.get(4)?,
        owner_id: row.get(5)?,
        created_at: parse_time(row.get(6)?)?,
    })
}

fn bounty_from_row(row: &Row<'_>) -> rusqlite::Result<Bounty> {
    let targets: String = row.get(5)?;
    let target_channels = serde_json::from_str(&targets).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Bounty {
        bounty_id: row.get(0)?,
        advertiser_id: row.get(1)?,
        ton_amount: row.get(2)?,
        ad_text: row.get(3)?,
        ad_link: row.get(4)?,
        target_channels,
        status: parse_enum(row.get(6)?)?,
        escrow_address: row.get(7)?,
        created_at: parse_time(row.get(8)?)?,
        deadline: parse_time(row.get(9)?)?,
    })
}

fn bid_from_row(row: &Row<'_>) -> rusqlite::Result<Bid> {
    Ok(Bid {
        bid_id: row.get(0)?,
        bounty_id: row.get(1)?,
        channel_owner_id: row.get(2)?,
        channel_id: row.get(3)?,
        status: parse_enum(row.get(4)?)?,
        created_at: parse_time(row.get(5)?)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        tx_id: row.get(0)?,
        from_user: row.get(1)?,
        to_user: row.get(2)?,
        amount: row.get(3)?,
        tx_type: parse_enum(row.get(4)?)?,
        status: parse_enum(row.get(5)?)?,
        bounty_id: row.get(6)?,
        tx_hash: row.get(7)?,
        created_at: parse_time(row.get(8)?)?,
    })
}

const CHANNEL_COLUMNS: &str =
    "channel_id, channel_name, subscribers, niche, verified, owner_id, created_at";
const BOUNTY_COLUMNS: &str = "bounty_id, advertiser_id, ton_amount, ad_text, ad_link, \
     target_channels, status, escrow_address, created_at, deadline";
const BID_COLUMNS: &str = "bid_id, bounty_id, channel_owner_id, channel_id, status, created_at";
const TX_COLUMNS: &str =
    "tx_id, from_user, to_user, amount, tx_type, status, bounty_id, tx_hash, created_at";

fn write_bounty(conn: &Connection, bounty: &Bounty) -> LedgerResult<()> {
    let targets = serde_json::to_string(&bounty.target_channels)?;
    conn.execute(
        "INSERT INTO bounties (bounty_id, advertiser_id, ton_amount, ad_text, ad_link,
             target_channels, status, escrow_address, created_at, deadline)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(bounty_id) DO UPDATE SET advertiser_id = excluded.advertiser_id,
             ton_amount = excluded.ton_amount, ad_text = excluded.ad_text,
             ad_link = excluded.ad_link, target_channels = excluded.target_channels,
             status = excluded.status, escrow_address = excluded.escrow_address,
             created_at = excluded.created_at, deadline = excluded.deadline",
        params![
            bounty.bounty_id,
            bounty.advertiser_id,
            bounty.ton_amount,
            bounty.ad_text,
            bounty.ad_link,
            targets,
            bounty.status.as_str(),
            bounty.escrow_address,
            bounty.created_at.to_rfc3339(),
            bounty.deadline.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn write_transaction(conn: &Connection, tx: &Transaction) -> LedgerResult<()> {
    conn.execute(
        "INSERT INTO transactions (tx_id, from_user, to_user, amount, tx_type, status,
             bounty_id, tx_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            tx.tx_id,
            tx.from_user,
            tx.to_user,
            tx.amount,
            tx.tx_type.as_str(),
            tx.status.as_str(),
            tx.bounty_id,
            tx.tx_hash,
            tx.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl LedgerStorage for SqliteStorage {
    fn next_id(&mut self, kind: IdKind) -> LedgerResult<u64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO sequences (kind, value) VALUES (?1, 1)
             ON CONFLICT(kind) DO UPDATE SET value = value + 1",
            params![kind.prefix()],
        )?;
        let value: i64 = tx.query_row(
            "SELECT value FROM sequences WHERE kind = ?1",
            params![kind.prefix()],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(value as u64)
    }

    fn get_user(&self, telegram_id: UserId) -> LedgerResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT telegram_id, username, wallet_address, created_at
                 FROM users WHERE telegram_id = ?1",
                params![telegram_id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn put_user(&mut self, user: &User) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO users (telegram_id, username, wallet_address, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(telegram_id) DO UPDATE SET username = excluded.username,
                 wallet_address = excluded.wallet_address, created_at = excluded.created_at",
            params![
                user.telegram_id,
                user.username,
                user.wallet_address,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_channel(&self, channel_id: ChannelId) -> LedgerResult<Option<Channel>> {
        let channel = self
            .conn
            .query_row(
                &format!("SELECT {} FROM channels WHERE channel_id = ?1", CHANNEL_COLUMNS),
                params![channel_id],
                channel_from_row,
            )
            .optional()?;
        Ok(channel)
    }

    fn put_channel(&mut self, channel: &Channel) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO channels (channel_id, channel_name, subscribers, niche, verified,
                 owner_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(channel_id) DO UPDATE SET channel_name = excluded.channel_name,
                 subscribers = excluded.subscribers, niche = excluded.niche,
                 verified = excluded.verified, owner_id = excluded.owner_id,
                 created_at = excluded.created_at",
            params![
                channel.channel_id,
                channel.channel_name,
                channel.subscribers,
                channel.niche,
                channel.verified,
                channel.owner_id,
                channel.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_channels(&self) -> LedgerResult<Vec<Channel>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM channels ORDER BY seq", CHANNEL_COLUMNS))?;
        let channels = stmt
            .query_map([], channel_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(channels)
    }

    fn get_bounty(&self, bounty_id: &str) -> LedgerResult<Option<Bounty>> {
        let bounty = self
            .conn
            .query_row(
                &format!("SELECT {} FROM bounties WHERE bounty_id = ?1", BOUNTY_COLUMNS),
                params![bounty_id],
                bounty_from_row,
            )
            .optional()?;
        Ok(bounty)
    }

    fn put_bounty(&mut self, bounty: &Bounty) -> LedgerResult<()> {
        write_bounty(&self.conn, bounty)
    }

    fn list_bounties(&self) -> LedgerResult<Vec<Bounty>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM bounties ORDER BY seq", BOUNTY_COLUMNS))?;
        let bounties = stmt
            .query_map([], bounty_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bounties)
    }

    fn insert_bid(&mut self, bid: &Bid) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO bids (bid_id, bounty_id, channel_owner_id, channel_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                bid.bid_id,
                bid.bounty_id,
                bid.channel_owner_id,
                bid.channel_id,
                bid.status.as_str(),
                bid.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_bids(&self) -> LedgerResult<Vec<Bid>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM bids ORDER BY seq", BID_COLUMNS))?;
        let bids = stmt
            .query_map([], bid_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bids)
    }

    fn list_transactions(&self) -> LedgerResult<Vec<Transaction>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM transactions ORDER BY seq", TX_COLUMNS))?;
        let txs = stmt
            .query_map([], transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(txs)
    }

    fn record_confirmation(&mut self, bounty: &Bounty, payout: &Transaction) -> LedgerResult<()> {
        let tx = self.conn.transaction()?;
        write_bounty(&tx, bounty)?;
        write_transaction(&tx, payout)?;
        tx.commit()?;
        Ok(())
    }
}
