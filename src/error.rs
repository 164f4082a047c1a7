//! Ledger error taxonomy

use thiserror::Error;

use crate::models::BountyStatus;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Bounty not found")]
    BountyNotFound(String),

    #[error("User not found")]
    UserNotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("Bounty {0} is already confirmed")]
    AlreadyConfirmed(String),

    #[error("Bounty {bounty_id} cannot move from {from} to {to}")]
    InvalidTransition {
        bounty_id: String,
        from: BountyStatus,
        to: BountyStatus,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
