pub mod bounties;
pub mod bounty;
pub mod channels;
pub mod deals;
pub mod health;
pub mod transactions;
