//! Account domain
//!
//! An account is the unit that owns a balance and a plan tier. Balances are
//! only ever mutated through the ledger.

mod entity;

pub use entity::{validate_account_id, Account, AccountId, PlanTier, MAX_ACCOUNT_ID_LENGTH};
