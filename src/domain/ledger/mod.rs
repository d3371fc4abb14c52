//! Ledger domain
//!
//! Per-account balance plus an append-only, ordered transaction log. The
//! balance always equals the sum of credits minus the sum of debits.

pub mod reconcile;
mod repository;
mod transaction;

pub use reconcile::{fold_balance, Reconciliation};
pub use repository::{LedgerStore, TransactionQuery};
pub use transaction::{
    LedgerEntry, LedgerReceipt, Transaction, TransactionId, TransactionKind, AMOUNT_SCALE,
};
