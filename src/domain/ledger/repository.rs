//! Ledger store trait

use std::fmt::Debug;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{reconcile, LedgerEntry, LedgerReceipt, Reconciliation, Transaction, TransactionKind};
use crate::domain::account::{Account, AccountId, PlanTier};
use crate::domain::DomainError;

/// Paging for transaction history
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl TransactionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Single source of truth for account balances and their transaction logs.
///
/// `commit` is the only write path for balances: the delta and the log append
/// happen as one unit, and commits on the same account are serialized.
#[async_trait]
pub trait LedgerStore: Send + Sync + Debug {
    /// Create an account with a zero balance and an empty log
    async fn open_account(&self, account: Account) -> Result<Account, DomainError>;

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, DomainError>;

    async fn set_plan_tier(&self, id: &AccountId, tier: PlanTier) -> Result<Account, DomainError>;

    /// Apply an entry's signed amount and append it to the log atomically.
    ///
    /// If the entry carries a reference already present on the account, nothing
    /// is written and the existing transaction is returned with `applied = false`.
    async fn commit(&self, id: &AccountId, entry: LedgerEntry)
    -> Result<LedgerReceipt, DomainError>;

    async fn find_by_reference(
        &self,
        id: &AccountId,
        reference: &str,
    ) -> Result<Option<Transaction>, DomainError>;

    /// Transaction log in insertion order
    async fn transactions(
        &self,
        id: &AccountId,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, DomainError>;

    async fn read_balance(&self, id: &AccountId) -> Result<Decimal, DomainError> {
        self.get_account(id)
            .await?
            .map(|account| account.balance())
            .ok_or_else(|| DomainError::account_not_found(id.as_str()))
    }

    async fn debit_and_log(
        &self,
        id: &AccountId,
        entry: LedgerEntry,
    ) -> Result<LedgerReceipt, DomainError> {
        if entry.kind != TransactionKind::Debit {
            return Err(DomainError::internal("debit_and_log called with a credit entry"));
        }

        self.commit(id, entry).await
    }

    async fn credit_and_log(
        &self,
        id: &AccountId,
        entry: LedgerEntry,
    ) -> Result<LedgerReceipt, DomainError> {
        if entry.kind != TransactionKind::Credit {
            return Err(DomainError::internal("credit_and_log called with a debit entry"));
        }

        self.commit(id, entry).await
    }

    /// Compare the stored balance with the fold of the full log
    async fn reconcile(&self, id: &AccountId) -> Result<Reconciliation, DomainError> {
        let account = self
            .get_account(id)
            .await?
            .ok_or_else(|| DomainError::account_not_found(id.as_str()))?;
        let log = self.transactions(id, &TransactionQuery::new()).await?;

        Ok(reconcile::reconcile(&account, &log))
    }
}
