//! Ledger transactions

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::domain::DomainError;

/// Unique identifier for a ledger transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique ID
    pub fn generate() -> Self {
        Self(format!("txn-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Debit,
    Credit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(DomainError::storage(format!(
                "Unknown transaction kind '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movement to be committed against an account
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub tokens_used: Option<u64>,
    /// Idempotency reference; a reference is applied at most once per account
    pub reference: Option<String>,
}

impl LedgerEntry {
    pub fn debit(amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Debit,
            amount,
            description: description.into(),
            tokens_used: None,
            reference: None,
        }
    }

    pub fn credit(amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Credit,
            amount,
            description: description.into(),
            tokens_used: None,
            reference: None,
        }
    }

    pub fn with_tokens_used(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Amount with the sign applied to the balance
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Debit => -self.amount,
            TransactionKind::Credit => self.amount,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::invalid_amount(format!(
                "Ledger amount must be positive, got {}",
                self.amount
            )));
        }

        if self.amount.normalize().scale() > AMOUNT_SCALE {
            return Err(DomainError::invalid_amount(format!(
                "Ledger amount {} has more than {} fractional digits",
                self.amount, AMOUNT_SCALE
            )));
        }

        Ok(())
    }
}

/// Fractional digits a stored amount may carry (`NUMERIC(20, 8)`)
pub const AMOUNT_SCALE: u32 = 8;

/// An immutable entry of an account's transaction log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Transaction {
    /// Record an entry against an account with a fresh ID and timestamp
    pub fn record(account_id: AccountId, entry: LedgerEntry) -> Self {
        Self {
            id: TransactionId::generate(),
            account_id,
            kind: entry.kind,
            amount: entry.amount,
            description: entry.description,
            timestamp: Utc::now(),
            tokens_used: entry.tokens_used,
            reference: entry.reference,
        }
    }

    /// Rebuild a transaction from persisted fields
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: TransactionId,
        account_id: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        description: String,
        timestamp: DateTime<Utc>,
        tokens_used: Option<u64>,
        reference: Option<String>,
    ) -> Self {
        Self {
            id,
            account_id,
            kind,
            amount,
            description,
            timestamp,
            tokens_used,
            reference,
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::Debit => -self.amount,
            TransactionKind::Credit => self.amount,
        }
    }
}

/// Result of a ledger commit
#[derive(Debug, Clone)]
pub struct LedgerReceipt {
    pub transaction: Transaction,
    /// Balance after the commit (or the current balance when not applied)
    pub balance: Decimal,
    /// False when the entry's reference had already been applied
    pub applied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_amount() {
        assert_eq!(LedgerEntry::debit(dec!(1.5), "d").signed_amount(), dec!(-1.5));
        assert_eq!(LedgerEntry::credit(dec!(1.5), "c").signed_amount(), dec!(1.5));
    }

    #[test]
    fn test_entry_rejects_non_positive_amounts() {
        assert!(LedgerEntry::debit(dec!(0), "zero").validate().is_err());
        assert!(LedgerEntry::credit(dec!(-1), "negative").validate().is_err());
        assert!(LedgerEntry::credit(dec!(0.000001), "tiny").validate().is_ok());
        assert!(LedgerEntry::debit(dec!(0.00000001), "smallest").validate().is_ok());
        assert!(LedgerEntry::debit(dec!(0.000495495), "too fine").validate().is_err());
    }

    #[test]
    fn test_record_copies_entry_fields() {
        let account_id = AccountId::new("acc-1").unwrap();
        let entry = LedgerEntry::debit(dec!(0.001485), "AI chat interaction")
            .with_tokens_used(1500)
            .with_reference("ref-1");

        let tx = Transaction::record(account_id.clone(), entry);

        assert!(tx.id().as_str().starts_with("txn-"));
        assert_eq!(tx.account_id(), &account_id);
        assert_eq!(tx.kind, TransactionKind::Debit);
        assert_eq!(tx.tokens_used, Some(1500));
        assert_eq!(tx.reference.as_deref(), Some("ref-1"));
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(TransactionKind::parse("credit").unwrap(), TransactionKind::Credit);
        assert!(TransactionKind::parse("refund").is_err());
    }
}
