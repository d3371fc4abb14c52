//! Ledger verification: the balance must equal the fold of the log

use rust_decimal::Decimal;
use serde::Serialize;

use super::{Transaction, TransactionKind};
use crate::domain::account::Account;

/// Outcome of comparing an account's stored balance with its log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub account_id: String,
    pub recorded_balance: Decimal,
    pub computed_balance: Decimal,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub transaction_count: usize,
    pub consistent: bool,
}

/// Sum of credits minus sum of debits, starting from zero
pub fn fold_balance(transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .fold(Decimal::ZERO, |acc, tx| acc + tx.signed_amount())
}

pub fn reconcile(account: &Account, transactions: &[Transaction]) -> Reconciliation {
    let (total_credits, total_debits) =
        transactions
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(credits, debits), tx| {
                match tx.kind {
                    TransactionKind::Credit => (credits + tx.amount, debits),
                    TransactionKind::Debit => (credits, debits + tx.amount),
                }
            });

    let computed_balance = total_credits - total_debits;

    Reconciliation {
        account_id: account.id().to_string(),
        recorded_balance: account.balance(),
        computed_balance,
        total_credits,
        total_debits,
        transaction_count: transactions.len(),
        consistent: computed_balance == account.balance(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{AccountId, PlanTier};
    use crate::domain::ledger::LedgerEntry;
    use rust_decimal_macros::dec;

    fn tx(entry: LedgerEntry) -> Transaction {
        Transaction::record(AccountId::new("acc-1").unwrap(), entry)
    }

    #[test]
    fn test_fold_empty_log_is_zero() {
        assert_eq!(fold_balance(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_reconcile_consistent() {
        let mut account = Account::open(AccountId::new("acc-1").unwrap(), PlanTier::Advanced);
        account.apply_delta(dec!(10.00));
        account.apply_delta(dec!(-0.25));

        let log = vec![
            tx(LedgerEntry::credit(dec!(10.00), "recharge")),
            tx(LedgerEntry::debit(dec!(0.25), "chat")),
        ];

        let report = reconcile(&account, &log);

        assert!(report.consistent);
        assert_eq!(report.total_credits, dec!(10.00));
        assert_eq!(report.total_debits, dec!(0.25));
        assert_eq!(report.computed_balance, dec!(9.75));
        assert_eq!(report.transaction_count, 2);
    }

    #[test]
    fn test_reconcile_detects_drift() {
        let mut account = Account::open(AccountId::new("acc-1").unwrap(), PlanTier::Advanced);
        account.apply_delta(dec!(5));

        let report = reconcile(&account, &[]);

        assert!(!report.consistent);
        assert_eq!(report.recorded_balance, dec!(5));
        assert_eq!(report.computed_balance, Decimal::ZERO);
    }
}
