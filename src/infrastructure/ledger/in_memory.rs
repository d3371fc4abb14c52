//! In-memory ledger store

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::account::{Account, AccountId, PlanTier};
use crate::domain::ledger::{
    LedgerEntry, LedgerReceipt, LedgerStore, Transaction, TransactionQuery,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_ledger_commit;

/// One account's balance and log, guarded together
#[derive(Debug)]
struct AccountBook {
    account: Account,
    log: Vec<Transaction>,
    references: HashMap<String, usize>,
}

impl AccountBook {
    fn new(account: Account) -> Self {
        Self {
            account,
            log: Vec::new(),
            references: HashMap::new(),
        }
    }

    fn apply_delta(&mut self, delta: Decimal) -> Decimal {
        self.account.apply_delta(delta)
    }

    fn append(&mut self, transaction: Transaction) {
        if let Some(reference) = &transaction.reference {
            self.references.insert(reference.clone(), self.log.len());
        }
        self.log.push(transaction);
    }

    fn by_reference(&self, reference: &str) -> Option<&Transaction> {
        self.references
            .get(reference)
            .and_then(|&index| self.log.get(index))
    }
}

/// In-memory ledger.
///
/// The outer map lock is held only to find an account's book; each book has
/// its own mutex, so commits on one account serialize while different
/// accounts proceed independently.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    books: RwLock<HashMap<AccountId, Arc<Mutex<AccountBook>>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn book(&self, id: &AccountId) -> Result<Option<Arc<Mutex<AccountBook>>>, DomainError> {
        let books = self
            .books
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(books.get(id).cloned())
    }

    fn require_book(&self, id: &AccountId) -> Result<Arc<Mutex<AccountBook>>, DomainError> {
        self.book(id)?
            .ok_or_else(|| DomainError::account_not_found(id.as_str()))
    }
}

fn lock_book(
    book: &Mutex<AccountBook>,
) -> Result<std::sync::MutexGuard<'_, AccountBook>, DomainError> {
    book.lock()
        .map_err(|e| DomainError::internal(format!("Failed to acquire account lock: {}", e)))
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn open_account(&self, account: Account) -> Result<Account, DomainError> {
        let mut books = self
            .books
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        if books.contains_key(account.id()) {
            return Err(DomainError::conflict(format!(
                "Account '{}' already exists",
                account.id()
            )));
        }

        books.insert(
            account.id().clone(),
            Arc::new(Mutex::new(AccountBook::new(account.clone()))),
        );

        Ok(account)
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        match self.book(id)? {
            Some(book) => Ok(Some(lock_book(&book)?.account.clone())),
            None => Ok(None),
        }
    }

    async fn set_plan_tier(&self, id: &AccountId, tier: PlanTier) -> Result<Account, DomainError> {
        let book = self.require_book(id)?;
        let mut book = lock_book(&book)?;

        book.account.set_plan_tier(tier);
        Ok(book.account.clone())
    }

    async fn commit(
        &self,
        id: &AccountId,
        entry: LedgerEntry,
    ) -> Result<LedgerReceipt, DomainError> {
        entry.validate()?;

        let book = self.require_book(id)?;
        let mut book = lock_book(&book)?;

        if let Some(reference) = entry.reference.as_deref() {
            if let Some(existing) = book.by_reference(reference) {
                debug!(account_id = %id, reference, "Ledger reference already applied");
                return Ok(LedgerReceipt {
                    transaction: existing.clone(),
                    balance: book.account.balance(),
                    applied: false,
                });
            }
        }

        let kind = entry.kind;
        let transaction = Transaction::record(id.clone(), entry);
        let balance = book.apply_delta(transaction.signed_amount());
        book.append(transaction.clone());
        drop(book);

        record_ledger_commit(kind.as_str());

        Ok(LedgerReceipt {
            transaction,
            balance,
            applied: true,
        })
    }

    async fn find_by_reference(
        &self,
        id: &AccountId,
        reference: &str,
    ) -> Result<Option<Transaction>, DomainError> {
        let book = self.require_book(id)?;
        let book = lock_book(&book)?;

        Ok(book.by_reference(reference).cloned())
    }

    async fn transactions(
        &self,
        id: &AccountId,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, DomainError> {
        let book = self.require_book(id)?;
        let book = lock_book(&book)?;

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(book.log.iter().skip(offset).take(limit).cloned().collect())
    }
}
