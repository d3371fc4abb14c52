//! PostgreSQL ledger store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use tracing::debug;

use crate::domain::account::{Account, AccountId, PlanTier};
use crate::domain::ledger::{
    LedgerEntry, LedgerReceipt, LedgerStore, Transaction, TransactionId, TransactionKind,
    TransactionQuery,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_ledger_commit;

type SqlTransaction<'c> = sqlx::Transaction<'c, Postgres>;

const TRANSACTION_COLUMNS: &str =
    "id, account_id, kind, amount, description, tokens_used, reference, created_at";

/// PostgreSQL implementation of LedgerStore.
///
/// Each commit locks the account row (`SELECT ... FOR UPDATE`), applies the
/// delta and inserts the log row inside one SQL transaction.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn open_account(&self, account: Account) -> Result<Account, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, plan_tier, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(account.id().as_str())
        .bind(account.plan_tier().as_str())
        .bind(account.balance())
        .bind(account.created_at())
        .bind(account.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();

            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                DomainError::conflict(format!("Account '{}' already exists", account.id()))
            } else {
                DomainError::storage(format!("Failed to create account: {}", e))
            }
        })?;

        Ok(account)
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, plan_tier, balance, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get account: {}", e)))?;

        row.as_ref().map(row_to_account).transpose()
    }

    async fn set_plan_tier(&self, id: &AccountId, tier: PlanTier) -> Result<Account, DomainError> {
        let row = sqlx::query(
            r#"
            UPDATE accounts SET plan_tier = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, plan_tier, balance, created_at, updated_at
            "#,
        )
        .bind(id.as_str())
        .bind(tier.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update plan tier: {}", e)))?;

        match row {
            Some(row) => row_to_account(&row),
            None => Err(DomainError::account_not_found(id.as_str())),
        }
    }

    async fn commit(
        &self,
        id: &AccountId,
        entry: LedgerEntry,
    ) -> Result<LedgerReceipt, DomainError> {
        entry.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to lock account: {}", e)))?;

        let Some(current_balance) = balance else {
            return Err(DomainError::account_not_found(id.as_str()));
        };

        if let Some(reference) = entry.reference.as_deref() {
            if let Some(existing) = find_reference(&mut tx, id, reference).await? {
                tx.rollback().await.ok();
                debug!(account_id = %id, reference, "Ledger reference already applied");

                return Ok(LedgerReceipt {
                    transaction: existing,
                    balance: current_balance,
                    applied: false,
                });
            }
        }

        let kind = entry.kind;
        let transaction = Transaction::record(id.clone(), entry);
        let balance = apply_delta(&mut tx, id, transaction.signed_amount()).await?;
        append_transaction(&mut tx, &transaction).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit ledger entry: {}", e)))?;

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
        let row = sqlx::query(&format!(
            "SELECT {} FROM ledger_transactions WHERE account_id = $1 AND reference = $2",
            TRANSACTION_COLUMNS
        ))
        .bind(id.as_str())
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to find transaction: {}", e)))?;

        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn transactions(
        &self,
        id: &AccountId,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, DomainError> {
        if self.get_account(id).await?.is_none() {
            return Err(DomainError::account_not_found(id.as_str()));
        }

        let limit = query.limit.map(|l| l as i64);
        let offset = query.offset.unwrap_or(0) as i64;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM ledger_transactions
            WHERE account_id = $1
            ORDER BY seq ASC
            LIMIT $2 OFFSET $3
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(id.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list transactions: {}", e)))?;

        rows.iter().map(row_to_transaction).collect()
    }
}

/// Add `delta` to the locked account row, returning the new balance
async fn apply_delta(
    tx: &mut SqlTransaction<'_>,
    id: &AccountId,
    delta: Decimal,
) -> Result<Decimal, DomainError> {
    sqlx::query_scalar(
        r#"
        UPDATE accounts SET balance = balance + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING balance
        "#,
    )
    .bind(id.as_str())
    .bind(delta)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| DomainError::storage(format!("Failed to update balance: {}", e)))
}

async fn append_transaction(
    tx: &mut SqlTransaction<'_>,
    transaction: &Transaction,
) -> Result<(), DomainError> {
    let tokens_used = transaction
        .tokens_used
        .map(i64::try_from)
        .transpose()
        .map_err(|_| DomainError::validation("tokens_used out of range"))?;

    sqlx::query(
        r#"
        INSERT INTO ledger_transactions
            (id, account_id, kind, amount, description, tokens_used, reference, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(transaction.id().as_str())
    .bind(transaction.account_id().as_str())
    .bind(transaction.kind.as_str())
    .bind(transaction.amount)
    .bind(&transaction.description)
    .bind(tokens_used)
    .bind(transaction.reference.as_deref())
    .bind(transaction.timestamp)
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::storage(format!("Failed to append transaction: {}", e)))?;

    Ok(())
}

async fn find_reference(
    tx: &mut SqlTransaction<'_>,
    id: &AccountId,
    reference: &str,
) -> Result<Option<Transaction>, DomainError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM ledger_transactions WHERE account_id = $1 AND reference = $2",
        TRANSACTION_COLUMNS
    ))
    .bind(id.as_str())
    .bind(reference)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| DomainError::storage(format!("Failed to find transaction: {}", e)))?;

    row.as_ref().map(row_to_transaction).transpose()
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::storage(format!("Failed to read column '{}': {}", name, e)))
}

fn row_to_account(row: &PgRow) -> Result<Account, DomainError> {
    let id: String = column(row, "id")?;
    let plan_tier: String = column(row, "plan_tier")?;

    let id = AccountId::new(id)
        .map_err(|e| DomainError::storage(format!("Invalid account ID in database: {}", e)))?;
    let plan_tier = plan_tier
        .parse::<PlanTier>()
        .map_err(|e| DomainError::storage(format!("Invalid plan tier in database: {}", e)))?;

    Ok(Account::restore(
        id,
        plan_tier,
        column(row, "balance")?,
        column(row, "created_at")?,
        column(row, "updated_at")?,
    ))
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, DomainError> {
    let id: String = column(row, "id")?;
    let account_id: String = column(row, "account_id")?;
    let kind: String = column(row, "kind")?;
    let tokens_used: Option<i64> = column(row, "tokens_used")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;

    let account_id = AccountId::new(account_id)
        .map_err(|e| DomainError::storage(format!("Invalid account ID in database: {}", e)))?;
    let tokens_used = tokens_used
        .map(u64::try_from)
        .transpose()
        .map_err(|_| DomainError::storage("Negative tokens_used in database"))?;

    Ok(Transaction::restore(
        TransactionId::new(id),
        account_id,
        TransactionKind::parse(&kind)?,
        column(row, "amount")?,
        column(row, "description")?,
        created_at,
        tokens_used,
        column(row, "reference")?,
    ))
}
