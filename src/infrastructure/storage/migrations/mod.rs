//! Versioned schema migrations for the ledger and recharge tables

use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Applies migrations recorded in the `_migrations` table
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Runs a single migration unless it is already recorded.
    /// Returns whether the migration was applied.
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        let applied: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
                .bind(migration.version)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to check migration status: {}", e))
                })?;

        if applied {
            return Ok(false);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to commit migration {}: {}",
                migration.version, e
            ))
        })?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );

        Ok(true)
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// A forward-only schema migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
}

impl Migration {
    pub const fn new(version: i64, description: &'static str, up: &'static str) -> Self {
        Self {
            version,
            description,
            up,
        }
    }
}

/// All migrations, in ascending version order
pub fn ledger_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create accounts table",
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id VARCHAR(64) PRIMARY KEY,
                plan_tier VARCHAR(32) NOT NULL,
                balance NUMERIC(20, 8) NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        ),
        Migration::new(
            2,
            "Create ledger transactions table",
            r#"
            CREATE TABLE IF NOT EXISTS ledger_transactions (
                seq BIGSERIAL PRIMARY KEY,
                id VARCHAR(64) NOT NULL UNIQUE,
                account_id VARCHAR(64) NOT NULL REFERENCES accounts(id),
                kind VARCHAR(16) NOT NULL,
                amount NUMERIC(20, 8) NOT NULL CHECK (amount > 0),
                description TEXT NOT NULL,
                tokens_used BIGINT,
                reference VARCHAR(128),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (account_id, reference)
            );
            CREATE INDEX IF NOT EXISTS idx_ledger_transactions_account
                ON ledger_transactions(account_id, seq);
            "#,
        ),
        Migration::new(
            3,
            "Create recharge requests table",
            r#"
            CREATE TABLE IF NOT EXISTS recharge_requests (
                id VARCHAR(64) PRIMARY KEY,
                account_id VARCHAR(64) NOT NULL REFERENCES accounts(id),
                payer_display_name VARCHAR(120) NOT NULL,
                amount NUMERIC(12, 2) NOT NULL CHECK (amount > 0),
                status VARCHAR(16) NOT NULL,
                credit_kind VARCHAR(32) NOT NULL,
                quantity BIGINT,
                label VARCHAR(200),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                resolved_at TIMESTAMPTZ
            );
            CREATE INDEX IF NOT EXISTS idx_recharge_requests_status
                ON recharge_requests(status, created_at);
            CREATE INDEX IF NOT EXISTS idx_recharge_requests_account
                ON recharge_requests(account_id, created_at);
            "#,
        ),
    ]
}

/// Runs all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    let migrator = PostgresMigrator::new(pool.clone());

    for migration in ledger_migrations() {
        migrator.run_migration(&migration).await?;
    }

    let version = migrator.current_version().await?;
    info!(version = ?version, "Database schema is up to date");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered() {
        let migrations = ledger_migrations();

        for pair in migrations.windows(2) {
            assert!(pair[1].version > pair[0].version);
        }
        assert_eq!(migrations[0].version, 1);
    }

    #[test]
    fn test_migrations_content() {
        for migration in ledger_migrations() {
            assert!(!migration.description.is_empty());
            assert!(migration.up.contains("CREATE TABLE"));
        }
    }

    #[test]
    fn test_reference_is_unique_per_account() {
        let ledger = ledger_migrations()
            .into_iter()
            .find(|m| m.up.contains("ledger_transactions"))
            .unwrap();

        assert!(ledger.up.contains("UNIQUE (account_id, reference)"));
        assert!(ledger.up.contains("CHECK (amount > 0)"));
    }
}
