//! Storage backend selection

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::domain::ledger::LedgerStore;
use crate::domain::recharge::RechargeRepository;
use crate::domain::DomainError;
use crate::infrastructure::ledger::{InMemoryLedgerStore, PostgresLedgerStore};
use crate::infrastructure::recharge::{InMemoryRechargeRepository, PostgresRechargeRepository};

use super::migrations::run_migrations;
use super::postgres::{connect_pool, PostgresConfig};

/// Supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    #[default]
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl FromStr for StorageType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(DomainError::configuration(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }
}

/// Ledger and recharge repositories sharing one backend
#[derive(Debug, Clone)]
pub struct StorageBackends {
    pub ledger: Arc<dyn LedgerStore>,
    pub recharges: Arc<dyn RechargeRepository>,
}

/// Factory for the storage backends
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    pub fn in_memory() -> StorageBackends {
        StorageBackends {
            ledger: Arc::new(InMemoryLedgerStore::new()),
            recharges: Arc::new(InMemoryRechargeRepository::new()),
        }
    }

    /// Connects, applies pending migrations and builds the PostgreSQL repositories
    pub async fn postgres(config: &PostgresConfig) -> Result<StorageBackends, DomainError> {
        let pool = connect_pool(config).await?;
        run_migrations(&pool).await?;

        Ok(StorageBackends {
            ledger: Arc::new(PostgresLedgerStore::new(pool.clone())),
            recharges: Arc::new(PostgresRechargeRepository::new(pool)),
        })
    }

    /// Builds the backends for `storage_type`; PostgreSQL requires a config
    pub async fn create(
        storage_type: StorageType,
        postgres: Option<&PostgresConfig>,
    ) -> Result<StorageBackends, DomainError> {
        info!(backend = ?storage_type, "Initializing storage");

        match storage_type {
            StorageType::InMemory => Ok(Self::in_memory()),
            StorageType::Postgres => {
                let config = postgres.ok_or_else(|| {
                    DomainError::configuration("DATABASE_URL is required for the postgres backend")
                })?;
                Self::postgres(config).await
            }
        }
    }
}
