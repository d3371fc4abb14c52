//! PostgreSQL recharge request repository

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::domain::account::AccountId;
use crate::domain::recharge::{
    CreditKind, RechargeQuery, RechargeRepository, RechargeRequest, RechargeRequestId,
    RechargeStatus, SortOrder,
};
use crate::domain::DomainError;

const COLUMNS: &str = "id, account_id, payer_display_name, amount, status, credit_kind, \
                       quantity, label, created_at, resolved_at";

/// PostgreSQL implementation of RechargeRepository
#[derive(Debug, Clone)]
pub struct PostgresRechargeRepository {
    pool: PgPool,
}

impl PostgresRechargeRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RechargeRepository for PostgresRechargeRepository {
    async fn create(&self, request: RechargeRequest) -> Result<RechargeRequest, DomainError> {
        let quantity = request.quantity().map(i64::from);

        sqlx::query(
            r#"
            INSERT INTO recharge_requests
                (id, account_id, payer_display_name, amount, status, credit_kind,
                 quantity, label, created_at, resolved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(request.id().as_str())
        .bind(request.account_id().as_str())
        .bind(request.payer_display_name())
        .bind(request.amount())
        .bind(request.status().as_str())
        .bind(request.credit_kind().as_str())
        .bind(quantity)
        .bind(request.label())
        .bind(request.created_at())
        .bind(request.resolved_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();

            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                DomainError::conflict(format!(
                    "Recharge request '{}' already exists",
                    request.id()
                ))
            } else if msg.contains("foreign key") {
                DomainError::account_not_found(request.account_id().as_str())
            } else {
                DomainError::storage(format!("Failed to create recharge request: {}", e))
            }
        })?;

        Ok(request)
    }

    async fn get(&self, id: &RechargeRequestId) -> Result<Option<RechargeRequest>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM recharge_requests WHERE id = $1",
            COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get recharge request: {}", e)))?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn list(&self, query: &RechargeQuery) -> Result<Vec<RechargeRequest>, DomainError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM recharge_requests WHERE TRUE", COLUMNS));

        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }

        if let Some(account_id) = &query.account_id {
            builder
                .push(" AND account_id = ")
                .push_bind(account_id.as_str().to_string());
        }

        builder.push(match query.order {
            SortOrder::Asc => " ORDER BY created_at ASC, id ASC",
            SortOrder::Desc => " ORDER BY created_at DESC, id DESC",
        });

        builder
            .push(" LIMIT ")
            .push_bind(query.limit.map(|l| l as i64));
        builder
            .push(" OFFSET ")
            .push_bind(query.offset.unwrap_or(0) as i64);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list recharge requests: {}", e)))?;

        rows.iter().map(row_to_request).collect()
    }

    async fn transition(
        &self,
        id: &RechargeRequestId,
        from: RechargeStatus,
        to: RechargeStatus,
    ) -> Result<Option<RechargeRequest>, DomainError> {
        let resolved_at = to.is_terminal().then(chrono::Utc::now);

        let row = sqlx::query(&format!(
            r#"
            UPDATE recharge_requests SET status = $3, resolved_at = $4
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id.as_str())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(resolved_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update recharge request: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_request(&row)?)),
            None if self.get(id).await?.is_some() => Ok(None),
            None => Err(DomainError::not_found(format!(
                "Recharge request '{}' not found",
                id
            ))),
        }
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::storage(format!("Failed to read column '{}': {}", name, e)))
}

fn row_to_request(row: &PgRow) -> Result<RechargeRequest, DomainError> {
    let id: String = column(row, "id")?;
    let account_id: String = column(row, "account_id")?;
    let status: String = column(row, "status")?;
    let credit_kind: String = column(row, "credit_kind")?;
    let quantity: Option<i64> = column(row, "quantity")?;

    let account_id = AccountId::new(account_id)
        .map_err(|e| DomainError::storage(format!("Invalid account ID in database: {}", e)))?;
    let status = status
        .parse::<RechargeStatus>()
        .map_err(|e| DomainError::storage(e.to_string()))?;
    let credit_kind = credit_kind
        .parse::<CreditKind>()
        .map_err(|e| DomainError::storage(e.to_string()))?;
    let quantity = quantity
        .map(u32::try_from)
        .transpose()
        .map_err(|_| DomainError::storage("Invalid quantity in database"))?;

    Ok(RechargeRequest::restore(
        RechargeRequestId::new(id),
        account_id,
        column(row, "payer_display_name")?,
        column(row, "amount")?,
        status,
        credit_kind,
        quantity,
        column(row, "label")?,
        column(row, "created_at")?,
        column(row, "resolved_at")?,
    ))
}
