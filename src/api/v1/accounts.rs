//! Account holder views of the ledger

use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::account::{AccountId, PlanTier};
use crate::domain::ledger::{Transaction, TransactionKind, TransactionQuery};
use crate::domain::DomainError;

const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account_id: String,
    pub plan_tier: PlanTier,
    pub balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id().to_string(),
            kind: transaction.kind,
            amount: transaction.amount,
            description: transaction.description,
            timestamp: transaction.timestamp,
            tokens_used: transaction.tokens_used,
            reference: transaction.reference,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListResponse {
    pub account_id: String,
    pub transactions: Vec<TransactionResponse>,
    pub count: usize,
}

/// GET /v1/accounts/{account_id}/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account_id = AccountId::new(account_id)?;
    let account = state
        .ledger
        .get_account(&account_id)
        .await?
        .ok_or_else(|| DomainError::account_not_found(account_id.as_str()))?;

    Ok(Json(BalanceResponse {
        account_id: account.id().to_string(),
        plan_tier: account.plan_tier(),
        balance: account.balance(),
    }))
}

/// GET /v1/accounts/{account_id}/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Query(params): Query<TransactionsParams>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let account_id = AccountId::new(account_id)?;
    let query = TransactionQuery::new()
        .with_limit(params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE))
        .with_offset(params.offset.unwrap_or(0));

    let transactions = state.ledger.transactions(&account_id, &query).await?;
    let count = transactions.len();

    Ok(Json(TransactionListResponse {
        account_id: account_id.to_string(),
        transactions: transactions.into_iter().map(Into::into).collect(),
        count,
    }))
}
