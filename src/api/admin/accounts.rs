//! Account administration endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::account::{Account, AccountId, PlanTier};
use crate::domain::ledger::Reconciliation;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountRequest {
    pub account_id: String,
    pub plan_tier: PlanTier,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPlanRequest {
    pub plan_tier: PlanTier,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub plan_tier: PlanTier,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id().to_string(),
            plan_tier: account.plan_tier(),
            balance: account.balance(),
            created_at: account.created_at(),
            updated_at: account.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResponse {
    pub account_id: String,
    pub recorded_balance: Decimal,
    pub computed_balance: Decimal,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub transaction_count: usize,
    pub consistent: bool,
}

impl From<Reconciliation> for ReconciliationResponse {
    fn from(report: Reconciliation) -> Self {
        Self {
            account_id: report.account_id,
            recorded_balance: report.recorded_balance,
            computed_balance: report.computed_balance,
            total_credits: report.total_credits,
            total_debits: report.total_debits,
            transaction_count: report.transaction_count,
            consistent: report.consistent,
        }
    }
}

/// POST /admin/accounts
pub async fn open_account(
    _: RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<OpenAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account_id = AccountId::new(request.account_id)?;
    let account = state
        .ledger
        .open_account(Account::open(account_id, request.plan_tier))
        .await?;

    info!(account_id = %account.id(), plan_tier = %account.plan_tier(), "Account opened");

    Ok((StatusCode::CREATED, Json(account.into())))
}

/// PUT /admin/accounts/{account_id}/plan
pub async fn set_plan(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(request): Json<SetPlanRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account_id = AccountId::new(account_id)?;
    let account = state
        .ledger
        .set_plan_tier(&account_id, request.plan_tier)
        .await?;

    info!(account_id = %account.id(), plan_tier = %account.plan_tier(), "Plan tier changed");

    Ok(Json(account.into()))
}

/// GET /admin/accounts/{account_id}/reconcile
pub async fn reconcile_account(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<ReconciliationResponse>, ApiError> {
    let account_id = AccountId::new(account_id)?;
    let report = state.ledger.reconcile(&account_id).await?;

    if !report.consistent {
        tracing::error!(
            account_id = %account_id,
            recorded = %report.recorded_balance,
            computed = %report.computed_balance,
            "Ledger out of balance"
        );
    }

    Ok(Json(report.into()))
}
