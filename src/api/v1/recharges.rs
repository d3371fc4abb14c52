//! Recharge requests submitted by account holders

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::middleware::resolve_account_id;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::account::AccountId;
use crate::domain::recharge::{
    CreditKind, RechargeQuery, RechargeRequest, RechargeStatus, SortOrder,
};
use crate::domain::DomainError;
use crate::infrastructure::recharge::{SubmitRechargeParams, SubmittedRecharge};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRechargeRequest {
    /// Falls back to the `X-Account-Id` header
    pub account_id: Option<String>,
    pub payer_display_name: String,
    pub amount: Decimal,
    #[serde(default = "default_credit_kind")]
    pub credit_kind: CreditKind,
    pub quantity: Option<u32>,
    pub label: Option<String>,
}

fn default_credit_kind() -> CreditKind {
    CreditKind::CurrencyBalance
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeResponse {
    pub id: String,
    pub account_id: String,
    pub payer_display_name: String,
    pub amount: Decimal,
    pub status: RechargeStatus,
    pub credit_kind: CreditKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<RechargeRequest> for RechargeResponse {
    fn from(request: RechargeRequest) -> Self {
        Self {
            id: request.id().to_string(),
            account_id: request.account_id().to_string(),
            payer_display_name: request.payer_display_name().to_string(),
            amount: request.amount(),
            status: request.status(),
            credit_kind: request.credit_kind(),
            quantity: request.quantity(),
            label: request.label().map(str::to_string),
            created_at: request.created_at(),
            resolved_at: request.resolved_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRechargeResponse {
    pub request: RechargeResponse,
    /// Payment code for the requested amount, when a payee key is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_payload: Option<String>,
}

impl From<SubmittedRecharge> for CreateRechargeResponse {
    fn from(submitted: SubmittedRecharge) -> Self {
        Self {
            request: submitted.request.into(),
            pix_payload: submitted.pix_payload,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRechargesParams {
    pub status: Option<RechargeStatus>,
    pub account_id: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListRechargesParams {
    /// Build the repository query; the path account wins over the query string
    pub fn to_query(&self, account_id: Option<AccountId>) -> Result<RechargeQuery, ApiError> {
        let mut query = RechargeQuery::new()
            .with_order(self.order)
            .with_limit(self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE))
            .with_offset(self.offset.unwrap_or(0));

        if let Some(status) = self.status {
            query = query.with_status(status);
        }

        let account_id = match account_id {
            Some(id) => Some(id),
            None => self
                .account_id
                .as_deref()
                .map(AccountId::new)
                .transpose()?,
        };

        if let Some(id) = account_id {
            query = query.with_account(id);
        }

        Ok(query)
    }
}

#[derive(Debug, Serialize)]
pub struct RechargeListResponse {
    pub requests: Vec<RechargeResponse>,
    pub count: usize,
}

impl From<Vec<RechargeRequest>> for RechargeListResponse {
    fn from(requests: Vec<RechargeRequest>) -> Self {
        let count = requests.len();

        Self {
            requests: requests.into_iter().map(Into::into).collect(),
            count,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/recharges
pub async fn create_recharge(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateRechargeRequest>,
) -> Result<(StatusCode, Json<CreateRechargeResponse>), ApiError> {
    let account_id = resolve_account_id(request.account_id.as_deref(), &headers)?;

    let mut params = SubmitRechargeParams::new(
        account_id,
        request.payer_display_name,
        request.amount,
        request.credit_kind,
    );
    params.quantity = request.quantity;
    params.label = request.label;

    let submitted = state.recharges.submit(params).await?;

    Ok((StatusCode::CREATED, Json(submitted.into())))
}

/// GET /v1/accounts/{account_id}/recharges
pub async fn list_account_recharges(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Query(params): Query<ListRechargesParams>,
) -> Result<Json<RechargeListResponse>, ApiError> {
    let account_id = AccountId::new(account_id)?;

    if state.ledger.get_account(&account_id).await?.is_none() {
        return Err(DomainError::account_not_found(account_id.as_str()).into());
    }

    let query = params.to_query(Some(account_id))?;
    let requests = state.recharges.list(&query).await?;

    Ok(Json(requests.into()))
}
