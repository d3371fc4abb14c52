//! Operator console for recharge requests

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::api::v1::recharges::{ListRechargesParams, RechargeListResponse, RechargeResponse};
use crate::domain::recharge::{Decision, RechargeRequestId, Resolution};

#[derive(Debug, Deserialize)]
pub struct ResolveRechargeRequest {
    pub decision: Decision,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Resolved,
    AlreadyResolved,
}

#[derive(Debug, Serialize)]
pub struct ResolveRechargeResponse {
    pub outcome: ResolutionOutcome,
    pub request: RechargeResponse,
}

impl From<Resolution> for ResolveRechargeResponse {
    fn from(resolution: Resolution) -> Self {
        let outcome = if resolution.is_resolved() {
            ResolutionOutcome::Resolved
        } else {
            ResolutionOutcome::AlreadyResolved
        };

        Self {
            outcome,
            request: resolution.into_request().into(),
        }
    }
}

/// GET /admin/recharges
pub async fn list_recharges(
    _: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ListRechargesParams>,
) -> Result<Json<RechargeListResponse>, ApiError> {
    let query = params.to_query(None)?;
    let requests = state.recharges.list(&query).await?;

    Ok(Json(requests.into()))
}

/// GET /admin/recharges/{request_id}
pub async fn get_recharge(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<RechargeResponse>, ApiError> {
    let request = state
        .recharges
        .get(&RechargeRequestId::new(request_id))
        .await?;

    Ok(Json(request.into()))
}

/// POST /admin/recharges/{request_id}/resolve
pub async fn resolve_recharge(
    _: RequireAdmin,
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(request): Json<ResolveRechargeRequest>,
) -> Result<Json<ResolveRechargeResponse>, ApiError> {
    let resolution = state
        .recharges
        .resolve(&RechargeRequestId::new(request_id), request.decision)
        .await?;

    Ok(Json(resolution.into()))
}
