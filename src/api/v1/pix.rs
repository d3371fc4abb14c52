//! Payment code rendering

use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::pix::format_amount;
use crate::domain::DomainError;

#[derive(Debug, Deserialize)]
pub struct PixPayloadRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PixPayloadResponse {
    /// Amount as encoded, with two fractional digits
    pub amount: String,
    pub payload: String,
}

/// POST /v1/pix/payload
pub async fn create_pix_payload(
    State(state): State<AppState>,
    Json(request): Json<PixPayloadRequest>,
) -> Result<Json<PixPayloadResponse>, ApiError> {
    let encoder = state
        .pix_encoder
        .as_ref()
        .ok_or_else(|| DomainError::configuration("No PIX payee key configured"))?;

    let payload = encoder.encode(request.amount)?;

    Ok(Json(PixPayloadResponse {
        amount: format_amount(request.amount),
        payload,
    }))
}
