//! Admin authentication extractor
//!
//! Accepts the configured admin key from either:
//! - `X-Admin-Key: <key>`
//! - `Authorization: Bearer <key>`

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;

const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Extractor that requires the admin key
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_api_key.as_deref() else {
            warn!("Admin request rejected: no admin key configured");
            return Err(ApiError::unauthorized("Admin access is not configured"));
        };

        let provided = extract_admin_key(&parts.headers)?;

        if provided != expected {
            return Err(ApiError::unauthorized("Invalid admin key"));
        }

        debug!("Admin access granted");
        Ok(RequireAdmin)
    }
}

fn extract_admin_key(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(value) = headers.get(ADMIN_KEY_HEADER) {
        let key = value
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid X-Admin-Key header encoding"))?;

        return Ok(key.trim().to_string());
    }

    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    Err(ApiError::unauthorized(
        "Admin key required. Provide via 'X-Admin-Key: <key>' or 'Authorization: Bearer <key>' header",
    ))
}
