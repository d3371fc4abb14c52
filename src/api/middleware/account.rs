//! Account holder identification

use axum::http::HeaderMap;

use crate::api::types::ApiError;
use crate::domain::account::AccountId;

/// Header carrying the caller's account id when the body does not
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Resolve the calling account from the request body or the `X-Account-Id` header.
///
/// A missing id is an authentication failure (401); a malformed one is a 400.
pub fn resolve_account_id(
    from_body: Option<&str>,
    headers: &HeaderMap,
) -> Result<AccountId, ApiError> {
    let from_header = headers
        .get(ACCOUNT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    let raw = from_body
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .or(from_header.filter(|id| !id.is_empty()))
        .ok_or_else(|| ApiError::unauthorized("Account id is required"))?;

    AccountId::new(raw).map_err(ApiError::from)
}
