//! Account holder API endpoints

pub mod accounts;
pub mod interactions;
pub mod pix;
pub mod recharges;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/interactions", post(interactions::create_interaction))
        .route("/accounts/{account_id}/balance", get(accounts::get_balance))
        .route(
            "/accounts/{account_id}/transactions",
            get(accounts::list_transactions),
        )
        .route(
            "/accounts/{account_id}/recharges",
            get(recharges::list_account_recharges),
        )
        .route("/recharges", post(recharges::create_recharge))
        .route("/pix/payload", post(pix::create_pix_payload))
}
