//! Admin API endpoints for accounts and recharge resolution

pub mod accounts;
pub mod recharges;

use axum::{
    routing::{get, post, put},
    Router,
};

use super::state::AppState;

/// Create admin API router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/accounts", post(accounts::open_account))
        .route("/accounts/{account_id}/plan", put(accounts::set_plan))
        .route(
            "/accounts/{account_id}/reconcile",
            get(accounts::reconcile_account),
        )
        // Recharge requests
        .route("/recharges", get(recharges::list_recharges))
        .route("/recharges/{request_id}", get(recharges::get_recharge))
        .route(
            "/recharges/{request_id}/resolve",
            post(recharges::resolve_recharge),
        )
}
