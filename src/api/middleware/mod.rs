//! API middleware components

pub mod account;
pub mod admin_auth;
pub mod logging;
pub mod metrics;

pub use account::{resolve_account_id, ACCOUNT_ID_HEADER};
pub use admin_auth::RequireAdmin;
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
