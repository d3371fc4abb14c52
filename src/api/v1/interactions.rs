//! Metered AI interactions

use axum::extract::State;
use axum::http::HeaderMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::middleware::resolve_account_id;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::llm::{Message, MessageRole};
use crate::domain::usage::InteractionMode;
use crate::infrastructure::usage::{InteractionOutcome, InteractionParams};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRequest {
    /// Falls back to the `X-Account-Id` header
    pub account_id: Option<String>,
    pub mode: InteractionMode,
    pub prompt_text: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<HistoryMessage> for Message {
    fn from(message: HistoryMessage) -> Self {
        Message::new(message.role, message.content)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    pub text: String,
    pub cost: Decimal,
    pub remaining_balance: Decimal,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub tokens_estimated: bool,
    pub transaction_id: String,
}

impl From<InteractionOutcome> for InteractionResponse {
    fn from(outcome: InteractionOutcome) -> Self {
        Self {
            text: outcome.text,
            cost: outcome.cost,
            remaining_balance: outcome.remaining_balance,
            tokens_in: outcome.tokens_in,
            tokens_out: outcome.tokens_out,
            tokens_estimated: outcome.tokens_estimated,
            transaction_id: outcome.transaction_id.to_string(),
        }
    }
}

/// POST /v1/interactions
pub async fn create_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InteractionRequest>,
) -> Result<Json<InteractionResponse>, ApiError> {
    let account_id = resolve_account_id(request.account_id.as_deref(), &headers)?;

    if request.prompt_text.trim().is_empty() {
        return Err(ApiError::bad_request("promptText cannot be empty"));
    }

    let params = InteractionParams::new(account_id, request.mode, request.prompt_text)
        .with_history(
            request
                .conversation_history
                .into_iter()
                .map(Message::from)
                .collect(),
        );

    let outcome = state.metering.interact(params).await?;

    Ok(Json(outcome.into()))
}
