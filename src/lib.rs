//! Edu Ledger
//!
//! Monetary core of an education platform:
//! - Per-account ledger with an append-only transaction log
//! - Metered AI interactions gated by plan tier and balance
//! - Manually resolved recharge requests credited exactly once
//! - Static PIX payment codes for collecting recharges

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use api::state::AppState;
use domain::llm::LlmProvider;
use domain::pix::PixCodeEncoder;
use infrastructure::llm::{HttpClient, OpenAiProvider};
use infrastructure::recharge::RechargeService;
use infrastructure::storage::StorageFactory;
use infrastructure::usage::{MeteringConfig, UsageMeteringService};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let postgres = config.storage.postgres();
    let storage = StorageFactory::create(config.storage.backend, postgres.as_ref()).await?;

    let provider = create_llm_provider(config)?;
    let metering_config = create_metering_config(config);

    if let Err(e) = metering_config.pricing.validate() {
        error!("Pricing model is invalid, metered interactions will fail: {}", e);
    }

    let metering = UsageMeteringService::new(storage.ledger.clone(), provider, metering_config);

    let pix_encoder = create_pix_encoder(config);
    let mut recharges = RechargeService::new(storage.recharges.clone(), storage.ledger.clone());
    if let Some(encoder) = &pix_encoder {
        recharges = recharges.with_encoder(encoder.clone());
    }

    let mut state = AppState::new(storage.ledger, Arc::new(metering), Arc::new(recharges));

    if let Some(encoder) = pix_encoder {
        state = state.with_pix_encoder(encoder);
    }

    match config.admin.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => state = state.with_admin_api_key(key.trim()),
        _ => warn!("No admin API key configured, admin routes are disabled"),
    }

    Ok(state)
}

/// Build the text-generation provider; `None` when no API key is configured
fn create_llm_provider(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn LlmProvider>>> {
    let provider_config = &config.provider;

    let Some(api_key) = provider_config
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
    else {
        error!("No provider API key configured, metered interactions will fail");
        return Ok(None);
    };

    let client = HttpClient::with_timeout(Duration::from_secs(provider_config.timeout_secs))?;
    let provider = OpenAiProvider::with_base_url(client, api_key, &provider_config.base_url);

    info!(
        base_url = %provider_config.base_url,
        model = %provider_config.model,
        "Text-generation provider configured"
    );

    Ok(Some(Arc::new(provider)))
}

fn create_metering_config(config: &AppConfig) -> MeteringConfig {
    MeteringConfig {
        minimum_operable_balance: config.billing.minimum_operable_balance,
        pricing: config.billing.pricing.clone(),
        plan_flags: config.billing.plan_flags,
        model: config.provider.model.clone(),
        max_tokens: config.provider.max_tokens,
        ..MeteringConfig::default()
    }
}

/// Build the payment code encoder; `None` when no payee key is configured
pub fn create_pix_encoder(config: &AppConfig) -> Option<PixCodeEncoder> {
    let pix = &config.pix;

    if pix.payee_key.trim().is_empty() {
        warn!("No PIX payee key configured, payment codes are disabled");
        return None;
    }

    let encoder = PixCodeEncoder::new(pix.payee_key.trim())
        .with_merchant_name(pix.merchant_name.as_str())
        .with_merchant_city(pix.merchant_city.as_str());

    match encoder.validate() {
        Ok(()) => Some(encoder),
        Err(e) => {
            error!("PIX configuration is invalid, payment codes are disabled: {}", e);
            None
        }
    }
}
