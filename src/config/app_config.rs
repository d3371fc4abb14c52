use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::usage::{PlanFeatureFlags, PricingModel};
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::storage::{PostgresConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub billing: BillingConfig,
    pub pix: PixConfig,
    pub provider: ProviderConfig,
    pub admin: AdminConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageType,
    pub max_connections: u32,
    /// Falls back to `DATABASE_URL` when unset
    pub database_url: Option<String>,
}

/// Metering thresholds and prices
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub minimum_operable_balance: Decimal,
    pub pricing: PricingModel,
    pub plan_flags: PlanFeatureFlags,
}

/// Payee details embedded in payment codes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PixConfig {
    /// Empty disables payment code rendering
    pub payee_key: String,
    pub merchant_name: String,
    pub merchant_city: String,
}

/// OpenAI-compatible text-generation provider
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Without a key every metered interaction fails with a configuration error
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Admin routes answer 401 while this is unset
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageType::InMemory,
            max_connections: 10,
            database_url: None,
        }
    }
}

impl StorageConfig {
    /// PostgreSQL settings, if a database URL is configured
    pub fn postgres(&self) -> Option<PostgresConfig> {
        self.database_url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty())
            .map(|url| PostgresConfig::new(url).with_max_connections(self.max_connections))
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            minimum_operable_balance: Decimal::new(5, 2),
            pricing: PricingModel::default(),
            plan_flags: PlanFeatureFlags::default(),
        }
    }
}

impl Default for PixConfig {
    fn default() -> Self {
        Self {
            payee_key: String::new(),
            merchant_name: "N".to_string(),
            merchant_city: "C".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
            max_tokens: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
