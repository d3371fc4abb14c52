//! Layered application configuration

mod app_config;

pub use app_config::{
    AdminConfig, AppConfig, BillingConfig, LogFormat, LoggingConfig, PixConfig, ProviderConfig,
    ServerConfig, StorageConfig,
};
