use rust_decimal::Decimal;
use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Plan '{plan}' does not allow {feature}")]
    PlanNotAllowed { plan: String, feature: String },

    #[error("Insufficient balance: {balance} (minimum operable balance is above {threshold})")]
    InsufficientBalance { balance: Decimal, threshold: Decimal },

    #[error("Account '{account_id}' not found")]
    AccountNotFound { account_id: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn plan_not_allowed(plan: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::PlanNotAllowed {
            plan: plan.into(),
            feature: feature.into(),
        }
    }

    pub fn insufficient_balance(balance: Decimal, threshold: Decimal) -> Self {
        Self::InsufficientBalance { balance, threshold }
    }

    pub fn account_not_found(account_id: impl Into<String>) -> Self {
        Self::AccountNotFound {
            account_id: account_id.into(),
        }
    }

    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
