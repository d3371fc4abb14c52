//! Account entity and plan tiers

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Maximum length for account IDs
pub const MAX_ACCOUNT_ID_LENGTH: usize = 128;

/// Account identifier, as issued by the platform's user directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create a validated account ID
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        validate_account_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a raw account ID
pub fn validate_account_id(id: &str) -> Result<(), DomainError> {
    if id.trim().is_empty() {
        return Err(DomainError::validation("Account ID cannot be empty"));
    }

    if id.len() > MAX_ACCOUNT_ID_LENGTH {
        return Err(DomainError::validation(format!(
            "Account ID too long: {} chars (max {})",
            id.len(),
            MAX_ACCOUNT_ID_LENGTH
        )));
    }

    if id.chars().any(char::is_whitespace) {
        return Err(DomainError::validation(
            "Account ID cannot contain whitespace",
        ));
    }

    Ok(())
}

/// Subscription level gating the monetized features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Basic,
    Intermediate,
    Advanced,
    Admin,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "admin" => Ok(Self::Admin),
            other => Err(DomainError::validation(format!(
                "Unknown plan tier '{}'",
                other
            ))),
        }
    }
}

/// A billable account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    plan_tier: PlanTier,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with a zero balance
    pub fn open(id: AccountId, plan_tier: PlanTier) -> Self {
        let now = Utc::now();

        Self {
            id,
            plan_tier,
            balance: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild an account from persisted fields
    pub fn restore(
        id: AccountId,
        plan_tier: PlanTier,
        balance: Decimal,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            plan_tier,
            balance,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn plan_tier(&self) -> PlanTier {
        self.plan_tier
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_plan_tier(&mut self, plan_tier: PlanTier) {
        self.plan_tier = plan_tier;
        self.updated_at = Utc::now();
    }

    /// Apply a signed delta, returning the new balance. No clamping.
    pub(crate) fn apply_delta(&mut self, delta: Decimal) -> Decimal {
        self.balance += delta;
        self.updated_at = Utc::now();
        self.balance
    }
}
