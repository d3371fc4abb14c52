//! Plan-tier gating for metered interactions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::account::PlanTier;
use crate::domain::DomainError;

/// Kind of AI interaction being metered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Free-form conversation with prior turns
    Chat,
    /// Single-shot explanation of a prompt
    Explanation,
}

impl InteractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Explanation => "explanation",
        }
    }

    /// Description written on the debit transaction
    pub fn ledger_description(&self) -> &'static str {
        match self {
            Self::Chat => "AI chat interaction",
            Self::Explanation => "AI explanation",
        }
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::Chat),
            "explanation" => Ok(Self::Explanation),
            other => Err(DomainError::validation(format!(
                "Unknown interaction mode '{}'",
                other
            ))),
        }
    }
}

/// Feature gates applied to the intermediate tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanFeatureFlags {
    pub can_use_chat: bool,
    pub can_use_explanation: bool,
}

impl PlanFeatureFlags {
    pub fn new(can_use_chat: bool, can_use_explanation: bool) -> Self {
        Self {
            can_use_chat,
            can_use_explanation,
        }
    }

    pub fn allows(&self, mode: InteractionMode) -> bool {
        match mode {
            InteractionMode::Chat => self.can_use_chat,
            InteractionMode::Explanation => self.can_use_explanation,
        }
    }
}

impl Default for PlanFeatureFlags {
    fn default() -> Self {
        Self::new(false, true)
    }
}

/// Decide whether a tier may use a mode. First matching rule wins.
pub fn authorize(
    tier: PlanTier,
    mode: InteractionMode,
    flags: &PlanFeatureFlags,
) -> Result<(), DomainError> {
    match tier {
        PlanTier::Basic => Err(DomainError::plan_not_allowed(tier.as_str(), mode.as_str())),
        PlanTier::Intermediate if !flags.allows(mode) => {
            Err(DomainError::plan_not_allowed(tier.as_str(), mode.as_str()))
        }
        PlanTier::Intermediate | PlanTier::Advanced | PlanTier::Admin => Ok(()),
    }
}
