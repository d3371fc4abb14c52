//! Recharge request entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::domain::pix::validate_amount;
use crate::domain::DomainError;

/// Maximum length for the payer display name
pub const MAX_PAYER_NAME_LENGTH: usize = 120;

/// Maximum length for the optional label
pub const MAX_LABEL_LENGTH: usize = 200;

/// Unique identifier for a recharge request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RechargeRequestId(String);

impl RechargeRequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique ID
    pub fn generate() -> Self {
        Self(format!("rch-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RechargeRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Workflow state. Approved and rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RechargeStatus {
    Pending,
    Approved,
    Rejected,
}

impl RechargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RechargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RechargeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::validation(format!(
                "Unknown recharge status '{}'",
                other
            ))),
        }
    }
}

/// What the payer is buying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditKind {
    /// Plain top-up of the currency balance
    CurrencyBalance,
    /// A package of credit units priced at `amount`
    CreditUnit,
}

impl CreditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrencyBalance => "currency_balance",
            Self::CreditUnit => "credit_unit",
        }
    }
}

impl FromStr for CreditKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "currency_balance" => Ok(Self::CurrencyBalance),
            "credit_unit" => Ok(Self::CreditUnit),
            other => Err(DomainError::validation(format!(
                "Unknown credit kind '{}'",
                other
            ))),
        }
    }
}

/// A claimed external payment awaiting an operator decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RechargeRequest {
    id: RechargeRequestId,
    account_id: AccountId,
    payer_display_name: String,
    amount: Decimal,
    status: RechargeStatus,
    credit_kind: CreditKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_at: Option<DateTime<Utc>>,
}

impl RechargeRequest {
    /// Validate holder input and create a pending request
    pub fn submit(
        account_id: AccountId,
        payer_display_name: impl Into<String>,
        amount: Decimal,
        credit_kind: CreditKind,
    ) -> Result<Self, DomainError> {
        validate_amount(amount)?;

        let payer_display_name = payer_display_name.into().trim().to_string();
        if payer_display_name.is_empty() {
            return Err(DomainError::validation("Payer name cannot be empty"));
        }

        if payer_display_name.chars().count() > MAX_PAYER_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Payer name too long (max {} chars)",
                MAX_PAYER_NAME_LENGTH
            )));
        }

        Ok(Self {
            id: RechargeRequestId::generate(),
            account_id,
            payer_display_name,
            amount,
            status: RechargeStatus::Pending,
            credit_kind,
            quantity: None,
            label: None,
            created_at: Utc::now(),
            resolved_at: None,
        })
    }

    pub fn with_quantity(mut self, quantity: Option<u32>) -> Result<Self, DomainError> {
        if quantity == Some(0) {
            return Err(DomainError::validation("Quantity must be positive"));
        }

        self.quantity = quantity;
        Ok(self)
    }

    pub fn with_label(mut self, label: Option<String>) -> Result<Self, DomainError> {
        let label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        if label
            .as_ref()
            .is_some_and(|l| l.chars().count() > MAX_LABEL_LENGTH)
        {
            return Err(DomainError::validation(format!(
                "Label too long (max {} chars)",
                MAX_LABEL_LENGTH
            )));
        }

        self.label = label;
        Ok(self)
    }

    /// Rebuild a request from persisted fields
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: RechargeRequestId,
        account_id: AccountId,
        payer_display_name: String,
        amount: Decimal,
        status: RechargeStatus,
        credit_kind: CreditKind,
        quantity: Option<u32>,
        label: Option<String>,
        created_at: DateTime<Utc>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            account_id,
            payer_display_name,
            amount,
            status,
            credit_kind,
            quantity,
            label,
            created_at,
            resolved_at,
        }
    }

    pub fn id(&self) -> &RechargeRequestId {
        &self.id
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn payer_display_name(&self) -> &str {
        &self.payer_display_name
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn status(&self) -> RechargeStatus {
        self.status
    }

    pub fn credit_kind(&self) -> CreditKind {
        self.credit_kind
    }

    pub fn quantity(&self) -> Option<u32> {
        self.quantity
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Description of the ledger credit produced by approval
    pub fn credit_description(&self) -> String {
        match &self.label {
            Some(label) => format!("PIX recharge: {}", label),
            None => "PIX recharge".to_string(),
        }
    }

    /// Move to `status`, stamping the resolution time for terminal states
    pub(crate) fn set_status(&mut self, status: RechargeStatus) {
        self.status = status;
        self.resolved_at = status.is_terminal().then(Utc::now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account() -> AccountId {
        AccountId::new("acc-1").unwrap()
    }

    #[test]
    fn test_submit_lands_in_pending() {
        let request =
            RechargeRequest::submit(account(), " Maria Silva ", dec!(20.00), CreditKind::CurrencyBalance)
                .unwrap();

        assert_eq!(request.status(), RechargeStatus::Pending);
        assert_eq!(request.payer_display_name(), "Maria Silva");
        assert!(request.id().as_str().starts_with("rch-"));
        assert!(request.resolved_at().is_none());
    }

    #[test]
    fn test_submit_validates_amount_and_payer() {
        assert!(matches!(
            RechargeRequest::submit(account(), "Maria", dec!(0), CreditKind::CurrencyBalance),
            Err(DomainError::InvalidAmount { .. })
        ));
        assert!(matches!(
            RechargeRequest::submit(account(), "Maria", dec!(1.234), CreditKind::CurrencyBalance),
            Err(DomainError::InvalidAmount { .. })
        ));
        assert!(matches!(
            RechargeRequest::submit(account(), "  ", dec!(5), CreditKind::CurrencyBalance),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_optional_fields() {
        let request =
            RechargeRequest::submit(account(), "Maria", dec!(50), CreditKind::CreditUnit).unwrap();

        assert!(request.clone().with_quantity(Some(0)).is_err());

        let request = request
            .with_quantity(Some(100))
            .unwrap()
            .with_label(Some("100 credits".to_string()))
            .unwrap();

        assert_eq!(request.quantity(), Some(100));
        assert_eq!(request.credit_description(), "PIX recharge: 100 credits");
    }

    #[test]
    fn test_blank_label_is_dropped() {
        let request =
            RechargeRequest::submit(account(), "Maria", dec!(50), CreditKind::CurrencyBalance)
                .unwrap()
                .with_label(Some("   ".to_string()))
                .unwrap();

        assert_eq!(request.label(), None);
        assert_eq!(request.credit_description(), "PIX recharge");
    }

    #[test]
    fn test_set_status_stamps_resolution() {
        let mut request =
            RechargeRequest::submit(account(), "Maria", dec!(5), CreditKind::CurrencyBalance)
                .unwrap();

        request.set_status(RechargeStatus::Approved);
        assert!(request.resolved_at().is_some());

        request.set_status(RechargeStatus::Pending);
        assert!(request.resolved_at().is_none());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&RechargeStatus::Approved).unwrap(),
            "\"approved\""
        );
        assert_eq!(
            serde_json::to_string(&CreditKind::CreditUnit).unwrap(),
            "\"credit_unit\""
        );
        assert_eq!("rejected".parse::<RechargeStatus>().unwrap(), RechargeStatus::Rejected);
    }
}
