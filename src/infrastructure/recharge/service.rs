//! Recharge request workflow service

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::account::AccountId;
use crate::domain::ledger::{LedgerEntry, LedgerReceipt, LedgerStore};
use crate::domain::pix::PixCodeEncoder;
use crate::domain::recharge::{
    CreditKind, Decision, RechargeQuery, RechargeRepository, RechargeRequest, RechargeRequestId,
    RechargeStatus, Resolution,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_recharge_event;

/// Parameters for submitting a recharge request
#[derive(Debug, Clone)]
pub struct SubmitRechargeParams {
    pub account_id: AccountId,
    pub payer_display_name: String,
    pub amount: Decimal,
    pub credit_kind: CreditKind,
    pub quantity: Option<u32>,
    pub label: Option<String>,
}

impl SubmitRechargeParams {
    pub fn new(
        account_id: AccountId,
        payer_display_name: impl Into<String>,
        amount: Decimal,
        credit_kind: CreditKind,
    ) -> Self {
        Self {
            account_id,
            payer_display_name: payer_display_name.into(),
            amount,
            credit_kind,
            quantity: None,
            label: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A freshly submitted request plus the payment code to pay it with
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedRecharge {
    pub request: RechargeRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_payload: Option<String>,
}

/// Trait for the recharge workflow
#[async_trait]
pub trait RechargeServiceTrait: Send + Sync + Debug {
    /// Record a claimed payment as a pending request
    async fn submit(&self, params: SubmitRechargeParams) -> Result<SubmittedRecharge, DomainError>;

    async fn get(&self, id: &RechargeRequestId) -> Result<RechargeRequest, DomainError>;

    async fn list(&self, query: &RechargeQuery) -> Result<Vec<RechargeRequest>, DomainError>;

    /// Approve a pending request, crediting its account exactly once
    async fn approve(&self, id: &RechargeRequestId) -> Result<Resolution, DomainError>;

    /// Reject a pending request; no balance effect
    async fn reject(&self, id: &RechargeRequestId) -> Result<Resolution, DomainError>;

    async fn resolve(
        &self,
        id: &RechargeRequestId,
        decision: Decision,
    ) -> Result<Resolution, DomainError> {
        match decision {
            Decision::Approved => self.approve(id).await,
            Decision::Rejected => self.reject(id).await,
        }
    }
}

/// Recharge workflow backed by a request repository and the ledger
#[derive(Debug)]
pub struct RechargeService {
    repository: Arc<dyn RechargeRepository>,
    ledger: Arc<dyn LedgerStore>,
    encoder: Option<PixCodeEncoder>,
}

impl RechargeService {
    pub fn new(repository: Arc<dyn RechargeRepository>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            repository,
            ledger,
            encoder: None,
        }
    }

    /// Attach payment codes to submitted requests
    pub fn with_encoder(mut self, encoder: PixCodeEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    async fn require(&self, id: &RechargeRequestId) -> Result<RechargeRequest, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Recharge request '{}' not found", id)))
    }

    async fn credit(&self, request: &RechargeRequest) -> Result<LedgerReceipt, DomainError> {
        let entry = LedgerEntry::credit(request.amount(), request.credit_description())
            .with_reference(request.id().as_str());

        self.ledger.credit_and_log(request.account_id(), entry).await
    }

    /// Complete the credit of an approved request if it never reached the ledger
    async fn ensure_credited(&self, request: &RechargeRequest) -> Result<(), DomainError> {
        let existing = self
            .ledger
            .find_by_reference(request.account_id(), request.id().as_str())
            .await?;

        if existing.is_some() {
            return Ok(());
        }

        let receipt = self.credit(request).await?;
        if receipt.applied {
            warn!(
                request_id = %request.id(),
                account_id = %request.account_id(),
                amount = %request.amount(),
                "Completed missing credit for approved recharge request"
            );
            record_recharge_event("credit_repaired");
        }

        Ok(())
    }

    async fn already_resolved(&self, request: RechargeRequest) -> Result<Resolution, DomainError> {
        if request.status() == RechargeStatus::Approved {
            self.ensure_credited(&request).await?;
        }

        record_recharge_event("already_resolved");
        Ok(Resolution::AlreadyResolved(request))
    }
}

#[async_trait]
impl RechargeServiceTrait for RechargeService {
    async fn submit(&self, params: SubmitRechargeParams) -> Result<SubmittedRecharge, DomainError> {
        if self.ledger.get_account(&params.account_id).await?.is_none() {
            return Err(DomainError::account_not_found(params.account_id.as_str()));
        }

        let request = RechargeRequest::submit(
            params.account_id,
            params.payer_display_name,
            params.amount,
            params.credit_kind,
        )?
        .with_quantity(params.quantity)?
        .with_label(params.label)?;

        let pix_payload = self
            .encoder
            .as_ref()
            .map(|encoder| encoder.encode(request.amount()))
            .transpose()?;

        let request = self.repository.create(request).await?;

        info!(
            request_id = %request.id(),
            account_id = %request.account_id(),
            amount = %request.amount(),
            "Recharge request submitted"
        );
        record_recharge_event("created");

        Ok(SubmittedRecharge {
            request,
            pix_payload,
        })
    }

    async fn get(&self, id: &RechargeRequestId) -> Result<RechargeRequest, DomainError> {
        self.require(id).await
    }

    async fn list(&self, query: &RechargeQuery) -> Result<Vec<RechargeRequest>, DomainError> {
        self.repository.list(query).await
    }

    async fn approve(&self, id: &RechargeRequestId) -> Result<Resolution, DomainError> {
        let request = self.require(id).await?;
        if request.status().is_terminal() {
            return self.already_resolved(request).await;
        }

        let Some(claimed) = self
            .repository
            .transition(id, RechargeStatus::Pending, RechargeStatus::Approved)
            .await?
        else {
            let current = self.require(id).await?;
            return self.already_resolved(current).await;
        };

        match self.credit(&claimed).await {
            Ok(receipt) => {
                info!(
                    request_id = %id,
                    account_id = %claimed.account_id(),
                    amount = %claimed.amount(),
                    balance = %receipt.balance,
                    "Recharge request approved"
                );
                record_recharge_event("approved");

                Ok(Resolution::Resolved(claimed))
            }
            Err(e) => {
                record_recharge_event("credit_failed");

                // A concurrent repair may have written the credit under the same reference
                let credited = self
                    .ledger
                    .find_by_reference(claimed.account_id(), id.as_str())
                    .await;
                if let Ok(Some(_)) = credited {
                    warn!(
                        request_id = %id,
                        error = %e,
                        "Credit reported failure but is recorded, keeping approval"
                    );
                    return Ok(Resolution::Resolved(claimed));
                }

                warn!(request_id = %id, error = %e, "Credit failed, reverting approval");
                if let Err(revert) = self
                    .repository
                    .transition(id, RechargeStatus::Approved, RechargeStatus::Pending)
                    .await
                {
                    error!(
                        request_id = %id,
                        error = %revert,
                        "Failed to revert approval after credit failure"
                    );
                }

                Err(e)
            }
        }
    }

    async fn reject(&self, id: &RechargeRequestId) -> Result<Resolution, DomainError> {
        let request = self.require(id).await?;
        if request.status().is_terminal() {
            return self.already_resolved(request).await;
        }

        match self
            .repository
            .transition(id, RechargeStatus::Pending, RechargeStatus::Rejected)
            .await?
        {
            Some(rejected) => {
                info!(request_id = %id, "Recharge request rejected");
                record_recharge_event("rejected");

                Ok(Resolution::Resolved(rejected))
            }
            None => {
                let current = self.require(id).await?;
                self.already_resolved(current).await
            }
        }
    }
}
