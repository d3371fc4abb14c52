//! Recharge request repository trait

use std::fmt::Debug;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;

use super::{RechargeRequest, RechargeRequestId, RechargeStatus};
use crate::domain::account::AccountId;
use crate::domain::DomainError;

/// Ordering by creation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters for listing recharge requests
#[derive(Debug, Clone, Default)]
pub struct RechargeQuery {
    pub status: Option<RechargeStatus>,
    pub account_id: Option<AccountId>,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl RechargeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: RechargeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn matches(&self, request: &RechargeRequest) -> bool {
        self.status.is_none_or(|s| request.status() == s)
            && self
                .account_id
                .as_ref()
                .is_none_or(|id| request.account_id() == id)
    }
}

/// Repository for recharge request persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RechargeRepository: Send + Sync + Debug {
    async fn create(&self, request: RechargeRequest) -> Result<RechargeRequest, DomainError>;

    async fn get(&self, id: &RechargeRequestId) -> Result<Option<RechargeRequest>, DomainError>;

    async fn list(&self, query: &RechargeQuery) -> Result<Vec<RechargeRequest>, DomainError>;

    /// Compare-and-set the status.
    ///
    /// Returns the updated request when the current status was `from`, `None`
    /// when it was anything else, and `NotFound` when the request is missing.
    async fn transition(
        &self,
        id: &RechargeRequestId,
        from: RechargeStatus,
        to: RechargeStatus,
    ) -> Result<Option<RechargeRequest>, DomainError>;
}
