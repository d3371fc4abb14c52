//! In-memory recharge request repository

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::recharge::{
    RechargeQuery, RechargeRepository, RechargeRequest, RechargeRequestId, RechargeStatus,
    SortOrder,
};
use crate::domain::DomainError;

/// In-memory recharge request repository
#[derive(Debug, Default)]
pub struct InMemoryRechargeRepository {
    requests: RwLock<HashMap<RechargeRequestId, RechargeRequest>>,
}

impl InMemoryRechargeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RechargeRepository for InMemoryRechargeRepository {
    async fn create(&self, request: RechargeRequest) -> Result<RechargeRequest, DomainError> {
        let mut requests = self
            .requests
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        if requests.contains_key(request.id()) {
            return Err(DomainError::conflict(format!(
                "Recharge request '{}' already exists",
                request.id()
            )));
        }

        requests.insert(request.id().clone(), request.clone());
        Ok(request)
    }

    async fn get(&self, id: &RechargeRequestId) -> Result<Option<RechargeRequest>, DomainError> {
        let requests = self
            .requests
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(requests.get(id).cloned())
    }

    async fn list(&self, query: &RechargeQuery) -> Result<Vec<RechargeRequest>, DomainError> {
        let requests = self
            .requests
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut results: Vec<_> = requests
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });

        if query.order == SortOrder::Desc {
            results.reverse();
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(results.into_iter().skip(offset).take(limit).collect())
    }

    async fn transition(
        &self,
        id: &RechargeRequestId,
        from: RechargeStatus,
        to: RechargeStatus,
    ) -> Result<Option<RechargeRequest>, DomainError> {
        let mut requests = self
            .requests
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let request = requests
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("Recharge request '{}' not found", id)))?;

        if request.status() != from {
            return Ok(None);
        }

        request.set_status(to);
        Ok(Some(request.clone()))
    }
}
