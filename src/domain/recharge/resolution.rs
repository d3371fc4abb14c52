//! Operator decisions and their outcomes

use serde::{Deserialize, Serialize};

use super::{RechargeRequest, RechargeStatus};

/// Operator verdict on a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn target_status(&self) -> RechargeStatus {
        match self {
            Self::Approved => RechargeStatus::Approved,
            Self::Rejected => RechargeStatus::Rejected,
        }
    }
}

/// Outcome of approve/reject.
///
/// `AlreadyResolved` is a no-op: the request was terminal before the call and
/// keeps its current state.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(RechargeRequest),
    AlreadyResolved(RechargeRequest),
}

impl Resolution {
    pub fn request(&self) -> &RechargeRequest {
        match self {
            Self::Resolved(request) | Self::AlreadyResolved(request) => request,
        }
    }

    pub fn into_request(self) -> RechargeRequest {
        match self {
            Self::Resolved(request) | Self::AlreadyResolved(request) => request,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}
