//! Recharge request workflow domain
//!
//! `pending → approved | rejected`, resolved manually by an operator. Approval
//! turns into exactly one ledger credit.

mod entity;
mod repository;
mod resolution;

pub use entity::{
    CreditKind, RechargeRequest, RechargeRequestId, RechargeStatus, MAX_LABEL_LENGTH,
    MAX_PAYER_NAME_LENGTH,
};
pub use repository::{RechargeQuery, RechargeRepository, SortOrder};
pub use resolution::{Decision, Resolution};

#[cfg(test)]
pub use repository::MockRechargeRepository;
