//! Domain layer - Core business logic and entities

pub mod account;
pub mod error;
pub mod ledger;
pub mod llm;
pub mod pix;
pub mod recharge;
pub mod usage;

pub use account::{Account, AccountId, PlanTier};
pub use error::DomainError;
pub use ledger::{
    LedgerEntry, LedgerReceipt, LedgerStore, Reconciliation, Transaction, TransactionId,
    TransactionKind, TransactionQuery,
};
pub use llm::{LlmProvider, LlmRequest, LlmResponse, Message, MessageRole, Usage};
pub use pix::PixCodeEncoder;
pub use recharge::{
    CreditKind, Decision, RechargeQuery, RechargeRepository, RechargeRequest, RechargeRequestId,
    RechargeStatus, Resolution, SortOrder,
};
pub use usage::{InteractionMode, PlanFeatureFlags, PricingModel, TokenCount};
