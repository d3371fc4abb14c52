//! Infrastructure layer - storage backends, services and external clients

pub mod ledger;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod recharge;
pub mod storage;
pub mod usage;
