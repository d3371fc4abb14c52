//! Recharge request repositories and workflow service

mod in_memory;
mod postgres;
mod service;

pub use in_memory::InMemoryRechargeRepository;
pub use postgres::PostgresRechargeRepository;
pub use service::{RechargeService, RechargeServiceTrait, SubmitRechargeParams, SubmittedRecharge};
