//! Usage metering infrastructure

mod service;

pub use service::{
    ChargeReceipt, InteractionOutcome, InteractionParams, MeteringConfig, UsageMeteringService,
    UsageMeteringServiceTrait,
};
