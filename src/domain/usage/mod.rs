//! Usage metering domain
//!
//! Pricing, plan-tier gating and token accounting for metered AI interactions.
//! The charging workflow itself lives in `infrastructure::usage`.

mod plan;
mod pricing;
mod tokens;

pub use plan::{authorize, InteractionMode, PlanFeatureFlags};
pub use pricing::{ChargeQuote, PricingModel};
pub use tokens::{estimate_tokens, TokenCount, CHARS_PER_TOKEN};
