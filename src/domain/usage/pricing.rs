//! Pricing model for metered AI interactions

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::ledger::AMOUNT_SCALE;
use crate::domain::DomainError;

const ONE_MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Per-token pricing with a margin and a minimum charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingModel {
    /// Price per one million input (prompt) tokens
    pub price_per_million_input: Decimal,
    /// Price per one million output (completion) tokens
    pub price_per_million_output: Decimal,
    /// Multiplier applied on top of the raw provider cost
    pub margin_multiplier: Decimal,
    /// Lowest amount a single interaction is charged
    pub minimum_charge_floor: Decimal,
}

/// Breakdown of a computed charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChargeQuote {
    pub raw_cost: Decimal,
    pub final_cost: Decimal,
    pub charge: Decimal,
}

impl PricingModel {
    pub fn new(
        price_per_million_input: Decimal,
        price_per_million_output: Decimal,
        margin_multiplier: Decimal,
        minimum_charge_floor: Decimal,
    ) -> Self {
        Self {
            price_per_million_input,
            price_per_million_output,
            margin_multiplier,
            minimum_charge_floor,
        }
    }

    /// Reject models that could produce a zero or negative debit
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.price_per_million_input < Decimal::ZERO
            || self.price_per_million_output < Decimal::ZERO
        {
            return Err(DomainError::configuration("Token prices cannot be negative"));
        }

        if self.margin_multiplier <= Decimal::ZERO {
            return Err(DomainError::configuration(
                "Margin multiplier must be positive",
            ));
        }

        if self.minimum_charge_floor < Decimal::new(1, AMOUNT_SCALE) {
            return Err(DomainError::configuration(format!(
                "Minimum charge floor must be at least 1e-{}",
                AMOUNT_SCALE
            )));
        }

        Ok(())
    }

    /// Charge for a token count, rounded up to the ledger's amount scale
    pub fn quote(&self, tokens_in: u64, tokens_out: u64) -> ChargeQuote {
        let raw_cost = Decimal::from(tokens_in) * (self.price_per_million_input / ONE_MILLION)
            + Decimal::from(tokens_out) * (self.price_per_million_output / ONE_MILLION);
        let final_cost = raw_cost * self.margin_multiplier;
        let charge = final_cost
            .max(self.minimum_charge_floor)
            .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::AwayFromZero);

        ChargeQuote {
            raw_cost: raw_cost.normalize(),
            final_cost: final_cost.normalize(),
            charge: charge.normalize(),
        }
    }
}

impl Default for PricingModel {
    fn default() -> Self {
        Self {
            price_per_million_input: Decimal::new(45, 2),
            price_per_million_output: Decimal::new(18, 1),
            margin_multiplier: Decimal::new(110, 2),
            minimum_charge_floor: Decimal::new(1, 5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn reference_model() -> PricingModel {
        PricingModel::new(dec!(0.45), dec!(1.8), dec!(1.10), dec!(0.00001))
    }

    #[test]
    fn test_quote_matches_reference_figures() {
        let quote = reference_model().quote(1000, 500);

        assert_eq!(quote.raw_cost, dec!(0.00135));
        assert_eq!(quote.final_cost, dec!(0.001485));
        assert_eq!(quote.charge, dec!(0.001485));
    }

    #[test]
    fn test_quote_applies_floor() {
        let quote = reference_model().quote(1, 0);

        assert!(quote.final_cost < dec!(0.00001));
        assert_eq!(quote.charge, dec!(0.00001));
    }

    #[test]
    fn test_zero_tokens_charge_the_floor() {
        assert_eq!(reference_model().quote(0, 0).charge, dec!(0.00001));
    }

    #[test]
    fn test_default_matches_reference_model() {
        assert_eq!(PricingModel::default(), reference_model());
    }

    #[test]
    fn test_validate() {
        assert!(reference_model().validate().is_ok());

        let mut model = reference_model();
        model.minimum_charge_floor = dec!(0);
        assert!(matches!(
            model.validate(),
            Err(DomainError::Configuration { .. })
        ));

        let mut model = reference_model();
        model.margin_multiplier = dec!(0);
        assert!(model.validate().is_err());

        let mut model = reference_model();
        model.price_per_million_input = dec!(-1);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_charge_is_rounded_up_to_ledger_scale() {
        let quote = PricingModel::default().quote(1001, 0);

        assert_eq!(quote.final_cost, dec!(0.000495495));
        assert_eq!(quote.charge, dec!(0.0004955));
        assert!(quote.charge.scale() <= AMOUNT_SCALE);
        assert!(quote.charge >= quote.final_cost);
    }

    #[test]
    fn test_floor_below_ledger_scale_is_rejected() {
        let mut model = reference_model();

        model.minimum_charge_floor = dec!(0.000000001);
        assert!(matches!(model.validate(), Err(DomainError::Configuration { .. })));

        model.minimum_charge_floor = dec!(0.00000001);
        assert!(model.validate().is_ok());
    }
}
