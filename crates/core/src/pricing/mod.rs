pub mod base;
pub mod coating;
pub mod noise;
pub mod registry;
pub mod surface;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::client::schema_keys;
use crate::domain::fields::{FieldError, FieldSet, COMPLEXITY, QUANTITY};

pub use base::BaseStrategy;
pub use coating::{CoatingService, CoatingStrategy};
pub use noise::{MarketNoise, NoMarketNoise, SeededMarketNoise};
pub use registry::{SchemaRegistry, DEFAULT_SERVICE_TYPE};
pub use surface::{MaskingLevel, SurfaceTreatmentStrategy};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("amount overflowed while computing `{0}`")]
    Overflow(&'static str),
}

/// One pricing formula bound to a service-type key.
///
/// Implementations are stateless: the same field set always yields the same
/// amount, and the amount is never below the strategy's floor price.
pub trait SchemaStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn calculate(&self, fields: &FieldSet) -> Result<Decimal, PricingError>;
}

pub fn default_floor_price() -> Decimal {
    Decimal::new(50, 0)
}

pub fn clamp_to_floor(amount: Decimal, floor: Decimal) -> Decimal {
    amount.max(floor)
}

/// Multiplies `factors` left to right, reporting overflow against `stage`.
pub(crate) fn product(stage: &'static str, factors: &[Decimal]) -> Result<Decimal, PricingError> {
    factors.iter().try_fold(Decimal::ONE, |acc, factor| {
        acc.checked_mul(*factor).ok_or(PricingError::Overflow(stage))
    })
}

/// Quantity, unit rate and complexity after schema overrides.
pub(crate) struct BaseInputs {
    pub quantity: u32,
    pub unit_rate: Decimal,
    pub complexity: Decimal,
}

pub(crate) fn base_inputs(fields: &FieldSet, default_rate: Decimal) -> Result<BaseInputs, PricingError> {
    let quantity = fields.required_count(QUANTITY)?;
    let complexity = fields.required_decimal(COMPLEXITY)?;
    let schema = fields.schema();

    let unit_rate = schema.decimal(schema_keys::UNIT_RATE).unwrap_or(default_rate);
    let complexity = match schema.decimal(schema_keys::COMPLEXITY_MULTIPLIER) {
        Some(multiplier) => complexity
            .checked_mul(multiplier)
            .ok_or(PricingError::Overflow("complexity_multiplier"))?,
        None => complexity,
    };

    Ok(BaseInputs { quantity, unit_rate, complexity })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{base_inputs, clamp_to_floor, product, PricingError};
    use crate::domain::client::QuoteSchema;
    use crate::domain::fields::FieldSet;

    #[test]
    fn clamp_never_returns_less_than_floor() {
        let floor = Decimal::new(50, 0);
        assert_eq!(clamp_to_floor(Decimal::ZERO, floor), floor);
        assert_eq!(clamp_to_floor(Decimal::new(-10, 0), floor), floor);
        assert_eq!(clamp_to_floor(Decimal::new(51, 0), floor), Decimal::new(51, 0));
    }

    #[test]
    fn product_reports_overflow_instead_of_panicking() {
        let huge = Decimal::MAX;
        assert_eq!(product("test", &[huge, Decimal::new(2, 0)]), Err(PricingError::Overflow("test")));
    }

    #[test]
    fn schema_overrides_adjust_rate_and_complexity() {
        let fields = FieldSet::new().with("quantity", 10).with("complexity", 2.0).with_schema(
            QuoteSchema::new().with("unit_rate", 7).with("complexity_multiplier", "1.5"),
        );

        let inputs = base_inputs(&fields, Decimal::new(5, 0)).expect("inputs");

        assert_eq!(inputs.quantity, 10);
        assert_eq!(inputs.unit_rate, Decimal::new(7, 0));
        assert_eq!(inputs.complexity, Decimal::new(3, 0));
    }
}
