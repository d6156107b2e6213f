use rust_decimal::Decimal;

use super::{base_inputs, clamp_to_floor, default_floor_price, product, PricingError, SchemaStrategy};
use crate::domain::fields::FieldSet;

/// `quantity * unit_rate * complexity`, clamped to the floor.
///
/// Also serves as the registry fallback for unknown service types.
pub struct BaseStrategy {
    unit_rate: Decimal,
    floor: Decimal,
}

impl BaseStrategy {
    pub fn new(floor: Decimal) -> Self {
        Self { unit_rate: Decimal::new(5, 0), floor }
    }
}

impl Default for BaseStrategy {
    fn default() -> Self {
        Self::new(default_floor_price())
    }
}

impl SchemaStrategy for BaseStrategy {
    fn name(&self) -> &'static str {
        "base"
    }

    fn calculate(&self, fields: &FieldSet) -> Result<Decimal, PricingError> {
        let inputs = base_inputs(fields, self.unit_rate)?;
        let amount = product(
            "base",
            &[Decimal::from(inputs.quantity), inputs.unit_rate, inputs.complexity],
        )?;
        Ok(clamp_to_floor(amount, self.floor))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::BaseStrategy;
    use crate::domain::fields::FieldSet;
    use crate::pricing::{PricingError, SchemaStrategy};

    #[test]
    fn small_jobs_hit_the_floor() {
        let fields = FieldSet::new().with("quantity", 1).with("complexity", 1.0);
        assert_eq!(BaseStrategy::default().calculate(&fields), Ok(Decimal::new(50, 0)));
    }

    #[test]
    fn larger_jobs_scale_linearly() {
        let fields = FieldSet::new().with("quantity", 40).with("complexity", 1.5);
        assert_eq!(BaseStrategy::default().calculate(&fields), Ok(Decimal::new(300, 0)));
    }

    #[test]
    fn zero_quantity_still_returns_floor() {
        let fields = FieldSet::new().with("quantity", 0).with("complexity", 0.0);
        assert_eq!(BaseStrategy::default().calculate(&fields), Ok(Decimal::new(50, 0)));
    }

    #[test]
    fn unrelated_fields_are_ignored() {
        let plain = FieldSet::new().with("quantity", 40).with("complexity", 1.5);
        let noisy = plain.clone().with("masking_level", "heavy").with("turnaround_days", 1);

        let strategy = BaseStrategy::default();
        assert_eq!(strategy.calculate(&plain), strategy.calculate(&noisy));
    }

    #[test]
    fn missing_complexity_is_a_field_error() {
        let fields = FieldSet::new().with("quantity", 40);
        assert!(matches!(BaseStrategy::default().calculate(&fields), Err(PricingError::Field(_))));
    }
}
