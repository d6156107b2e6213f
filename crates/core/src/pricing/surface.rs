use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{base_inputs, clamp_to_floor, default_floor_price, product, PricingError, SchemaStrategy};
use crate::domain::client::schema_keys;
use crate::domain::fields::{
    FieldSet, BOARD_AREA, CERTIFICATION_REQUIRED, MASKING_LEVEL, TURNAROUND_DAYS,
};

const DEFAULT_TURNAROUND_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskingLevel {
    #[default]
    None,
    Light,
    Heavy,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported masking level `{0}` (expected none|light|heavy)")]
pub struct UnknownMaskingLevel(pub String);

impl MaskingLevel {
    pub fn multiplier(self) -> Decimal {
        match self {
            Self::None => Decimal::ONE,
            Self::Light => Decimal::new(12, 1),
            Self::Heavy => Decimal::new(15, 1),
        }
    }
}

impl FromStr for MaskingLevel {
    type Err = UnknownMaskingLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "light" => Ok(Self::Light),
            "heavy" => Ok(Self::Heavy),
            other => Err(UnknownMaskingLevel(other.to_string())),
        }
    }
}

/// Surface treatment (conformal coat) pricing.
///
/// `quantity * unit_rate * complexity * urgency * masking * size_factor`, plus a
/// flat certification fee when required, less the volume discount once
/// `quantity` reaches the break point. The floor is applied last.
pub struct SurfaceTreatmentStrategy {
    unit_rate: Decimal,
    floor: Decimal,
    rush_threshold_days: i64,
    rush_multiplier: Decimal,
    volume_break: u32,
    volume_discount: Decimal,
    certification_fee: Decimal,
    baseline_board_area: Decimal,
    size_ramp: Decimal,
}

impl SurfaceTreatmentStrategy {
    pub fn new(floor: Decimal) -> Self {
        Self {
            unit_rate: Decimal::new(6, 0),
            floor,
            rush_threshold_days: 5,
            rush_multiplier: Decimal::new(13, 1),
            volume_break: 100,
            volume_discount: Decimal::new(10, 2),
            certification_fee: Decimal::new(150, 0),
            baseline_board_area: Decimal::new(100, 0),
            size_ramp: Decimal::new(5, 1),
        }
    }

    fn urgency(&self, fields: &FieldSet) -> Decimal {
        let turnaround = fields.optional_integer(TURNAROUND_DAYS).unwrap_or(DEFAULT_TURNAROUND_DAYS);
        if turnaround < self.rush_threshold_days {
            self.rush_multiplier
        } else {
            Decimal::ONE
        }
    }

    // Linear ramp above the baseline area; at or below it the factor is neutral.
    fn size_factor(&self, fields: &FieldSet) -> Decimal {
        let baseline = fields
            .schema()
            .decimal(schema_keys::BASELINE_BOARD_AREA)
            .filter(|baseline| *baseline > Decimal::ZERO)
            .unwrap_or(self.baseline_board_area);

        match fields.optional_decimal(BOARD_AREA) {
            Some(area) if area > baseline => (area - baseline)
                .checked_div(baseline)
                .and_then(|excess| excess.checked_mul(self.size_ramp))
                .map(|ramp| Decimal::ONE + ramp)
                .unwrap_or(Decimal::ONE),
            _ => Decimal::ONE,
        }
    }

    fn certification_required(&self, fields: &FieldSet) -> bool {
        fields.optional_bool(CERTIFICATION_REQUIRED).unwrap_or(false)
            || fields.schema().flag(schema_keys::CERTIFICATION_REQUIRED).unwrap_or(false)
    }
}

impl Default for SurfaceTreatmentStrategy {
    fn default() -> Self {
        Self::new(default_floor_price())
    }
}

impl SchemaStrategy for SurfaceTreatmentStrategy {
    fn name(&self) -> &'static str {
        "surface_treatment"
    }

    fn calculate(&self, fields: &FieldSet) -> Result<Decimal, PricingError> {
        let inputs = base_inputs(fields, self.unit_rate)?;
        let schema = fields.schema();

        let masking = fields
            .text(MASKING_LEVEL)
            .and_then(|level| level.parse::<MaskingLevel>().ok())
            .unwrap_or_default();

        let mut amount = product(
            "surface_treatment",
            &[
                Decimal::from(inputs.quantity),
                inputs.unit_rate,
                inputs.complexity,
                self.urgency(fields),
                masking.multiplier(),
                self.size_factor(fields),
            ],
        )?;

        if self.certification_required(fields) {
            let fee = schema.decimal(schema_keys::CERTIFICATION_FEE).unwrap_or(self.certification_fee);
            amount = amount.checked_add(fee).ok_or(PricingError::Overflow("certification_fee"))?;
        }

        let volume_break = schema.unsigned(schema_keys::VOLUME_BREAK).unwrap_or(self.volume_break);
        if inputs.quantity >= volume_break {
            let discount = schema
                .decimal(schema_keys::VOLUME_DISCOUNT)
                .unwrap_or(self.volume_discount)
                .clamp(Decimal::ZERO, Decimal::ONE);
            amount = product("volume_discount", &[amount, Decimal::ONE - discount])?;
        }

        Ok(clamp_to_floor(amount, self.floor))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{MaskingLevel, SurfaceTreatmentStrategy};
    use crate::domain::client::QuoteSchema;
    use crate::domain::fields::FieldSet;
    use crate::pricing::SchemaStrategy;

    fn job(quantity: u32, turnaround_days: i64) -> FieldSet {
        FieldSet::new()
            .with("service_type", "speccoat")
            .with("quantity", quantity)
            .with("complexity", 1.0)
            .with("turnaround_days", turnaround_days)
    }

    #[test]
    fn rush_heavy_masking_volume_job_matches_reference_amount() {
        let fields = job(100, 3).with("masking_level", "heavy");

        let amount = SurfaceTreatmentStrategy::default().calculate(&fields).expect("amount");

        assert_eq!(amount.round_dp(2), Decimal::new(105_300, 2));
    }

    #[test]
    fn standard_turnaround_has_no_rush_charge() {
        let fields = job(20, 5);
        let amount = SurfaceTreatmentStrategy::default().calculate(&fields).expect("amount");
        assert_eq!(amount, Decimal::new(120, 0));
    }

    #[test]
    fn absent_optional_fields_are_neutral() {
        let fields = FieldSet::new().with("quantity", 20).with("complexity", 1.0);
        let amount = SurfaceTreatmentStrategy::default().calculate(&fields).expect("amount");
        assert_eq!(amount, Decimal::new(120, 0));
    }

    #[test]
    fn unknown_masking_level_is_neutral() {
        let fields = job(20, 10).with("masking_level", "extreme");
        let amount = SurfaceTreatmentStrategy::default().calculate(&fields).expect("amount");
        assert_eq!(amount, Decimal::new(120, 0));
    }

    #[test]
    fn malformed_optional_turnaround_keeps_default() {
        let fields = job(20, 10).with("turnaround_days", "next week");
        let amount = SurfaceTreatmentStrategy::default().calculate(&fields).expect("amount");
        assert_eq!(amount, Decimal::new(120, 0));
    }

    #[test]
    fn board_area_above_baseline_ramps_linearly() {
        let fields = job(20, 10).with("board_area", 200);
        let amount = SurfaceTreatmentStrategy::default().calculate(&fields).expect("amount");
        assert_eq!(amount, Decimal::new(180, 0));
    }

    #[test]
    fn certification_fee_is_added_before_discount() {
        let fields = job(100, 10).with("certification_required", true);
        let amount = SurfaceTreatmentStrategy::default().calculate(&fields).expect("amount");
        // (600 + 150) * 0.9
        assert_eq!(amount, Decimal::new(675, 0));
    }

    #[test]
    fn client_schema_moves_volume_break_and_requires_certification() {
        let fields = job(50, 10).with_schema(
            QuoteSchema::new().with("volume_break", 50).with("certification_required", true),
        );
        let amount = SurfaceTreatmentStrategy::default().calculate(&fields).expect("amount");
        // (300 + 150) * 0.9
        assert_eq!(amount, Decimal::new(405, 0));
    }

    #[test]
    fn below_break_no_discount_and_floor_binds_for_tiny_jobs() {
        let strategy = SurfaceTreatmentStrategy::default();
        assert_eq!(strategy.calculate(&job(99, 10)).expect("amount"), Decimal::new(594, 0));
        assert_eq!(strategy.calculate(&job(1, 10)).expect("amount"), Decimal::new(50, 0));
    }

    #[test]
    fn masking_levels_parse_case_insensitively() {
        assert_eq!(" Heavy ".parse::<MaskingLevel>(), Ok(MaskingLevel::Heavy));
        assert_eq!("light".parse::<MaskingLevel>(), Ok(MaskingLevel::Light));
        assert_eq!("".parse::<MaskingLevel>(), Ok(MaskingLevel::None));
        assert!("extreme".parse::<MaskingLevel>().is_err());
    }
}
