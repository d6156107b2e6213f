use rust_decimal::Decimal;

use super::{base_inputs, clamp_to_floor, default_floor_price, product, PricingError, SchemaStrategy};
use crate::domain::fields::{FieldSet, TURNAROUND_DAYS};

const DEFAULT_TURNAROUND_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoatingService {
    ConformalCoating,
    Parylene,
    NanoCoating,
    Encapsulation,
}

impl CoatingService {
    pub const ALL: [CoatingService; 4] =
        [Self::ConformalCoating, Self::Parylene, Self::NanoCoating, Self::Encapsulation];

    pub fn key(self) -> &'static str {
        match self {
            Self::ConformalCoating => "conformal_coating",
            Self::Parylene => "parylene",
            Self::NanoCoating => "nano_coating",
            Self::Encapsulation => "encapsulation",
        }
    }

    pub fn multiplier(self) -> Decimal {
        match self {
            Self::ConformalCoating => Decimal::ONE,
            Self::Parylene => Decimal::new(18, 1),
            Self::NanoCoating => Decimal::new(22, 1),
            Self::Encapsulation => Decimal::new(15, 1),
        }
    }
}

pub fn material_multiplier(material: Option<&str>) -> Decimal {
    let Some(material) = material else {
        return Decimal::ONE;
    };
    match material.trim().to_ascii_lowercase().replace(&['-', '_'][..], " ").as_str() {
        "steel" => Decimal::new(12, 1),
        "plastic" => Decimal::new(7, 1),
        "titanium" => Decimal::new(3, 0),
        "carbon fiber" => Decimal::new(25, 1),
        _ => Decimal::ONE,
    }
}

/// Catalog coating services priced by material and service multipliers.
///
/// `quantity * unit_rate * complexity * material * service * urgency`, where
/// jobs due in five days or fewer carry the rush multiplier.
pub struct CoatingStrategy {
    service: CoatingService,
    unit_rate: Decimal,
    floor: Decimal,
}

impl CoatingStrategy {
    pub fn new(service: CoatingService, floor: Decimal) -> Self {
        Self { service, unit_rate: Decimal::new(5, 0), floor }
    }

    pub fn service(&self) -> CoatingService {
        self.service
    }
}

impl SchemaStrategy for CoatingStrategy {
    fn name(&self) -> &'static str {
        self.service.key()
    }

    fn calculate(&self, fields: &FieldSet) -> Result<Decimal, PricingError> {
        let inputs = base_inputs(fields, self.unit_rate)?;
        let turnaround = fields.optional_integer(TURNAROUND_DAYS).unwrap_or(DEFAULT_TURNAROUND_DAYS);
        let urgency = if turnaround <= 5 { Decimal::new(13, 1) } else { Decimal::ONE };

        let amount = product(
            self.service.key(),
            &[
                Decimal::from(inputs.quantity),
                inputs.unit_rate,
                inputs.complexity,
                material_multiplier(fields.material()),
                self.service.multiplier(),
                urgency,
            ],
        )?;
        Ok(clamp_to_floor(amount, self.floor))
    }
}

impl Default for CoatingStrategy {
    fn default() -> Self {
        Self::new(CoatingService::ConformalCoating, default_floor_price())
    }
}
