use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::client::QuoteSchema;

pub const SERVICE_TYPE: &str = "service_type";
pub const MATERIAL: &str = "material";
pub const QUANTITY: &str = "quantity";
pub const COMPLEXITY: &str = "complexity";
pub const TURNAROUND_DAYS: &str = "turnaround_days";
pub const MASKING_LEVEL: &str = "masking_level";
pub const BOARD_AREA: &str = "board_area";
pub const CERTIFICATION_REQUIRED: &str = "certification_required";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("required field `{0}` is missing")]
    Missing(String),
    #[error("field `{field}` has invalid value `{value}`: {reason}")]
    Invalid { field: String, value: String, reason: String },
}

impl FieldError {
    fn invalid(field: &str, value: &FieldValue, reason: &str) -> Self {
        Self::Invalid {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A single job parameter as submitted by a caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.trim()).filter(|value| !value.is_empty()),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(value) => Some(Decimal::from(*value)),
            Self::Float(value) => Decimal::try_from(*value).ok(),
            Self::Text(value) => value.trim().parse::<Decimal>().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Float(value) if value.fract() == 0.0 && value.is_finite() => Some(*value as i64),
            Self::Text(value) => value.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Integer(0) => Some(false),
            Self::Integer(1) => Some(true),
            Self::Text(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Normalized job parameters for one quote request.
///
/// Built once per request and never mutated afterwards; overlaying a client
/// schema yields a new set. Required accessors report [`FieldError`], optional
/// accessors swallow malformed values and return `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
    #[serde(default, rename = "quote_schema", skip_serializing_if = "QuoteSchema::is_empty")]
    schema: QuoteSchema,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_schema(mut self, schema: QuoteSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Converts a JSON object into a field set. Nulls are dropped, nested
    /// values are kept as their JSON text, and a `quote_schema` object becomes
    /// the override schema.
    pub fn from_json(object: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut set = Self::new();
        for (name, value) in object {
            if name == "quote_schema" {
                if let serde_json::Value::Object(schema) = value {
                    set.schema = QuoteSchema::from_map(schema);
                }
                continue;
            }

            let value = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::Bool(flag) => FieldValue::Bool(flag),
                serde_json::Value::Number(number) => match number.as_i64() {
                    Some(integer) => FieldValue::Integer(integer),
                    None => match number.as_f64() {
                        Some(float) => FieldValue::Float(float),
                        None => FieldValue::Text(number.to_string()),
                    },
                },
                serde_json::Value::String(text) => FieldValue::Text(text),
                other => FieldValue::Text(other.to_string()),
            };
            set.fields.insert(name, value);
        }
        set
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn schema(&self) -> &QuoteSchema {
        &self.schema
    }

    /// Returns a copy whose schema is this set's schema with `overrides`
    /// layered on top.
    pub fn overlay_schema(&self, overrides: &QuoteSchema) -> Self {
        Self { fields: self.fields.clone(), schema: self.schema.overlay(overrides) }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn service_type(&self) -> Option<&str> {
        self.text(SERVICE_TYPE)
    }

    pub fn material(&self) -> Option<&str> {
        self.text(MATERIAL)
    }

    /// A required non-negative whole count, e.g. `quantity`.
    pub fn required_count(&self, name: &str) -> Result<u32, FieldError> {
        let value = self.get(name).ok_or_else(|| FieldError::Missing(name.to_string()))?;
        let integer =
            value.as_integer().ok_or_else(|| FieldError::invalid(name, value, "not an integer"))?;
        u32::try_from(integer)
            .map_err(|_| FieldError::invalid(name, value, "must be between 0 and 4294967295"))
    }

    /// A required non-negative decimal, e.g. `complexity`.
    pub fn required_decimal(&self, name: &str) -> Result<Decimal, FieldError> {
        let value = self.get(name).ok_or_else(|| FieldError::Missing(name.to_string()))?;
        let decimal =
            value.as_decimal().ok_or_else(|| FieldError::invalid(name, value, "not a number"))?;
        if decimal.is_sign_negative() && !decimal.is_zero() {
            return Err(FieldError::invalid(name, value, "must not be negative"));
        }
        Ok(decimal)
    }

    pub fn optional_integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_integer)
    }

    pub fn optional_decimal(&self, name: &str) -> Option<Decimal> {
        self.get(name).and_then(FieldValue::as_decimal)
    }

    pub fn optional_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{FieldError, FieldSet, FieldValue, COMPLEXITY, QUANTITY};
    use crate::domain::client::QuoteSchema;

    #[test]
    fn required_accessors_accept_numbers_and_numeric_strings() {
        let fields = FieldSet::new().with(QUANTITY, "250").with(COMPLEXITY, 1.25);

        assert_eq!(fields.required_count(QUANTITY), Ok(250));
        assert_eq!(fields.required_decimal(COMPLEXITY), Ok(Decimal::new(125, 2)));
    }

    #[test]
    fn missing_required_field_is_reported_by_name() {
        let fields = FieldSet::new().with(COMPLEXITY, 1.0);

        assert_eq!(fields.required_count(QUANTITY), Err(FieldError::Missing("quantity".to_string())));
    }

    #[test]
    fn malformed_required_field_is_invalid() {
        let fields = FieldSet::new().with(QUANTITY, "lots").with(COMPLEXITY, -2.0);

        assert!(matches!(
            fields.required_count(QUANTITY),
            Err(FieldError::Invalid { ref field, .. }) if field == "quantity"
        ));
        assert!(matches!(
            fields.required_decimal(COMPLEXITY),
            Err(FieldError::Invalid { ref reason, .. }) if reason.contains("negative")
        ));
    }

    #[test]
    fn optional_accessors_swallow_parse_failures() {
        let fields = FieldSet::new()
            .with("turnaround_days", "soon")
            .with("board_area", "wide")
            .with("certification_required", "maybe");

        assert_eq!(fields.optional_integer("turnaround_days"), None);
        assert_eq!(fields.optional_decimal("board_area"), None);
        assert_eq!(fields.optional_bool("certification_required"), None);
    }

    #[test]
    fn from_json_drops_nulls_and_extracts_schema() {
        let object = json!({
            "service_type": "speccoat",
            "quantity": 10,
            "complexity": 1.5,
            "notes": null,
            "quote_schema": { "volume_break": 50 }
        });
        let serde_json::Value::Object(object) = object else {
            panic!("fixture must be an object");
        };

        let fields = FieldSet::from_json(object);

        assert_eq!(fields.service_type(), Some("speccoat"));
        assert_eq!(fields.get("quantity"), Some(&FieldValue::Integer(10)));
        assert_eq!(fields.get("complexity"), Some(&FieldValue::Float(1.5)));
        assert!(!fields.contains("notes"));
        assert!(!fields.contains("quote_schema"));
        assert_eq!(fields.schema().unsigned("volume_break"), Some(50));
    }

    #[test]
    fn blank_text_is_treated_as_absent() {
        let fields = FieldSet::new().with("service_type", "   ");
        assert_eq!(fields.service_type(), None);
    }

    #[test]
    fn overlay_schema_leaves_original_untouched() {
        let base = FieldSet::new().with_schema(QuoteSchema::new().with("unit_rate", 4));
        let overlaid = base.overlay_schema(&QuoteSchema::new().with("unit_rate", 9));

        assert_eq!(base.schema().decimal("unit_rate"), Some(Decimal::from(4)));
        assert_eq!(overlaid.schema().decimal("unit_rate"), Some(Decimal::from(9)));
    }
}
