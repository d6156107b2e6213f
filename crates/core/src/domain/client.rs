use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Keys a client schema may carry that the pricing strategies understand.
pub mod schema_keys {
    pub const SERVICE_TYPE: &str = "service_type";
    pub const UNIT_RATE: &str = "unit_rate";
    pub const VOLUME_BREAK: &str = "volume_break";
    pub const VOLUME_DISCOUNT: &str = "volume_discount";
    pub const COMPLEXITY_MULTIPLIER: &str = "complexity_multiplier";
    pub const CERTIFICATION_REQUIRED: &str = "certification_required";
    pub const CERTIFICATION_FEE: &str = "certification_fee";
    pub const BASELINE_BOARD_AREA: &str = "baseline_board_area";
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pricing override parameters attached to a client or a single request.
///
/// Stored as an open JSON object so unknown keys survive a round trip through
/// the store. Typed reads never fail: a value of the wrong shape reads as
/// absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteSchema(BTreeMap<String, serde_json::Value>);

impl QuoteSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map.into_iter().filter(|(_, value)| !value.is_null()).collect())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `overrides` wins on every key it defines.
    pub fn overlay(&self, overrides: &QuoteSchema) -> QuoteSchema {
        let mut merged = self.0.clone();
        merged.extend(overrides.0.iter().map(|(key, value)| (key.clone(), value.clone())));
        Self(merged)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn decimal(&self, key: &str) -> Option<Decimal> {
        match self.get(key)? {
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(integer) => Some(Decimal::from(integer)),
                None => number.as_f64().and_then(|float| Decimal::try_from(float).ok()),
            },
            serde_json::Value::String(text) => text.trim().parse::<Decimal>().ok(),
            _ => None,
        }
    }

    pub fn unsigned(&self, key: &str) -> Option<u32> {
        match self.get(key)? {
            serde_json::Value::Number(number) => {
                number.as_u64().and_then(|value| u32::try_from(value).ok())
            }
            serde_json::Value::String(text) => text.trim().parse::<u32>().ok(),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            serde_json::Value::Bool(flag) => Some(*flag),
            serde_json::Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

/// Per-tenant overrides: pricing schema, branding, and which form fields the
/// tenant's quote page shows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: ClientId,
    #[serde(default)]
    pub quote_schema: QuoteSchema,
    #[serde(default)]
    pub branding: Branding,
    #[serde(default)]
    pub visible_fields: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ClientConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: ClientId(client_id.into()),
            quote_schema: QuoteSchema::default(),
            branding: Branding::default(),
            visible_fields: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{schema_keys, ClientConfig, QuoteSchema};

    #[test]
    fn typed_reads_accept_numbers_and_strings() {
        let schema = QuoteSchema::new()
            .with(schema_keys::UNIT_RATE, "7.5")
            .with(schema_keys::VOLUME_BREAK, 250)
            .with(schema_keys::CERTIFICATION_REQUIRED, true);

        assert_eq!(schema.decimal(schema_keys::UNIT_RATE), Some(Decimal::new(75, 1)));
        assert_eq!(schema.unsigned(schema_keys::VOLUME_BREAK), Some(250));
        assert_eq!(schema.flag(schema_keys::CERTIFICATION_REQUIRED), Some(true));
    }

    #[test]
    fn wrong_shapes_read_as_absent() {
        let schema = QuoteSchema::new()
            .with(schema_keys::UNIT_RATE, json!(["not", "a", "rate"]))
            .with(schema_keys::VOLUME_BREAK, -4)
            .with(schema_keys::CERTIFICATION_REQUIRED, "sometimes");

        assert_eq!(schema.decimal(schema_keys::UNIT_RATE), None);
        assert_eq!(schema.unsigned(schema_keys::VOLUME_BREAK), None);
        assert_eq!(schema.flag(schema_keys::CERTIFICATION_REQUIRED), None);
    }

    #[test]
    fn overlay_prefers_override_values_and_keeps_the_rest() {
        let base = QuoteSchema::new().with("unit_rate", 5).with("custom", "kept");
        let merged = base.overlay(&QuoteSchema::new().with("unit_rate", 8));

        assert_eq!(merged.decimal("unit_rate"), Some(Decimal::from(8)));
        assert_eq!(merged.text("custom"), Some("kept"));
    }

    #[test]
    fn client_config_deserializes_with_missing_optional_sections() {
        let config: ClientConfig = serde_json::from_value(json!({
            "client_id": "acme",
            "updated_at": "2026-01-05T10:00:00Z"
        }))
        .expect("config should deserialize");

        assert_eq!(config.client_id.as_str(), "acme");
        assert!(config.quote_schema.is_empty());
        assert!(config.visible_fields.is_empty());
        assert_eq!(config.branding.theme, None);
    }
}
