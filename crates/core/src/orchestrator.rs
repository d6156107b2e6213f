use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PricingConfig;
use crate::domain::client::{schema_keys, ClientConfig};
use crate::domain::fields::FieldSet;
use crate::pricing::{
    clamp_to_floor, MarketNoise, NoMarketNoise, PricingError, SchemaRegistry, SeededMarketNoise,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteComputation {
    /// Service type after normalization; may be a key the registry does not know.
    pub service_type: String,
    pub strategy: String,
    pub amount: Decimal,
}

/// Picks a pricing strategy for a field set and evaluates it.
pub struct QuoteOrchestrator {
    registry: Arc<SchemaRegistry>,
    noise: Arc<dyn MarketNoise>,
    fallback_service_type: String,
    floor: Decimal,
}

impl QuoteOrchestrator {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        noise: Arc<dyn MarketNoise>,
        fallback_service_type: impl Into<String>,
        floor: Decimal,
    ) -> Self {
        Self { registry, noise, fallback_service_type: fallback_service_type.into(), floor }
    }

    pub fn from_config(config: &PricingConfig) -> Self {
        let noise: Arc<dyn MarketNoise> = if config.market_noise_pct > 0.0 {
            Arc::new(SeededMarketNoise::new(config.market_noise_pct, config.market_noise_seed))
        } else {
            Arc::new(NoMarketNoise)
        };

        Self::new(
            Arc::new(SchemaRegistry::standard(config.floor_price)),
            noise,
            config.fallback_service_type.clone(),
            config.floor_price,
        )
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The service type a field set will be priced under: the request's own
    /// value, then the schema's, then the configured fallback.
    pub fn normalize_service_type(&self, fields: &FieldSet) -> String {
        fields
            .service_type()
            .or_else(|| fields.schema().text(schema_keys::SERVICE_TYPE))
            .unwrap_or(self.fallback_service_type.as_str())
            .to_string()
    }

    pub fn get_quote(
        &self,
        fields: &FieldSet,
        client: Option<&ClientConfig>,
    ) -> Result<QuoteComputation, PricingError> {
        let effective = match client {
            Some(client) if !client.quote_schema.is_empty() => {
                fields.overlay_schema(&client.quote_schema)
            }
            _ => fields.clone(),
        };

        let service_type = self.normalize_service_type(&effective);
        let strategy = self.registry.resolve(&service_type);
        let raw = strategy.calculate(&effective)?;

        let noisy = raw
            .checked_mul(self.noise.factor())
            .ok_or(PricingError::Overflow("market_noise"))?;
        let amount = clamp_to_floor(noisy, self.floor).round_dp(2);

        debug!(
            event_name = "pricing.quote.computed",
            service_type = %service_type,
            strategy = strategy.name(),
            client_id = client.map(|client| client.client_id.as_str()).unwrap_or("none"),
            amount = %amount,
            "quote computed"
        );

        Ok(QuoteComputation { service_type, strategy: strategy.name().to_string(), amount })
    }
}

impl Default for QuoteOrchestrator {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}
