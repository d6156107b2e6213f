use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use super::{
    default_floor_price, BaseStrategy, CoatingService, CoatingStrategy, SchemaStrategy,
    SurfaceTreatmentStrategy,
};

pub const DEFAULT_SERVICE_TYPE: &str = "metal_fab";
pub const SURFACE_TREATMENT_SERVICE_TYPE: &str = "speccoat";

/// Immutable service-type → strategy table with a fallback for misses.
///
/// Lookups are exact and case-sensitive. The table is fixed once built; new
/// strategies are added by extending [`SchemaRegistry::standard`] or passing
/// extra entries to [`SchemaRegistry::from_entries`].
pub struct SchemaRegistry {
    strategies: HashMap<String, Arc<dyn SchemaStrategy>>,
    fallback: Arc<dyn SchemaStrategy>,
}

impl SchemaRegistry {
    pub fn standard(floor: Decimal) -> Self {
        let base: Arc<dyn SchemaStrategy> = Arc::new(BaseStrategy::new(floor));
        let mut entries: Vec<(String, Arc<dyn SchemaStrategy>)> = vec![
            (DEFAULT_SERVICE_TYPE.to_string(), base.clone()),
            (
                SURFACE_TREATMENT_SERVICE_TYPE.to_string(),
                Arc::new(SurfaceTreatmentStrategy::new(floor)),
            ),
        ];
        entries.extend(CoatingService::ALL.into_iter().map(|service| {
            let strategy: Arc<dyn SchemaStrategy> = Arc::new(CoatingStrategy::new(service, floor));
            (service.key().to_string(), strategy)
        }));

        Self::from_entries(base, entries)
    }

    pub fn from_entries(
        fallback: Arc<dyn SchemaStrategy>,
        entries: impl IntoIterator<Item = (String, Arc<dyn SchemaStrategy>)>,
    ) -> Self {
        Self { strategies: entries.into_iter().collect(), fallback }
    }

    /// Total: every key yields a strategy.
    pub fn resolve(&self, service_type: &str) -> Arc<dyn SchemaStrategy> {
        match self.strategies.get(service_type) {
            Some(strategy) => strategy.clone(),
            None => {
                tracing::debug!(
                    event_name = "pricing.registry.fallback",
                    service_type = %service_type,
                    fallback = self.fallback.name(),
                    "unknown service type, using fallback strategy"
                );
                self.fallback.clone()
            }
        }
    }

    pub fn contains(&self, service_type: &str) -> bool {
        self.strategies.contains_key(service_type)
    }

    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn fallback(&self) -> &Arc<dyn SchemaStrategy> {
        &self.fallback
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::standard(default_floor_price())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use super::SchemaRegistry;
    use crate::domain::fields::FieldSet;
    use crate::pricing::{PricingError, SchemaStrategy};

    #[test]
    fn known_keys_resolve_to_their_strategies() {
        let registry = SchemaRegistry::default();

        assert_eq!(registry.resolve("metal_fab").name(), "base");
        assert_eq!(registry.resolve("speccoat").name(), "surface_treatment");
        assert_eq!(registry.resolve("parylene").name(), "parylene");
    }

    #[test]
    fn resolve_is_total_and_case_sensitive() {
        let registry = SchemaRegistry::default();

        for key in ["", "unknown_key", "SPECCOAT", " speccoat", "metal-fab"] {
            assert_eq!(registry.resolve(key).name(), "base", "key `{key}` should fall back");
        }
    }

    #[test]
    fn unknown_key_prices_with_base_formula() {
        let registry = SchemaRegistry::default();
        let fields = FieldSet::new().with("service_type", "unknown_key").with("quantity", 1).with("complexity", 1.0);

        assert_eq!(registry.resolve("unknown_key").calculate(&fields), Ok(Decimal::new(50, 0)));
    }

    #[test]
    fn keys_are_sorted_and_complete() {
        let registry = SchemaRegistry::default();
        assert_eq!(
            registry.keys(),
            vec!["conformal_coating", "encapsulation", "metal_fab", "nano_coating", "parylene", "speccoat"]
        );
        assert!(registry.contains("speccoat"));
        assert!(!registry.contains("Speccoat"));
    }

    #[test]
    fn custom_entries_extend_the_table_at_construction() {
        struct Flat;

        impl SchemaStrategy for Flat {
            fn name(&self) -> &'static str {
                "flat"
            }

            fn calculate(&self, _fields: &FieldSet) -> Result<Decimal, PricingError> {
                Ok(Decimal::new(99, 0))
            }
        }

        let fallback: Arc<dyn SchemaStrategy> = Arc::new(Flat);
        let registry = SchemaRegistry::from_entries(fallback.clone(), vec![("flat".to_string(), fallback)]);

        assert_eq!(registry.resolve("flat").name(), "flat");
        assert_eq!(registry.resolve("anything").name(), "flat");
    }
}
