//! Request-level flows around the pricing core: client lookup, quote
//! persistence, lead capture and client configuration management.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use gendra_core::client_cache::{ClientConfigCache, ConfigLookupError, InvalidateScope};
use gendra_core::domain::client::{Branding, ClientConfig, ClientId, QuoteSchema};
use gendra_core::domain::fields::{
    FieldSet, COMPLEXITY, MATERIAL, QUANTITY, SERVICE_TYPE, TURNAROUND_DAYS,
};
use gendra_core::domain::lead::{Lead, LeadId};
use gendra_core::domain::quote::{CustomerDetails, QuoteId, QuoteRecord};
use gendra_core::errors::{ApplicationError, InterfaceError};
use gendra_core::ingest;
use gendra_core::orchestrator::QuoteOrchestrator;
use gendra_db::repositories::{ClientConfigRepository, LeadRepository, QuoteLogRepository};

pub type ClientStore = Arc<dyn ClientConfigRepository>;

pub const DEFAULT_QUOTE_HISTORY_LIMIT: u32 = 20;
pub const MAX_QUOTE_HISTORY_LIMIT: u32 = 100;

#[derive(Clone, Debug, Deserialize)]
pub struct QuoteRequest {
    pub service_type: Option<String>,
    pub material: Option<String>,
    pub quantity: i64,
    pub complexity: f64,
    pub turnaround_days: Option<i64>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub company_name: Option<String>,
    pub notes: Option<String>,
    pub quote_schema: Option<QuoteSchema>,
    /// Strategy-specific inputs such as `masking_level` or `board_area`.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl QuoteRequest {
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let service_type = self.service_type.as_deref().map(str::trim).unwrap_or_default();
        if service_type.is_empty() {
            return Err(ApplicationError::Validation("service_type is required".to_string()));
        }
        if self.quantity <= 0 {
            return Err(ApplicationError::Validation(
                "quantity must be greater than zero".to_string(),
            ));
        }
        if !self.complexity.is_finite() || self.complexity < 0.0 {
            return Err(ApplicationError::Validation(
                "complexity must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_field_set(&self) -> FieldSet {
        let mut fields = FieldSet::from_json(self.extra.clone())
            .with(QUANTITY, self.quantity)
            .with(COMPLEXITY, self.complexity);
        if let Some(service_type) = &self.service_type {
            fields = fields.with(SERVICE_TYPE, service_type.trim());
        }
        if let Some(material) = &self.material {
            fields = fields.with(MATERIAL, material.as_str());
        }
        if let Some(days) = self.turnaround_days {
            fields = fields.with(TURNAROUND_DAYS, days);
        }
        match &self.quote_schema {
            Some(schema) => fields.with_schema(schema.clone()),
            None => fields,
        }
    }

    fn customer(&self) -> CustomerDetails {
        CustomerDetails {
            email: self.customer_email.clone(),
            name: self.customer_name.clone(),
            company_name: self.company_name.clone(),
            notes: self.notes.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteResponse {
    pub quote_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quote: Decimal,
    pub service_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branding: Option<Branding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_fields: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LeadRequest {
    #[serde(default)]
    pub email: String,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub interest_type: String,
    pub message: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeadResponse {
    pub lead_id: String,
    pub status: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClientConfigPayload {
    #[serde(default)]
    pub quote_schema: QuoteSchema,
    #[serde(default)]
    pub branding: Branding,
    #[serde(default)]
    pub visible_fields: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedUpload {
    pub fields: FieldSet,
}

pub struct QuoteService {
    orchestrator: Arc<QuoteOrchestrator>,
    clients: ClientConfigCache<ClientStore>,
    quote_log: Arc<dyn QuoteLogRepository>,
    leads: Arc<dyn LeadRepository>,
}

impl QuoteService {
    pub fn new(
        orchestrator: Arc<QuoteOrchestrator>,
        client_store: ClientStore,
        cache_capacity: u64,
        quote_log: Arc<dyn QuoteLogRepository>,
        leads: Arc<dyn LeadRepository>,
    ) -> Self {
        Self {
            orchestrator,
            clients: ClientConfigCache::new(client_store, cache_capacity),
            quote_log,
            leads,
        }
    }

    pub fn orchestrator(&self) -> &QuoteOrchestrator {
        &self.orchestrator
    }

    pub fn clients(&self) -> &ClientConfigCache<ClientStore> {
        &self.clients
    }

    /// Missing configurations price with defaults; a store failure aborts.
    async fn lookup_client(
        &self,
        client_id: Option<&ClientId>,
    ) -> Result<Option<Arc<ClientConfig>>, ApplicationError> {
        let Some(client_id) = client_id else {
            return Ok(None);
        };
        match self.clients.get(client_id).await {
            Ok(config) => Ok(Some(config)),
            Err(ConfigLookupError::NotFound(_)) => Ok(None),
            Err(fetch) => Err(ApplicationError::from(fetch)),
        }
    }

    pub async fn quote(
        &self,
        request: QuoteRequest,
        client_id: Option<ClientId>,
    ) -> Result<QuoteResponse, InterfaceError> {
        let quote_id = QuoteId::random();
        let correlation_id = quote_id.to_string();

        request.validate().map_err(|error| error.into_interface(&correlation_id))?;

        let client = self.lookup_client(client_id.as_ref()).await.map_err(|error| {
            error!(
                event_name = "quote.client_lookup.failed",
                correlation_id = %correlation_id,
                quote_id = %quote_id,
                client_id = client_id.as_ref().map(ClientId::as_str).unwrap_or("none"),
                error = %error,
                "client configuration lookup failed"
            );
            error.into_interface(&correlation_id)
        })?;

        let fields = request.to_field_set();
        let computation = self.orchestrator.get_quote(&fields, client.as_deref()).map_err(|error| {
            error!(
                event_name = "quote.computation.failed",
                correlation_id = %correlation_id,
                quote_id = %quote_id,
                error = %error,
                "quote computation failed"
            );
            ApplicationError::from(error).into_interface(&correlation_id)
        })?;

        let record = QuoteRecord {
            quote_id,
            client_id: client_id.clone(),
            amount: computation.amount,
            service_type: computation.service_type.clone(),
            material: request.material.clone(),
            quantity: u32::try_from(request.quantity).unwrap_or(u32::MAX),
            complexity: Decimal::try_from(request.complexity).unwrap_or_default(),
            turnaround_days: request.turnaround_days,
            customer: request.customer(),
            metadata: serde_json::Value::Object(request.extra.clone()),
            created_at: Utc::now(),
        };
        let client_label = record.client_label().to_string();
        if let Err(error) = self.quote_log.append(record).await {
            error!(
                event_name = "quote.persistence.failed",
                correlation_id = %correlation_id,
                quote_id = %quote_id,
                client_id = %client_label,
                error = %error,
                "quote computed but could not be logged"
            );
        }

        info!(
            event_name = "quote.computed",
            correlation_id = %correlation_id,
            quote_id = %quote_id,
            client_id = %client_label,
            service_type = %computation.service_type,
            strategy = %computation.strategy,
            amount = %computation.amount,
            "quote served"
        );

        Ok(QuoteResponse {
            quote_id: correlation_id,
            quote: computation.amount,
            service_type: computation.service_type,
            branding: client.as_ref().map(|config| config.branding.clone()),
            visible_fields: client.as_ref().map(|config| config.visible_fields.clone()),
        })
    }

    pub async fn capture_lead(&self, request: LeadRequest) -> Result<LeadResponse, InterfaceError> {
        let mut lead = Lead::new(request.email.trim(), request.interest_type.trim());
        lead.name = request.name;
        lead.company_name = request.company_name;
        lead.phone = request.phone;
        lead.message = request.message;
        lead.source = request.source;
        if let Some(metadata) = request.metadata {
            lead.metadata = metadata;
        }
        let LeadId(lead_uuid) = lead.id;
        let correlation_id = lead_uuid.to_string();

        lead.validate()
            .map_err(|error| ApplicationError::from(error).into_interface(&correlation_id))?;

        let status = lead.status.clone();
        self.leads.append(lead).await.map_err(|error| {
            error!(
                event_name = "lead.persistence.failed",
                correlation_id = %correlation_id,
                error = %error,
                "lead could not be stored"
            );
            ApplicationError::Persistence(error.to_string()).into_interface(&correlation_id)
        })?;

        info!(event_name = "lead.captured", correlation_id = %correlation_id, "lead captured");
        Ok(LeadResponse { lead_id: correlation_id, status })
    }

    pub async fn client_config(
        &self,
        client_id: &ClientId,
    ) -> Result<Arc<ClientConfig>, InterfaceError> {
        self.clients
            .get(client_id)
            .await
            .map_err(|error| ApplicationError::from(error).into_interface(client_id.as_str()))
    }

    /// Writes through to the store and drops the cached copy for that key.
    pub async fn upsert_client_config(
        &self,
        client_id: ClientId,
        payload: ClientConfigPayload,
    ) -> Result<ClientConfig, InterfaceError> {
        if client_id.as_str().trim().is_empty() {
            return Err(ApplicationError::Validation("client_id must not be blank".to_string())
                .into_interface("unassigned"));
        }

        let config = ClientConfig {
            client_id: client_id.clone(),
            quote_schema: payload.quote_schema,
            branding: payload.branding,
            visible_fields: payload.visible_fields,
            updated_at: Utc::now(),
        };
        self.clients.source().upsert(config.clone()).await.map_err(|error| {
            ApplicationError::Persistence(error.to_string()).into_interface(client_id.as_str())
        })?;
        self.clients.invalidate(InvalidateScope::Key(&client_id)).await;

        info!(
            event_name = "client_config.upserted",
            correlation_id = %client_id,
            client_id = %client_id,
            "client configuration stored"
        );
        Ok(config)
    }

    /// Newest-first quote history for one client. `limit` is clamped to
    /// `1..=MAX_QUOTE_HISTORY_LIMIT`.
    pub async fn recent_quotes(
        &self,
        client_id: &ClientId,
        limit: Option<u32>,
    ) -> Result<Vec<QuoteRecord>, InterfaceError> {
        let limit = limit.unwrap_or(DEFAULT_QUOTE_HISTORY_LIMIT).clamp(1, MAX_QUOTE_HISTORY_LIMIT);
        let records = self.quote_log.list_for_client(client_id, limit).await.map_err(|error| {
            error!(
                event_name = "quote.history.failed",
                correlation_id = %client_id,
                client_id = %client_id,
                error = %error,
                "quote history could not be read"
            );
            ApplicationError::Persistence(error.to_string()).into_interface(client_id.as_str())
        })?;

        info!(
            event_name = "quote.history.listed",
            correlation_id = %client_id,
            client_id = %client_id,
            count = records.len(),
            "quote history served"
        );
        Ok(records)
    }

    pub async fn invalidate(&self, scope: InvalidateScope<'_>) {
        self.clients.invalidate(scope).await;
    }

    pub fn parse_upload(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<ParsedUpload, InterfaceError> {
        let correlation_id = QuoteId::random().to_string();
        let content_type = content_type.unwrap_or_default();
        let fields = ingest::parse_upload(content_type, body).map_err(|error| {
            warn!(
                event_name = "ingest.upload.rejected",
                correlation_id = %correlation_id,
                content_type = %content_type,
                error = %error,
                "upload could not be parsed"
            );
            ApplicationError::from(error).into_interface(&correlation_id)
        })?;
        Ok(ParsedUpload { fields })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::json;

    use gendra_core::client_cache::{ClientConfigSource, InvalidateScope, SourceError};
    use gendra_core::domain::client::{ClientConfig, ClientId, QuoteSchema};
    use gendra_core::domain::quote::QuoteRecord;
    use gendra_core::errors::InterfaceError;
    use gendra_core::orchestrator::QuoteOrchestrator;
    use gendra_db::repositories::{
        ClientConfigRepository, InMemoryClientConfigRepository, InMemoryLeadRepository,
        InMemoryQuoteLog, QuoteLogRepository, RepositoryError,
    };

    use super::{ClientConfigPayload, LeadRequest, QuoteRequest, QuoteService};

    struct FailingQuoteLog;

    #[async_trait]
    impl QuoteLogRepository for FailingQuoteLog {
        async fn append(&self, _record: QuoteRecord) -> Result<(), RepositoryError> {
            Err(RepositoryError::Decode("quotes table is read-only".to_string()))
        }

        async fn list_for_client(
            &self,
            _client_id: &ClientId,
            _limit: u32,
        ) -> Result<Vec<QuoteRecord>, RepositoryError> {
            Err(RepositoryError::Decode("quotes table is unreadable".to_string()))
        }
    }

    #[derive(Default)]
    struct UnreachableStore {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ClientConfigSource for UnreachableStore {
        async fn fetch(&self, _client_id: &ClientId) -> Result<Option<ClientConfig>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Err(SourceError("connection refused".to_string()))
        }
    }

    #[async_trait]
    impl ClientConfigRepository for UnreachableStore {
        async fn upsert(&self, _config: ClientConfig) -> Result<(), RepositoryError> {
            Err(RepositoryError::Decode("store offline".to_string()))
        }

        async fn list_client_ids(&self) -> Result<Vec<ClientId>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        service: QuoteService,
        quote_log: Arc<InMemoryQuoteLog>,
        leads: Arc<InMemoryLeadRepository>,
    }

    fn harness(configs: Vec<ClientConfig>) -> Harness {
        let quote_log = Arc::new(InMemoryQuoteLog::default());
        let leads = Arc::new(InMemoryLeadRepository::default());
        let service = QuoteService::new(
            Arc::new(QuoteOrchestrator::default()),
            Arc::new(InMemoryClientConfigRepository::with_configs(configs)),
            100,
            quote_log.clone(),
            leads.clone(),
        );
        Harness { service, quote_log, leads }
    }

    fn request(body: serde_json::Value) -> QuoteRequest {
        serde_json::from_value(body).expect("valid quote request")
    }

    fn speccoat_request() -> QuoteRequest {
        request(json!({
            "service_type": "speccoat",
            "quantity": 100,
            "complexity": 1.0,
            "turnaround_days": 3,
            "masking_level": "heavy"
        }))
    }

    fn branded_client() -> ClientConfig {
        let mut config = ClientConfig::new("acme");
        config.branding.theme = Some("dark".to_string());
        config.visible_fields = vec!["quantity".to_string()];
        config
    }

    #[tokio::test]
    async fn quote_without_client_uses_defaults_and_logs_record() {
        let harness = harness(Vec::new());

        let response = harness.service.quote(speccoat_request(), None).await.expect("quote");

        assert_eq!(response.quote, Decimal::new(105_300, 2));
        assert_eq!(response.service_type, "speccoat");
        assert!(response.branding.is_none());
        assert!(response.visible_fields.is_none());

        let records = harness.quote_log.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quote_id.to_string(), response.quote_id);
        assert_eq!(records[0].client_label(), "unknown");
        assert_eq!(records[0].metadata, json!({ "masking_level": "heavy" }));
    }

    #[tokio::test]
    async fn known_client_gets_branding_and_visible_fields() {
        let harness = harness(vec![branded_client()]);

        let response = harness
            .service
            .quote(speccoat_request(), Some(ClientId("acme".to_string())))
            .await
            .expect("quote");

        assert_eq!(response.branding.and_then(|branding| branding.theme), Some("dark".to_string()));
        assert_eq!(response.visible_fields, Some(vec!["quantity".to_string()]));
        assert_eq!(harness.quote_log.records().await[0].client_label(), "acme");
    }

    #[tokio::test]
    async fn unknown_client_prices_with_defaults_and_no_branding() {
        let harness = harness(Vec::new());

        let response = harness
            .service
            .quote(speccoat_request(), Some(ClientId("ghost".to_string())))
            .await
            .expect("quote");

        assert_eq!(response.quote, Decimal::new(105_300, 2));
        assert!(response.branding.is_none());
    }

    #[tokio::test]
    async fn store_failure_aborts_with_service_unavailable() {
        let store = Arc::new(UnreachableStore::default());
        let quote_log = Arc::new(InMemoryQuoteLog::default());
        let service = QuoteService::new(
            Arc::new(QuoteOrchestrator::default()),
            store.clone(),
            100,
            quote_log.clone(),
            Arc::new(InMemoryLeadRepository::default()),
        );

        let error = service
            .quote(speccoat_request(), Some(ClientId("acme".to_string())))
            .await
            .expect_err("lookup should fail");

        assert!(matches!(error, InterfaceError::ServiceUnavailable { .. }));
        assert!(quote_log.records().await.is_empty());
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_the_quote() {
        let service = QuoteService::new(
            Arc::new(QuoteOrchestrator::default()),
            Arc::new(InMemoryClientConfigRepository::default()),
            100,
            Arc::new(FailingQuoteLog),
            Arc::new(InMemoryLeadRepository::default()),
        );

        let response = service.quote(speccoat_request(), None).await.expect("quote");

        assert_eq!(response.quote, Decimal::new(105_300, 2));
    }

    #[tokio::test]
    async fn recent_quotes_are_scoped_to_the_client_and_clamped() {
        let harness = harness(vec![branded_client()]);
        let acme = ClientId("acme".to_string());
        for _ in 0..3 {
            harness.service.quote(speccoat_request(), Some(acme.clone())).await.expect("quote");
        }
        harness.service.quote(speccoat_request(), None).await.expect("anonymous quote");

        let all = harness.service.recent_quotes(&acme, None).await.expect("history");
        let one = harness.service.recent_quotes(&acme, Some(1)).await.expect("history");
        let zero = harness.service.recent_quotes(&acme, Some(0)).await.expect("history");

        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|record| record.client_label() == "acme"));
        assert_eq!(one.len(), 1);
        assert_eq!(zero.len(), 1, "a zero limit is raised to one");
    }

    #[tokio::test]
    async fn unreadable_quote_history_is_service_unavailable() {
        let service = QuoteService::new(
            Arc::new(QuoteOrchestrator::default()),
            Arc::new(InMemoryClientConfigRepository::default()),
            100,
            Arc::new(FailingQuoteLog),
            Arc::new(InMemoryLeadRepository::default()),
        );

        let error = service
            .recent_quotes(&ClientId("acme".to_string()), Some(5))
            .await
            .expect_err("history should fail");

        assert!(matches!(error, InterfaceError::ServiceUnavailable { .. }));
    }

    #[tokio::test]
    async fn missing_or_blank_service_type_is_bad_request() {
        let harness = harness(Vec::new());

        for body in [
            json!({ "quantity": 10, "complexity": 1.0 }),
            json!({ "service_type": "   ", "quantity": 10, "complexity": 1.0 }),
        ] {
            let error = harness.service.quote(request(body), None).await.expect_err("invalid");
            assert!(matches!(error, InterfaceError::BadRequest { .. }));
        }
        assert!(harness.quote_log.records().await.is_empty());
    }

    #[tokio::test]
    async fn non_positive_quantity_is_bad_request() {
        let harness = harness(Vec::new());
        let body = json!({ "service_type": "metal_fab", "quantity": 0, "complexity": 1.0 });

        let error = harness.service.quote(request(body), None).await.expect_err("invalid");

        assert!(matches!(error, InterfaceError::BadRequest { ref message, .. } if message.contains("quantity")));
    }

    #[tokio::test]
    async fn out_of_range_quantity_is_internal_with_field_message() {
        let harness = harness(Vec::new());
        let mut request = speccoat_request();
        request.quantity = i64::from(u32::MAX) + 1;

        let error = harness.service.quote(request, None).await.expect_err("out of range");

        assert!(matches!(error, InterfaceError::Internal { ref message, .. } if message.contains("quantity")));
        assert!(harness.quote_log.records().await.is_empty());
    }

    #[tokio::test]
    async fn upsert_invalidates_cached_copy() {
        let harness = harness(vec![ClientConfig::new("acme")]);
        let acme = ClientId("acme".to_string());
        let before = harness.service.client_config(&acme).await.expect("lookup");
        assert!(before.quote_schema.is_empty());

        harness
            .service
            .upsert_client_config(
                acme.clone(),
                ClientConfigPayload {
                    quote_schema: QuoteSchema::new().with("service_type", "speccoat"),
                    ..ClientConfigPayload::default()
                },
            )
            .await
            .expect("upsert");

        let after = harness.service.client_config(&acme).await.expect("lookup");
        assert_eq!(after.quote_schema.text("service_type"), Some("speccoat"));
    }

    #[tokio::test]
    async fn unknown_client_config_is_not_found() {
        let harness = harness(Vec::new());

        let error = harness
            .service
            .client_config(&ClientId("ghost".to_string()))
            .await
            .expect_err("missing");

        assert!(matches!(error, InterfaceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn invalidate_all_forces_refetch() {
        let harness = harness(vec![ClientConfig::new("acme")]);
        let acme = ClientId("acme".to_string());
        harness.service.client_config(&acme).await.expect("populate");

        harness.service.invalidate(InvalidateScope::All).await;

        assert!(!harness.service.clients().contains(&acme).await);
    }

    #[tokio::test]
    async fn lead_capture_validates_and_stores() {
        let harness = harness(Vec::new());

        let missing_email: LeadRequest =
            serde_json::from_value(json!({ "interest_type": "speccoat" })).expect("request");
        let error = harness.service.capture_lead(missing_email).await.expect_err("invalid");
        assert!(matches!(error, InterfaceError::BadRequest { .. }));

        let valid: LeadRequest = serde_json::from_value(json!({
            "email": "buyer@example.test",
            "interest_type": "speccoat",
            "company_name": "Initech"
        }))
        .expect("request");
        let response = harness.service.capture_lead(valid).await.expect("captured");

        assert_eq!(response.status, "new");
        let leads = harness.leads.leads().await;
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].company_name.as_deref(), Some("Initech"));
    }

    #[tokio::test]
    async fn upload_errors_map_to_distinct_interface_errors() {
        let harness = harness(Vec::new());

        let unsupported =
            harness.service.parse_upload(Some("image/png"), b"\x89PNG").expect_err("rejected");
        let unreadable =
            harness.service.parse_upload(Some("text/csv"), b"quantity\n").expect_err("rejected");
        let parsed = harness
            .service
            .parse_upload(Some("text/plain"), b"quantity: 12\nmaterial: steel\n")
            .expect("parsed");

        assert!(matches!(unsupported, InterfaceError::BadRequest { .. }));
        assert!(matches!(unreadable, InterfaceError::Unprocessable { .. }));
        assert_eq!(parsed.fields.required_count("quantity"), Ok(12));
    }
}
