use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use gendra_core::client_cache::{ClientConfigSource, SourceError};
use gendra_core::domain::client::{ClientConfig, ClientId};
use gendra_core::domain::lead::Lead;
use gendra_core::domain::quote::QuoteRecord;

use super::{ClientConfigRepository, LeadRepository, QuoteLogRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryClientConfigRepository {
    configs: RwLock<HashMap<String, ClientConfig>>,
}

impl InMemoryClientConfigRepository {
    pub fn with_configs(configs: impl IntoIterator<Item = ClientConfig>) -> Self {
        Self {
            configs: RwLock::new(
                configs.into_iter().map(|config| (config.client_id.0.clone(), config)).collect(),
            ),
        }
    }
}

#[async_trait]
impl ClientConfigSource for InMemoryClientConfigRepository {
    async fn fetch(&self, client_id: &ClientId) -> Result<Option<ClientConfig>, SourceError> {
        let configs = self.configs.read().await;
        Ok(configs.get(client_id.as_str()).cloned())
    }
}

#[async_trait]
impl ClientConfigRepository for InMemoryClientConfigRepository {
    async fn upsert(&self, config: ClientConfig) -> Result<(), RepositoryError> {
        let mut configs = self.configs.write().await;
        configs.insert(config.client_id.0.clone(), config);
        Ok(())
    }

    async fn list_client_ids(&self) -> Result<Vec<ClientId>, RepositoryError> {
        let configs = self.configs.read().await;
        let mut ids: Vec<ClientId> = configs.keys().cloned().map(ClientId).collect();
        ids.sort();
        Ok(ids)
    }
}

#[derive(Default)]
pub struct InMemoryQuoteLog {
    records: RwLock<Vec<QuoteRecord>>,
}

impl InMemoryQuoteLog {
    pub async fn records(&self) -> Vec<QuoteRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl QuoteLogRepository for InMemoryQuoteLog {
    async fn append(&self, record: QuoteRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn list_for_client(
        &self,
        client_id: &ClientId,
        limit: u32,
    ) -> Result<Vec<QuoteRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut matching: Vec<QuoteRecord> = records
            .iter()
            .filter(|record| record.client_label() == client_id.as_str())
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<Vec<Lead>>,
}

impl InMemoryLeadRepository {
    pub async fn leads(&self) -> Vec<Lead> {
        self.leads.read().await.clone()
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn append(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut leads = self.leads.write().await;
        leads.push(lead);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use gendra_core::client_cache::ClientConfigSource;
    use gendra_core::domain::client::{ClientConfig, ClientId};
    use gendra_core::domain::lead::Lead;
    use gendra_core::domain::quote::{CustomerDetails, QuoteId, QuoteRecord};

    use super::{InMemoryClientConfigRepository, InMemoryLeadRepository, InMemoryQuoteLog};
    use crate::repositories::{ClientConfigRepository, LeadRepository, QuoteLogRepository};

    fn record(client_id: Option<&str>, minutes_ago: i64) -> QuoteRecord {
        QuoteRecord {
            quote_id: QuoteId::random(),
            client_id: client_id.map(|id| ClientId(id.to_string())),
            amount: Decimal::new(150, 0),
            service_type: "metal_fab".to_string(),
            material: None,
            quantity: 30,
            complexity: Decimal::ONE,
            turnaround_days: None,
            customer: CustomerDetails::default(),
            metadata: serde_json::Value::Null,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn client_config_upsert_and_fetch() {
        let repo = InMemoryClientConfigRepository::default();
        let client_id = ClientId("acme".to_string());

        assert!(repo.fetch(&client_id).await.expect("fetch").is_none());
        repo.upsert(ClientConfig::new("acme")).await.expect("upsert");

        let found = repo.fetch(&client_id).await.expect("fetch");
        assert_eq!(found.map(|config| config.client_id), Some(client_id));
    }

    #[tokio::test]
    async fn seeded_configs_list_sorted() {
        let repo = InMemoryClientConfigRepository::with_configs([
            ClientConfig::new("zeta"),
            ClientConfig::new("acme"),
        ]);

        let ids = repo.list_client_ids().await.expect("list");
        assert_eq!(ids, vec![ClientId("acme".to_string()), ClientId("zeta".to_string())]);
    }

    #[tokio::test]
    async fn quote_log_filters_by_client_label() {
        let log = InMemoryQuoteLog::default();
        log.append(record(Some("acme"), 5)).await.expect("append");
        log.append(record(Some("acme"), 1)).await.expect("append");
        log.append(record(None, 0)).await.expect("append");

        let acme = log.list_for_client(&ClientId("acme".to_string()), 1).await.expect("list");
        let unknown =
            log.list_for_client(&ClientId("unknown".to_string()), 10).await.expect("list");

        assert_eq!(acme.len(), 1);
        assert_eq!(unknown.len(), 1);
        assert_eq!(log.records().await.len(), 3);
    }

    #[tokio::test]
    async fn leads_are_appended_in_order() {
        let repo = InMemoryLeadRepository::default();
        repo.append(Lead::new("a@example.test", "speccoat")).await.expect("append");
        repo.append(Lead::new("b@example.test", "parylene")).await.expect("append");

        let emails: Vec<String> = repo.leads().await.into_iter().map(|lead| lead.email).collect();
        assert_eq!(emails, vec!["a@example.test", "b@example.test"]);
    }
}
