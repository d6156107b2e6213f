use async_trait::async_trait;
use thiserror::Error;

use gendra_core::client_cache::{ClientConfigSource, SourceError};
use gendra_core::domain::client::{ClientConfig, ClientId};
use gendra_core::domain::lead::Lead;
use gendra_core::domain::quote::QuoteRecord;

pub mod client_config;
pub mod lead;
pub mod memory;
pub mod quote;

pub use client_config::SqlClientConfigRepository;
pub use lead::SqlLeadRepository;
pub use memory::{InMemoryClientConfigRepository, InMemoryLeadRepository, InMemoryQuoteLog};
pub use quote::SqlQuoteLog;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for SourceError {
    fn from(value: RepositoryError) -> Self {
        SourceError(value.to_string())
    }
}

/// Durable home of client configurations. Reads go through
/// [`ClientConfigSource::fetch`] so the store can sit behind the cache.
#[async_trait]
pub trait ClientConfigRepository: ClientConfigSource {
    async fn upsert(&self, config: ClientConfig) -> Result<(), RepositoryError>;
    async fn list_client_ids(&self) -> Result<Vec<ClientId>, RepositoryError>;
}

/// Append-only log of computed quotes.
#[async_trait]
pub trait QuoteLogRepository: Send + Sync {
    async fn append(&self, record: QuoteRecord) -> Result<(), RepositoryError>;
    async fn list_for_client(
        &self,
        client_id: &ClientId,
        limit: u32,
    ) -> Result<Vec<QuoteRecord>, RepositoryError>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn append(&self, lead: Lead) -> Result<(), RepositoryError>;
}
