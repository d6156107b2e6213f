use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::client::{ClientConfig, ClientId};

pub const DEFAULT_CLIENT_CACHE_CAPACITY: u64 = 100;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("client configuration store failure: {0}")]
pub struct SourceError(pub String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigLookupError {
    #[error("no configuration found for client `{0}`")]
    NotFound(ClientId),
    #[error("fetching configuration for client `{client_id}` failed: {message}")]
    Fetch { client_id: ClientId, message: String },
}

/// Point lookup into wherever client configurations live.
#[async_trait]
pub trait ClientConfigSource: Send + Sync {
    async fn fetch(&self, client_id: &ClientId) -> Result<Option<ClientConfig>, SourceError>;
}

#[async_trait]
impl<T> ClientConfigSource for Arc<T>
where
    T: ClientConfigSource + ?Sized,
{
    async fn fetch(&self, client_id: &ClientId) -> Result<Option<ClientConfig>, SourceError> {
        (**self).fetch(client_id).await
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidateScope<'a> {
    Key(&'a ClientId),
    All,
}

/// Bounded memo of client configurations in front of a [`ClientConfigSource`].
///
/// Entries never expire on their own; they leave through capacity eviction or
/// [`ClientConfigCache::invalidate`]. Misses fetch synchronously from the
/// caller's point of view and concurrent misses on one key may each fetch.
/// "Not found" answers are not memoized.
pub struct ClientConfigCache<S> {
    source: S,
    entries: Cache<ClientId, Arc<ClientConfig>>,
}

impl<S> ClientConfigCache<S>
where
    S: ClientConfigSource,
{
    pub fn new(source: S, capacity: u64) -> Self {
        Self { source, entries: Cache::new(capacity.max(1)) }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn get(&self, client_id: &ClientId) -> Result<Arc<ClientConfig>, ConfigLookupError> {
        if let Some(config) = self.entries.get(client_id).await {
            debug!(
                event_name = "client_config.cache.hit",
                client_id = %client_id,
                "client config served from cache"
            );
            return Ok(config);
        }

        match self.source.fetch(client_id).await {
            Ok(Some(config)) => {
                let config = Arc::new(config);
                self.entries.insert(client_id.clone(), config.clone()).await;
                info!(
                    event_name = "client_config.cache.populated",
                    client_id = %client_id,
                    "client config fetched from store"
                );
                Ok(config)
            }
            Ok(None) => {
                warn!(
                    event_name = "client_config.not_found",
                    client_id = %client_id,
                    "no client config stored"
                );
                Err(ConfigLookupError::NotFound(client_id.clone()))
            }
            Err(error) => Err(ConfigLookupError::Fetch {
                client_id: client_id.clone(),
                message: error.0,
            }),
        }
    }

    /// Drops memoized entries. The next `get` repopulates on demand.
    pub async fn invalidate(&self, scope: InvalidateScope<'_>) {
        match scope {
            InvalidateScope::Key(client_id) => {
                self.entries.invalidate(client_id).await;
                info!(
                    event_name = "client_config.cache.invalidated",
                    client_id = %client_id,
                    "cleared cached client config"
                );
            }
            InvalidateScope::All => {
                self.entries.invalidate_all();
                info!(
                    event_name = "client_config.cache.invalidated",
                    client_id = "all",
                    "cleared entire client config cache"
                );
            }
        }
    }

    pub async fn contains(&self, client_id: &ClientId) -> bool {
        self.entries.get(client_id).await.is_some()
    }
}
