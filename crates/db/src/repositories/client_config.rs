use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use gendra_core::client_cache::{ClientConfigSource, SourceError};
use gendra_core::domain::client::{Branding, ClientConfig, ClientId, QuoteSchema};

use super::{ClientConfigRepository, RepositoryError};
use crate::DbPool;

pub struct SqlClientConfigRepository {
    pool: DbPool,
}

impl SqlClientConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        client_id: &ClientId,
    ) -> Result<Option<ClientConfig>, RepositoryError> {
        let row = sqlx::query(
            "SELECT client_id, quote_schema, branding, visible_fields, updated_at
             FROM client_configs WHERE client_id = ?",
        )
        .bind(client_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_client_config(r)?)),
            None => Ok(None),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("column `{column}` holds invalid JSON: {e}")))
}

fn encode<T: serde::Serialize>(column: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|e| RepositoryError::Decode(format!("column `{column}` could not be encoded: {e}")))
}

fn row_to_client_config(row: &sqlx::sqlite::SqliteRow) -> Result<ClientConfig, RepositoryError> {
    let client_id: String =
        row.try_get("client_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quote_schema: String =
        row.try_get("quote_schema").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let branding: String =
        row.try_get("branding").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let visible_fields: String =
        row.try_get("visible_fields").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            RepositoryError::Decode(format!("column `updated_at` holds an invalid timestamp: {e}"))
        })?;

    Ok(ClientConfig {
        client_id: ClientId(client_id),
        quote_schema: decode::<QuoteSchema>("quote_schema", &quote_schema)?,
        branding: decode::<Branding>("branding", &branding)?,
        visible_fields: decode::<Vec<String>>("visible_fields", &visible_fields)?,
        updated_at,
    })
}

#[async_trait]
impl ClientConfigSource for SqlClientConfigRepository {
    async fn fetch(&self, client_id: &ClientId) -> Result<Option<ClientConfig>, SourceError> {
        self.find_by_id(client_id).await.map_err(SourceError::from)
    }
}

#[async_trait]
impl ClientConfigRepository for SqlClientConfigRepository {
    async fn upsert(&self, config: ClientConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO client_configs (client_id, quote_schema, branding, visible_fields, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(client_id) DO UPDATE SET
                 quote_schema = excluded.quote_schema,
                 branding = excluded.branding,
                 visible_fields = excluded.visible_fields,
                 updated_at = excluded.updated_at",
        )
        .bind(config.client_id.as_str())
        .bind(encode("quote_schema", &config.quote_schema)?)
        .bind(encode("branding", &config.branding)?)
        .bind(encode("visible_fields", &config.visible_fields)?)
        .bind(config.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_client_ids(&self) -> Result<Vec<ClientId>, RepositoryError> {
        let rows = sqlx::query("SELECT client_id FROM client_configs ORDER BY client_id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("client_id")
                    .map(ClientId)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }
}
