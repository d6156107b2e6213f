use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use uuid::Uuid;

use gendra_core::domain::client::ClientId;
use gendra_core::domain::quote::{CustomerDetails, QuoteId, QuoteRecord};

use super::{QuoteLogRepository, RepositoryError};
use crate::DbPool;

const UNKNOWN_CLIENT: &str = "unknown";

pub struct SqlQuoteLog {
    pool: DbPool,
}

impl SqlQuoteLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM quotes").fetch_one(&self.pool).await?;
        row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}

fn decimal_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    Decimal::from_str(&raw)
        .map_err(|e| RepositoryError::Decode(format!("column `{column}` is not a decimal: {e}")))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<QuoteRecord, RepositoryError> {
    let quote_id: String =
        row.try_get("quote_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let client_id: String =
        row.try_get("client_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let service_type: String =
        row.try_get("service_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let material: Option<String> =
        row.try_get("material").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let turnaround_days: Option<i64> =
        row.try_get("turnaround_days").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let metadata: String =
        row.try_get("metadata").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let quote_id = Uuid::parse_str(&quote_id)
        .map(QuoteId)
        .map_err(|e| RepositoryError::Decode(format!("invalid quote id `{quote_id}`: {e}")))?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| RepositoryError::Decode(format!("quantity {quantity} out of range")))?;
    let metadata = serde_json::from_str(&metadata)
        .map_err(|e| RepositoryError::Decode(format!("column `metadata` holds invalid JSON: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(QuoteRecord {
        quote_id,
        client_id: (client_id != UNKNOWN_CLIENT).then(|| ClientId(client_id)),
        amount: decimal_column(row, "amount")?,
        service_type,
        material,
        quantity,
        complexity: decimal_column(row, "complexity")?,
        turnaround_days,
        customer: CustomerDetails {
            email: row.try_get("customer_email").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            name: row.try_get("customer_name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
            company_name: row
                .try_get("company_name")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?,
            notes: row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        },
        metadata,
        created_at,
    })
}

#[async_trait]
impl QuoteLogRepository for SqlQuoteLog {
    async fn append(&self, record: QuoteRecord) -> Result<(), RepositoryError> {
        let metadata = serde_json::to_string(&record.metadata)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO quotes (quote_id, client_id, amount, service_type, material, quantity,
                                 complexity, turnaround_days, customer_email, customer_name,
                                 company_name, notes, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.quote_id.to_string())
        .bind(record.client_label())
        .bind(record.amount.to_string())
        .bind(&record.service_type)
        .bind(&record.material)
        .bind(i64::from(record.quantity))
        .bind(record.complexity.to_string())
        .bind(record.turnaround_days)
        .bind(&record.customer.email)
        .bind(&record.customer.name)
        .bind(&record.customer.company_name)
        .bind(&record.customer.notes)
        .bind(metadata)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_client(
        &self,
        client_id: &ClientId,
        limit: u32,
    ) -> Result<Vec<QuoteRecord>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT quote_id, client_id, amount, service_type, material, quantity, complexity,
                    turnaround_days, customer_email, customer_name, company_name, notes,
                    metadata, created_at
             FROM quotes
             WHERE client_id = ?
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(client_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()
    }
}
