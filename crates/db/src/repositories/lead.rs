use async_trait::async_trait;
use sqlx::Row;

use super::{LeadRepository, RepositoryError};
use crate::DbPool;
use gendra_core::domain::lead::Lead;

pub struct SqlLeadRepository {
    pool: DbPool,
}

impl SqlLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count_by_email(&self, email: &str) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM leads WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LeadRepository for SqlLeadRepository {
    async fn append(&self, lead: Lead) -> Result<(), RepositoryError> {
        let metadata = serde_json::to_string(&lead.metadata)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO leads (id, email, name, company_name, phone, interest_type, message,
                                status, source, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(lead.id.0.to_string())
        .bind(&lead.email)
        .bind(&lead.name)
        .bind(&lead.company_name)
        .bind(&lead.phone)
        .bind(&lead.interest_type)
        .bind(&lead.message)
        .bind(&lead.status)
        .bind(&lead.source)
        .bind(metadata)
        .bind(lead.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
