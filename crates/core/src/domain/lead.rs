use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub email: String,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub interest_type: String,
    pub message: Option<String>,
    pub status: String,
    pub source: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub const DEFAULT_STATUS: &'static str = "new";

    pub fn new(email: impl Into<String>, interest_type: impl Into<String>) -> Self {
        Self {
            id: LeadId(Uuid::new_v4()),
            email: email.into(),
            name: None,
            company_name: None,
            phone: None,
            interest_type: interest_type.into(),
            message: None,
            status: Self::DEFAULT_STATUS.to_string(),
            source: None,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::InvariantViolation(
                "lead email must be a non-empty address".to_string(),
            ));
        }
        if self.interest_type.trim().is_empty() {
            return Err(DomainError::InvariantViolation(
                "lead interest_type is required".to_string(),
            ));
        }
        Ok(())
    }
}
