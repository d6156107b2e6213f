use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::ClientId;

/// Correlates a computed quote with its persisted record and log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub Uuid);

impl QuoteId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub notes: Option<String>,
}

/// What the quote log stores for every computed quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub quote_id: QuoteId,
    pub client_id: Option<ClientId>,
    pub amount: Decimal,
    pub service_type: String,
    pub material: Option<String>,
    pub quantity: u32,
    pub complexity: Decimal,
    pub turnaround_days: Option<i64>,
    pub customer: CustomerDetails,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl QuoteRecord {
    /// Client id as written to the store; absent clients are logged as `unknown`.
    pub fn client_label(&self) -> &str {
        self.client_id.as_ref().map(ClientId::as_str).unwrap_or("unknown")
    }
}
