use std::collections::BTreeMap;

use chrono::Utc;

use gendra_core::domain::client::{Branding, ClientConfig, ClientId, QuoteSchema};

use crate::repositories::{ClientConfigRepository, RepositoryError};

/// Demo tenants used for local development and end-to-end checks.
///
/// - `speccoat-demo` pins the surface treatment schema with a lower volume break.
/// - `metalworks-demo` keeps the base formula but raises the unit rate.
/// - `coatings-demo` prices parylene and shows the coating form fields.
pub struct DemoClientDataset;

#[derive(Debug, Clone, Copy)]
struct DemoClient {
    client_id: &'static str,
    service_type: &'static str,
    theme: &'static str,
    primary_color: &'static str,
    visible_fields: &'static [&'static str],
    description: &'static str,
}

const DEMO_CLIENTS: &[DemoClient] = &[
    DemoClient {
        client_id: "speccoat-demo",
        service_type: "speccoat",
        theme: "dark",
        primary_color: "#0a84ff",
        visible_fields: &["quantity", "complexity", "turnaround_days", "masking_level", "board_area"],
        description: "Surface treatment shop with certification on every job",
    },
    DemoClient {
        client_id: "metalworks-demo",
        service_type: "metal_fab",
        theme: "light",
        primary_color: "#ff6b00",
        visible_fields: &["quantity", "material", "complexity"],
        description: "Fabrication shop on the base formula with a custom rate",
    },
    DemoClient {
        client_id: "coatings-demo",
        service_type: "parylene",
        theme: "light",
        primary_color: "#2e7d32",
        visible_fields: &["quantity", "material", "complexity", "turnaround_days"],
        description: "Parylene coating line",
    },
];

impl DemoClient {
    fn schema(&self) -> QuoteSchema {
        let schema = QuoteSchema::new().with("service_type", self.service_type);
        match self.client_id {
            "speccoat-demo" => schema.with("volume_break", 50).with("certification_required", true),
            "metalworks-demo" => schema.with("unit_rate", "7.50"),
            _ => schema,
        }
    }

    fn config(&self) -> ClientConfig {
        ClientConfig {
            client_id: ClientId(self.client_id.to_string()),
            quote_schema: self.schema(),
            branding: Branding {
                theme: Some(self.theme.to_string()),
                logo_url: Some(format!("https://assets.gendra.test/{}.svg", self.client_id)),
                colors: BTreeMap::from([("primary".to_string(), self.primary_color.to_string())]),
            },
            visible_fields: self.visible_fields.iter().map(|field| field.to_string()).collect(),
            updated_at: Utc::now(),
        }
    }
}

impl DemoClientDataset {
    pub fn configs() -> Vec<ClientConfig> {
        DEMO_CLIENTS.iter().map(DemoClient::config).collect()
    }

    /// Upserts every demo tenant. Safe to run repeatedly.
    pub async fn load<R>(repository: &R) -> Result<SeedResult, RepositoryError>
    where
        R: ClientConfigRepository + ?Sized,
    {
        let mut clients_seeded = Vec::with_capacity(DEMO_CLIENTS.len());
        for client in DEMO_CLIENTS {
            repository.upsert(client.config()).await?;
            clients_seeded.push(ClientSeedInfo {
                client_id: client.client_id,
                service_type: client.service_type,
                description: client.description,
            });
        }

        Ok(SeedResult { clients_seeded })
    }

    pub async fn verify<R>(repository: &R) -> Result<VerificationResult, RepositoryError>
    where
        R: ClientConfigRepository + ?Sized,
    {
        let stored = repository.list_client_ids().await?;
        let checks: Vec<(&'static str, bool)> = DEMO_CLIENTS
            .iter()
            .map(|client| {
                (client.client_id, stored.iter().any(|id| id.as_str() == client.client_id))
            })
            .collect();
        let all_present = checks.iter().all(|(_, present)| *present);

        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub clients_seeded: Vec<ClientSeedInfo>,
}

#[derive(Debug)]
pub struct ClientSeedInfo {
    pub client_id: &'static str,
    pub service_type: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
