use std::fs;
use std::path::Path;

use gendra_core::domain::client::{ClientConfig, ClientId};
use gendra_core::domain::fields::{
    FieldSet, FieldValue, COMPLEXITY, MATERIAL, QUANTITY, SERVICE_TYPE, TURNAROUND_DAYS,
};
use gendra_core::ingest::{self, UploadFormat};
use gendra_core::orchestrator::QuoteOrchestrator;
use gendra_db::repositories::SqlClientConfigRepository;
use serde_json::json;

use crate::commands::{load_config, migrated_pool, runtime, CommandResult, Failure};
use crate::QuoteArgs;

pub fn run(args: &QuoteArgs) -> CommandResult {
    let fields = match build_fields(args) {
        Ok(fields) => fields,
        Err(message) => return CommandResult::failure("quote", "quote_input", message, 7),
    };
    let config = match load_config("quote") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let client = match &args.client {
        Some(client_id) => {
            let runtime = match runtime("quote") {
                Ok(runtime) => runtime,
                Err(failure) => return failure,
            };
            let client_id = ClientId(client_id.trim().to_string());
            match runtime.block_on(fetch_client(&config, &client_id)) {
                Ok(client) => client,
                Err((error_class, message, exit_code)) => {
                    return CommandResult::failure("quote", error_class, message, exit_code);
                }
            }
        }
        None => None,
    };

    let orchestrator = QuoteOrchestrator::from_config(&config.pricing);
    match orchestrator.get_quote(&fields, client.as_ref()) {
        Ok(computation) => {
            let message = format!(
                "quote {} ({} via {})",
                computation.amount, computation.service_type, computation.strategy
            );
            let data = json!({
                "amount": computation.amount.to_string(),
                "service_type": computation.service_type,
                "strategy": computation.strategy,
                "client_id": args.client,
                "client_config_applied": client.is_some(),
            });
            CommandResult::success_with_data("quote", message, Some(data))
        }
        Err(error) => CommandResult::failure("quote", "computation", error.to_string(), 8),
    }
}

async fn fetch_client(
    config: &gendra_core::config::AppConfig,
    client_id: &ClientId,
) -> Result<Option<ClientConfig>, Failure> {
    let pool = migrated_pool(config).await?;
    let repository = SqlClientConfigRepository::new(pool.clone());
    let result = repository
        .find_by_id(client_id)
        .await
        .map_err(|error| ("client_lookup", error.to_string(), 4u8));
    pool.close().await;
    result
}

/// Upload sheet first, then `--field` pairs, then the named flags; later wins.
pub fn build_fields(args: &QuoteArgs) -> Result<FieldSet, String> {
    let mut fields = match &args.file {
        Some(path) => read_sheet(path)?,
        None => FieldSet::new(),
    };

    for pair in &args.fields {
        let (key, value) = pair
            .split_once('=')
            .map(|(key, value)| (key.trim(), value.trim()))
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| format!("expected KEY=VALUE, got `{pair}`"))?;
        fields = fields.with(key, parse_value(value));
    }

    if let Some(service_type) = &args.service_type {
        fields = fields.with(SERVICE_TYPE, service_type.trim());
    }
    if let Some(quantity) = args.quantity {
        fields = fields.with(QUANTITY, quantity);
    }
    if let Some(complexity) = args.complexity {
        fields = fields.with(COMPLEXITY, complexity);
    }
    if let Some(material) = &args.material {
        fields = fields.with(MATERIAL, material.trim());
    }
    if let Some(days) = args.turnaround_days {
        fields = fields.with(TURNAROUND_DAYS, days);
    }

    Ok(fields)
}

fn read_sheet(path: &Path) -> Result<FieldSet, String> {
    let bytes =
        fs::read(path).map_err(|error| format!("cannot read `{}`: {error}", path.display()))?;
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(UploadFormat::from_extension)
        .unwrap_or(UploadFormat::PlainText);
    ingest::parse_upload(format.content_type(), &bytes).map_err(|error| error.to_string())
}

fn parse_value(raw: &str) -> FieldValue {
    if let Ok(flag) = raw.parse::<bool>() {
        return FieldValue::Bool(flag);
    }
    if let Ok(integer) = raw.parse::<i64>() {
        return FieldValue::Integer(integer);
    }
    match raw.parse::<f64>() {
        Ok(float) if float.is_finite() => FieldValue::Float(float),
        _ => FieldValue::Text(raw.to_string()),
    }
}
