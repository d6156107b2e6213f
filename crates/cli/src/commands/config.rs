use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use gendra_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Entry {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(entry.key, &entry.value, source));
    }

    lines.join("\n")
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let admin_token = match &config.server.admin_token {
        Some(token) => redact_token(token.expose_secret()),
        None => "<unset>".to_string(),
    };

    vec![
        Entry {
            key: "database.url",
            env_keys: &["GENDRA_DATABASE_URL"],
            value: config.database.url.clone(),
        },
        Entry {
            key: "database.max_connections",
            env_keys: &["GENDRA_DATABASE_MAX_CONNECTIONS"],
            value: config.database.max_connections.to_string(),
        },
        Entry {
            key: "database.timeout_secs",
            env_keys: &["GENDRA_DATABASE_TIMEOUT_SECS"],
            value: config.database.timeout_secs.to_string(),
        },
        Entry {
            key: "server.bind_address",
            env_keys: &["GENDRA_SERVER_BIND_ADDRESS"],
            value: config.server.bind_address.clone(),
        },
        Entry {
            key: "server.port",
            env_keys: &["GENDRA_SERVER_PORT"],
            value: config.server.port.to_string(),
        },
        Entry {
            key: "server.graceful_shutdown_secs",
            env_keys: &["GENDRA_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            value: config.server.graceful_shutdown_secs.to_string(),
        },
        Entry {
            key: "server.admin_token",
            env_keys: &["GENDRA_SERVER_ADMIN_TOKEN"],
            value: admin_token,
        },
        Entry {
            key: "pricing.floor_price",
            env_keys: &["GENDRA_PRICING_FLOOR_PRICE"],
            value: config.pricing.floor_price.to_string(),
        },
        Entry {
            key: "pricing.fallback_service_type",
            env_keys: &["GENDRA_PRICING_FALLBACK_SERVICE_TYPE"],
            value: config.pricing.fallback_service_type.clone(),
        },
        Entry {
            key: "pricing.market_noise_pct",
            env_keys: &["GENDRA_PRICING_MARKET_NOISE_PCT"],
            value: config.pricing.market_noise_pct.to_string(),
        },
        Entry {
            key: "pricing.market_noise_seed",
            env_keys: &["GENDRA_PRICING_MARKET_NOISE_SEED"],
            value: config
                .pricing
                .market_noise_seed
                .map(|seed| seed.to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
        },
        Entry {
            key: "cache.client_config_capacity",
            env_keys: &["GENDRA_CACHE_CLIENT_CONFIG_CAPACITY"],
            value: config.cache.client_config_capacity.to_string(),
        },
        Entry {
            key: "logging.level",
            env_keys: &["GENDRA_LOGGING_LEVEL", "GENDRA_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Entry {
            key: "logging.format",
            env_keys: &["GENDRA_LOGGING_FORMAT", "GENDRA_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("gendra.toml"), PathBuf::from("config/gendra.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.get(..4) {
        Some(prefix) if trimmed.len() > 8 => format!("{prefix}***"),
        _ => "<redacted>".to_string(),
    }
}
