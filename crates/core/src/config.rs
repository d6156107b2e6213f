use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client_cache::DEFAULT_CLIENT_CACHE_CAPACITY;
use crate::pricing::{default_floor_price, DEFAULT_SERVICE_TYPE};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub pricing: PricingConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    /// Bearer token guarding client configuration writes. Unset leaves them open.
    pub admin_token: Option<SecretString>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PricingConfig {
    pub floor_price: Decimal,
    pub fallback_service_type: String,
    /// Half-width of the market noise band; `0.0` disables noise.
    pub market_noise_pct: f64,
    pub market_noise_seed: Option<u64>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            floor_price: default_floor_price(),
            fallback_service_type: DEFAULT_SERVICE_TYPE.to_string(),
            market_noise_pct: 0.0,
            market_noise_seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub client_config_capacity: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub floor_price: Option<Decimal>,
    pub market_noise_pct: Option<f64>,
    pub market_noise_seed: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://gendra.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                admin_token: None,
            },
            pricing: PricingConfig::default(),
            cache: CacheConfig { client_config_capacity: DEFAULT_CLIENT_CACHE_CAPACITY },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("gendra.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(admin_token) = server.admin_token {
                self.server.admin_token = Some(secret_value(admin_token));
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(floor_price) = pricing.floor_price {
                self.pricing.floor_price = parse_decimal("pricing.floor_price", &floor_price)?;
            }
            if let Some(fallback_service_type) = pricing.fallback_service_type {
                self.pricing.fallback_service_type = fallback_service_type;
            }
            if let Some(market_noise_pct) = pricing.market_noise_pct {
                self.pricing.market_noise_pct = market_noise_pct;
            }
            if let Some(market_noise_seed) = pricing.market_noise_seed {
                self.pricing.market_noise_seed = Some(market_noise_seed);
            }
        }

        if let Some(cache) = patch.cache {
            if let Some(capacity) = cache.client_config_capacity {
                self.cache.client_config_capacity = capacity;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("GENDRA_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("GENDRA_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("GENDRA_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("GENDRA_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("GENDRA_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("GENDRA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("GENDRA_SERVER_PORT") {
            self.server.port = parse_env("GENDRA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("GENDRA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("GENDRA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("GENDRA_SERVER_ADMIN_TOKEN") {
            self.server.admin_token = Some(secret_value(value));
        }

        if let Some(value) = read_env("GENDRA_PRICING_FLOOR_PRICE") {
            self.pricing.floor_price = parse_env("GENDRA_PRICING_FLOOR_PRICE", &value)?;
        }
        if let Some(value) = read_env("GENDRA_PRICING_FALLBACK_SERVICE_TYPE") {
            self.pricing.fallback_service_type = value;
        }
        if let Some(value) = read_env("GENDRA_PRICING_MARKET_NOISE_PCT") {
            self.pricing.market_noise_pct = parse_env("GENDRA_PRICING_MARKET_NOISE_PCT", &value)?;
        }
        if let Some(value) = read_env("GENDRA_PRICING_MARKET_NOISE_SEED") {
            self.pricing.market_noise_seed =
                Some(parse_env("GENDRA_PRICING_MARKET_NOISE_SEED", &value)?);
        }

        if let Some(value) = read_env("GENDRA_CACHE_CLIENT_CONFIG_CAPACITY") {
            self.cache.client_config_capacity =
                parse_env("GENDRA_CACHE_CLIENT_CONFIG_CAPACITY", &value)?;
        }

        let log_level = read_env("GENDRA_LOGGING_LEVEL").or_else(|| read_env("GENDRA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("GENDRA_LOGGING_FORMAT").or_else(|| read_env("GENDRA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(floor_price) = overrides.floor_price {
            self.pricing.floor_price = floor_price;
        }
        if let Some(market_noise_pct) = overrides.market_noise_pct {
            self.pricing.market_noise_pct = market_noise_pct;
        }
        if let Some(market_noise_seed) = overrides.market_noise_seed {
            self.pricing.market_noise_seed = Some(market_noise_seed);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_pricing(&self.pricing)?;
        validate_cache(&self.cache)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("gendra.toml"), PathBuf::from("config/gendra.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(token) = &server.admin_token {
        if token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.admin_token must not be blank when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.floor_price <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.floor_price must be greater than zero".to_string(),
        ));
    }

    if pricing.fallback_service_type.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pricing.fallback_service_type must not be empty".to_string(),
        ));
    }

    if !pricing.market_noise_pct.is_finite() || !(0.0..1.0).contains(&pricing.market_noise_pct) {
        return Err(ConfigError::Validation(
            "pricing.market_noise_pct must be in range 0.0..1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_cache(cache: &CacheConfig) -> Result<(), ConfigError> {
    if cache.client_config_capacity == 0 {
        return Err(ConfigError::Validation(
            "cache.client_config_capacity must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &DecimalPatch) -> Result<Decimal, ConfigError> {
    match value {
        DecimalPatch::Text(text) => text
            .trim()
            .parse::<Decimal>()
            .map_err(|_| ConfigError::Validation(format!("{key} is not a decimal: `{text}`"))),
        DecimalPatch::Integer(number) => Ok(Decimal::from(*number)),
        DecimalPatch::Float(number) => Decimal::try_from(*number)
            .map_err(|_| ConfigError::Validation(format!("{key} is not a decimal: `{number}`"))),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    pricing: Option<PricingPatch>,
    cache: Option<CachePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    admin_token: Option<String>,
}

/// TOML has no decimal type; prices may be written as strings, integers or floats.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DecimalPatch {
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    floor_price: Option<DecimalPatch>,
    fallback_service_type: Option<String>,
    market_noise_pct: Option<f64>,
    market_noise_seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    client_config_capacity: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
