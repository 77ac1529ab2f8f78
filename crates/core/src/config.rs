use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolution::{PriceRange, ResolutionPolicy};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub classifier: ClassifierConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub policy: ResolutionPolicy,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub endpoint_url: String,
    pub timeout_ms: u64,
    pub enabled: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
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
    pub classifier_endpoint_url: Option<String>,
    pub classifier_enabled: Option<bool>,
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
                url: "sqlite://offerwise.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            classifier: ClassifierConfig {
                endpoint_url: "http://localhost:8000/recommend".to_string(),
                timeout_ms: 30_000,
                enabled: true,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 5000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            policy: ResolutionPolicy::default(),
        }
    }
}

impl std::str::FromStr for LogFormat {
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
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("offerwise.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
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

        if let Some(classifier) = patch.classifier {
            if let Some(endpoint_url) = classifier.endpoint_url {
                self.classifier.endpoint_url = endpoint_url;
            }
            if let Some(timeout_ms) = classifier.timeout_ms {
                self.classifier.timeout_ms = timeout_ms;
            }
            if let Some(enabled) = classifier.enabled {
                self.classifier.enabled = enabled;
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
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(policy) = patch.policy {
            self.apply_policy_patch(policy);
        }
    }

    fn apply_policy_patch(&mut self, patch: PolicyPatch) {
        let policy = &mut self.policy;
        if let Some(rank_decay) = patch.rank_decay {
            policy.rank_decay = rank_decay;
        }
        if let Some(score_floor) = patch.score_floor {
            policy.score_floor = score_floor;
        }
        if let Some(default_confidence) = patch.default_confidence {
            policy.default_confidence = default_confidence;
        }
        if let Some(secondary_score_factor) = patch.secondary_score_factor {
            policy.secondary_score_factor = secondary_score_factor;
        }
        if let Some(agreement_boost) = patch.agreement_boost {
            policy.agreement_boost = agreement_boost;
        }
        if let Some(rule_confidence_cap) = patch.rule_confidence_cap {
            policy.rule_confidence_cap = rule_confidence_cap;
        }
        if let Some(max_rule_offers) = patch.max_rule_offers {
            policy.max_rule_offers = max_rule_offers;
        }
        if let Some(fallback_band_high) = patch.fallback_band_high {
            policy.fallback_band_high = fallback_band_high;
        }
        if let Some(fallback_band_low) = patch.fallback_band_low {
            policy.fallback_band_low = fallback_band_low;
        }
        if let Some(fallback_separation) = patch.fallback_separation {
            policy.fallback_separation = fallback_separation;
        }
        if let Some(fallback_budget_threshold) = patch.fallback_budget_threshold {
            policy.fallback_budget_threshold = fallback_budget_threshold;
        }
        if let Some(low_price_threshold) = patch.low_price_threshold {
            policy.low_price_threshold = low_price_threshold;
        }

        if let Some(ranges) = patch.budget_ranges {
            if let Some(low) = ranges.low {
                policy.budget_ranges.low = low;
            }
            if let Some(medium) = ranges.medium {
                policy.budget_ranges.medium = medium;
            }
            if let Some(high) = ranges.high {
                policy.budget_ranges.high = high;
            }
        }

        if let Some(weights) = patch.relevance_weights {
            if let Some(category_match) = weights.category_match {
                policy.relevance_weights.category_match = category_match;
            }
            if let Some(popularity) = weights.popularity {
                policy.relevance_weights.popularity = popularity;
            }
            if let Some(budget_match) = weights.budget_match {
                policy.relevance_weights.budget_match = budget_match;
            }
            if let Some(low_price) = weights.low_price {
                policy.relevance_weights.low_price = low_price;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("OFFERWISE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("OFFERWISE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("OFFERWISE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("OFFERWISE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("OFFERWISE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("OFFERWISE_CLASSIFIER_ENDPOINT_URL") {
            self.classifier.endpoint_url = value;
        }
        if let Some(value) = read_env("OFFERWISE_CLASSIFIER_TIMEOUT_MS") {
            self.classifier.timeout_ms = parse_u64("OFFERWISE_CLASSIFIER_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("OFFERWISE_CLASSIFIER_ENABLED") {
            self.classifier.enabled = parse_bool("OFFERWISE_CLASSIFIER_ENABLED", &value)?;
        }

        if let Some(value) = read_env("OFFERWISE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("OFFERWISE_SERVER_PORT") {
            self.server.port = parse_u16("OFFERWISE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("OFFERWISE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("OFFERWISE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("OFFERWISE_LOGGING_LEVEL").or_else(|| read_env("OFFERWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("OFFERWISE_LOGGING_FORMAT").or_else(|| read_env("OFFERWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        self.apply_policy_env_overrides()
    }

    fn apply_policy_env_overrides(&mut self) -> Result<(), ConfigError> {
        let policy = &mut self.policy;
        let float_knobs: [(&str, &mut f64); 9] = [
            ("OFFERWISE_POLICY_RANK_DECAY", &mut policy.rank_decay),
            ("OFFERWISE_POLICY_SCORE_FLOOR", &mut policy.score_floor),
            ("OFFERWISE_POLICY_DEFAULT_CONFIDENCE", &mut policy.default_confidence),
            ("OFFERWISE_POLICY_SECONDARY_SCORE_FACTOR", &mut policy.secondary_score_factor),
            ("OFFERWISE_POLICY_AGREEMENT_BOOST", &mut policy.agreement_boost),
            ("OFFERWISE_POLICY_RULE_CONFIDENCE_CAP", &mut policy.rule_confidence_cap),
            ("OFFERWISE_POLICY_FALLBACK_BAND_HIGH", &mut policy.fallback_band_high),
            ("OFFERWISE_POLICY_FALLBACK_BAND_LOW", &mut policy.fallback_band_low),
            ("OFFERWISE_POLICY_FALLBACK_SEPARATION", &mut policy.fallback_separation),
        ];
        for (key, slot) in float_knobs {
            if let Some(value) = read_env(key) {
                *slot = parse_f64(key, &value)?;
            }
        }

        if let Some(value) = read_env("OFFERWISE_POLICY_MAX_RULE_OFFERS") {
            policy.max_rule_offers = parse_usize("OFFERWISE_POLICY_MAX_RULE_OFFERS", &value)?;
        }
        if let Some(value) = read_env("OFFERWISE_POLICY_FALLBACK_BUDGET_THRESHOLD") {
            policy.fallback_budget_threshold =
                parse_usize("OFFERWISE_POLICY_FALLBACK_BUDGET_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("OFFERWISE_POLICY_LOW_PRICE_THRESHOLD") {
            policy.low_price_threshold =
                parse_i64("OFFERWISE_POLICY_LOW_PRICE_THRESHOLD", &value)?;
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
        if let Some(endpoint_url) = overrides.classifier_endpoint_url {
            self.classifier.endpoint_url = endpoint_url;
        }
        if let Some(enabled) = overrides.classifier_enabled {
            self.classifier.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_classifier(&self.classifier)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        self.policy.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("offerwise.toml"), PathBuf::from("config/offerwise.toml")]
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

fn validate_classifier(classifier: &ClassifierConfig) -> Result<(), ConfigError> {
    if classifier.timeout_ms == 0 || classifier.timeout_ms > 120_000 {
        return Err(ConfigError::Validation(
            "classifier.timeout_ms must be in range 1..=120000".to_string(),
        ));
    }

    if classifier.enabled {
        let url = classifier.endpoint_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "classifier.endpoint_url must start with http:// or https:// (or set classifier.enabled = false)"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
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

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    classifier: Option<ClassifierPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    policy: Option<PolicyPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ClassifierPatch {
    endpoint_url: Option<String>,
    timeout_ms: Option<u64>,
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyPatch {
    rank_decay: Option<f64>,
    score_floor: Option<f64>,
    default_confidence: Option<f64>,
    secondary_score_factor: Option<f64>,
    agreement_boost: Option<f64>,
    rule_confidence_cap: Option<f64>,
    max_rule_offers: Option<usize>,
    fallback_band_high: Option<f64>,
    fallback_band_low: Option<f64>,
    fallback_separation: Option<f64>,
    fallback_budget_threshold: Option<usize>,
    low_price_threshold: Option<i64>,
    budget_ranges: Option<BudgetRangesPatch>,
    relevance_weights: Option<RelevanceWeightsPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct BudgetRangesPatch {
    low: Option<PriceRange>,
    medium: Option<PriceRange>,
    high: Option<PriceRange>,
}

#[derive(Debug, Default, Deserialize)]
struct RelevanceWeightsPatch {
    category_match: Option<f64>,
    popularity: Option<f64>,
    budget_match: Option<f64>,
    low_price: Option<f64>,
}
