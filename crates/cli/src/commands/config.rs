use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use offerwise_core::config::AppConfig;
use serde::Serialize;
use toml::Value;

use crate::commands::{load_config, CommandResult, EXIT_RUNTIME};

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let entries = effective_entries(&config, config_file_doc.as_ref(), config_file_path.as_deref());

    let data = match serde_json::to_value(&entries) {
        Ok(data) => data,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "serialization",
                error.to_string(),
                EXIT_RUNTIME,
            );
        }
    };
    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        Some(data),
    )
}

fn effective_entries(
    config: &AppConfig,
    doc: Option<&Value>,
    path: Option<&Path>,
) -> Vec<ConfigEntry> {
    let policy = &config.policy;
    let fields = [
        field("database.url", redact_url(&config.database.url), &["OFFERWISE_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["OFFERWISE_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["OFFERWISE_DATABASE_TIMEOUT_SECS"],
        ),
        field(
            "classifier.endpoint_url",
            config.classifier.endpoint_url.clone(),
            &["OFFERWISE_CLASSIFIER_ENDPOINT_URL"],
        ),
        field(
            "classifier.timeout_ms",
            config.classifier.timeout_ms.to_string(),
            &["OFFERWISE_CLASSIFIER_TIMEOUT_MS"],
        ),
        field(
            "classifier.enabled",
            config.classifier.enabled.to_string(),
            &["OFFERWISE_CLASSIFIER_ENABLED"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["OFFERWISE_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["OFFERWISE_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["OFFERWISE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["OFFERWISE_LOGGING_LEVEL", "OFFERWISE_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["OFFERWISE_LOGGING_FORMAT", "OFFERWISE_LOG_FORMAT"],
        ),
        field(
            "policy.rank_decay",
            policy.rank_decay.to_string(),
            &["OFFERWISE_POLICY_RANK_DECAY"],
        ),
        field(
            "policy.score_floor",
            policy.score_floor.to_string(),
            &["OFFERWISE_POLICY_SCORE_FLOOR"],
        ),
        field(
            "policy.rule_confidence_cap",
            policy.rule_confidence_cap.to_string(),
            &["OFFERWISE_POLICY_RULE_CONFIDENCE_CAP"],
        ),
        field(
            "policy.max_rule_offers",
            policy.max_rule_offers.to_string(),
            &["OFFERWISE_POLICY_MAX_RULE_OFFERS"],
        ),
    ];

    fields
        .into_iter()
        .map(|(key, value, env_keys)| ConfigEntry {
            key,
            value,
            source: field_source(key, env_keys, doc, path),
        })
        .collect()
}

fn field(
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
) -> (&'static str, String, &'static [&'static str]) {
    (key, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("offerwise.toml"), PathBuf::from("config/offerwise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
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

/// Hides credentials embedded in a database URL (`user:pass@host`).
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((_, host)) => format!("{scheme}://***@{host}"),
        None => url.to_string(),
    }
}
