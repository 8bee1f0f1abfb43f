use std::env;
use std::fs;
use std::path::Path;

use quotedesk_core::config::{detect_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    CommandResult { exit_code: 0, output: render(&config) }
}

fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let fields: Vec<(&str, String, &[&str])> = vec![
        ("database.url", config.database.url.clone(), &["QUOTEDESK_DATABASE_URL"] as &[&str]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["QUOTEDESK_DATABASE_MAX_CONNECTIONS"] as &[&str],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["QUOTEDESK_DATABASE_TIMEOUT_SECS"] as &[&str],
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["QUOTEDESK_SERVER_BIND_ADDRESS"] as &[&str],
        ),
        ("server.port", config.server.port.to_string(), &["QUOTEDESK_SERVER_PORT"] as &[&str]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["QUOTEDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"] as &[&str],
        ),
        ("desk.admin_id", config.desk.admin_id.clone(), &["QUOTEDESK_DESK_ADMIN_ID"] as &[&str]),
        (
            "logging.level",
            config.logging.level.clone(),
            &["QUOTEDESK_LOGGING_LEVEL", "QUOTEDESK_LOG_LEVEL"] as &[&str],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["QUOTEDESK_LOGGING_FORMAT", "QUOTEDESK_LOG_FORMAT"] as &[&str],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in fields {
        lines.push(render_line(key_path, &value, source(key_path, env_keys)));
    }
    lines.join("\n")
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
    for env_key in env_keys {
        if env::var(env_key).is_ok_and(|value| !value.trim().is_empty()) {
            return format!("env ({env_key})");
        }
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
