use std::env;
use std::fs;
use std::path::Path;

use sentinel_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let policy_path = config
        .assets
        .policy_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in>".to_string());

    vec![
        field("database.url", &["SENTINEL_DATABASE_URL"], config.database.url.clone()),
        field(
            "database.max_connections",
            &["SENTINEL_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        field(
            "database.timeout_secs",
            &["SENTINEL_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        field("llm.provider", &["SENTINEL_LLM_PROVIDER"], config.llm.provider.as_str().to_string()),
        field("llm.model", &["SENTINEL_LLM_MODEL"], config.llm.model.clone()),
        field(
            "llm.base_url",
            &["SENTINEL_LLM_BASE_URL"],
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        field("llm.api_key", &["SENTINEL_LLM_API_KEY"], llm_api_key.to_string()),
        field(
            "llm.timeout_secs",
            &["SENTINEL_LLM_TIMEOUT_SECS"],
            config.llm.timeout_secs.to_string(),
        ),
        field(
            "server.bind_address",
            &["SENTINEL_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        field("server.port", &["SENTINEL_SERVER_PORT"], config.server.port.to_string()),
        field(
            "server.graceful_shutdown_secs",
            &["SENTINEL_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            config.server.graceful_shutdown_secs.to_string(),
        ),
        field(
            "assets.models_path",
            &["SENTINEL_ASSETS_MODELS_PATH"],
            config.assets.models_path.display().to_string(),
        ),
        field("assets.policy_path", &["SENTINEL_ASSETS_POLICY_PATH"], policy_path),
        field(
            "pipeline.default_tolerance",
            &["SENTINEL_PIPELINE_DEFAULT_TOLERANCE"],
            config.pipeline.default_tolerance.to_string(),
        ),
        field(
            "pipeline.default_premise",
            &["SENTINEL_PIPELINE_DEFAULT_PREMISE"],
            config.pipeline.default_premise.clone(),
        ),
        field(
            "pipeline.east_region",
            &["SENTINEL_PIPELINE_EAST_REGION"],
            config.pipeline.east_region.clone(),
        ),
        field(
            "pipeline.data_cutoff",
            &["SENTINEL_PIPELINE_DATA_CUTOFF"],
            config.pipeline.data_cutoff.to_string(),
        ),
        field(
            "pipeline.history_limit",
            &["SENTINEL_PIPELINE_HISTORY_LIMIT"],
            config.pipeline.history_limit.to_string(),
        ),
        field(
            "logging.level",
            &["SENTINEL_LOGGING_LEVEL", "SENTINEL_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["SENTINEL_LOGGING_FORMAT", "SENTINEL_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ]
}

fn field(key_path: &'static str, env_keys: &'static [&'static str], value: String) -> Field {
    Field { key_path, env_keys, value }
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
    let from_env = env_keys.iter().find(|env_key| {
        env::var(env_key).map(|value| !value.trim().is_empty()).unwrap_or(false)
    });
    if let Some(env_key) = from_env {
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
