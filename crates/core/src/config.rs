use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "sentinel.toml";
pub const NESTED_CONFIG_FILE: &str = "config/sentinel.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub assets: AssetsConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AssetsConfig {
    pub models_path: PathBuf,
    pub policy_path: Option<PathBuf>,
}

/// Numeric pipeline knobs. Passed by value into the pipeline at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tolerance floor used when a model key has no registered tolerance.
    pub default_tolerance: f64,
    pub default_premise: String,
    /// The single region priced against the east fuel series.
    pub east_region: String,
    pub data_cutoff: NaiveDate,
    pub history_limit: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
    Disabled,
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
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub server_port: Option<u16>,
    pub models_path: Option<PathBuf>,
    pub policy_path: Option<PathBuf>,
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

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_tolerance: 0.15,
            default_premise: "hypermarket".to_string(),
            east_region: "Sarawak".to_string(),
            data_cutoff: NaiveDate::from_ymd_opt(2025, 7, 28).unwrap_or_default(),
            history_limit: 180,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://sentinel.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Disabled,
                api_key: None,
                base_url: None,
                model: "gemini-1.5-flash".to_string(),
                timeout_secs: 10,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            assets: AssetsConfig {
                models_path: PathBuf::from("assets/price_models.json"),
                policy_path: None,
            },
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Disabled => "disabled",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|openai|ollama|disabled)"
            ))),
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
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

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
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

        if let Some(assets) = patch.assets {
            if let Some(models_path) = assets.models_path {
                self.assets.models_path = models_path;
            }
            if let Some(policy_path) = assets.policy_path {
                self.assets.policy_path = Some(policy_path);
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(default_tolerance) = pipeline.default_tolerance {
                self.pipeline.default_tolerance = default_tolerance;
            }
            if let Some(default_premise) = pipeline.default_premise {
                self.pipeline.default_premise = default_premise;
            }
            if let Some(east_region) = pipeline.east_region {
                self.pipeline.east_region = east_region;
            }
            if let Some(data_cutoff) = pipeline.data_cutoff {
                self.pipeline.data_cutoff = data_cutoff;
            }
            if let Some(history_limit) = pipeline.history_limit {
                self.pipeline.history_limit = history_limit;
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
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SENTINEL_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SENTINEL_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SENTINEL_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SENTINEL_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SENTINEL_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SENTINEL_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SENTINEL_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SENTINEL_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SENTINEL_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SENTINEL_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SENTINEL_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SENTINEL_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SENTINEL_SERVER_PORT") {
            self.server.port = parse_u16("SENTINEL_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SENTINEL_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SENTINEL_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SENTINEL_ASSETS_MODELS_PATH") {
            self.assets.models_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("SENTINEL_ASSETS_POLICY_PATH") {
            self.assets.policy_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("SENTINEL_PIPELINE_DEFAULT_TOLERANCE") {
            self.pipeline.default_tolerance =
                parse_f64("SENTINEL_PIPELINE_DEFAULT_TOLERANCE", &value)?;
        }
        if let Some(value) = read_env("SENTINEL_PIPELINE_DEFAULT_PREMISE") {
            self.pipeline.default_premise = value;
        }
        if let Some(value) = read_env("SENTINEL_PIPELINE_EAST_REGION") {
            self.pipeline.east_region = value;
        }
        if let Some(value) = read_env("SENTINEL_PIPELINE_DATA_CUTOFF") {
            self.pipeline.data_cutoff = parse_date("SENTINEL_PIPELINE_DATA_CUTOFF", &value)?;
        }
        if let Some(value) = read_env("SENTINEL_PIPELINE_HISTORY_LIMIT") {
            self.pipeline.history_limit = parse_usize("SENTINEL_PIPELINE_HISTORY_LIMIT", &value)?;
        }

        let log_level =
            read_env("SENTINEL_LOGGING_LEVEL").or_else(|| read_env("SENTINEL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SENTINEL_LOGGING_FORMAT").or_else(|| read_env("SENTINEL_LOG_FORMAT"));
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
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(models_path) = overrides.models_path {
            self.assets.models_path = models_path;
        }
        if let Some(policy_path) = overrides.policy_path {
            self.assets.policy_path = Some(policy_path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_assets(&self.assets)?;
        validate_pipeline(&self.pipeline)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The file `AppConfig::load` would read for the given explicit path, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
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

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::Gemini | LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(format!(
                    "llm.api_key is required for the {} provider (set SENTINEL_LLM_API_KEY)",
                    llm.provider.as_str()
                )));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
        LlmProvider::Disabled => {}
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
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

fn validate_assets(assets: &AssetsConfig) -> Result<(), ConfigError> {
    if assets.models_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("assets.models_path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if !pipeline.default_tolerance.is_finite() || pipeline.default_tolerance < 0.0 {
        return Err(ConfigError::Validation(
            "pipeline.default_tolerance must be a non-negative number".to_string(),
        ));
    }

    if pipeline.default_premise.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pipeline.default_premise must not be empty".to_string(),
        ));
    }

    if pipeline.east_region.trim().is_empty() {
        return Err(ConfigError::Validation("pipeline.east_region must not be empty".to_string()));
    }

    if pipeline.history_limit == 0 {
        return Err(ConfigError::Validation(
            "pipeline.history_limit must be greater than zero".to_string(),
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
    value.trim().parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    assets: Option<AssetsPatch>,
    pipeline: Option<PipelinePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetsPatch {
    models_path: Option<PathBuf>,
    policy_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    default_tolerance: Option<f64>,
    default_premise: Option<String>,
    east_region: Option<String>,
    data_cutoff: Option<NaiveDate>,
    history_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
