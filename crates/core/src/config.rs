use std::env;
use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub engine: EngineConfig,
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
    pub model: String,
    pub api_key: Option<SecretString>,
    /// Bounded wait for a terminal streaming signal before falling back to
    /// the partial buffer.
    pub stream_timeout_secs: u64,
}

/// Engine tunables. Defaults match the documented behavior of the engine;
/// changing them changes the guardrail envelope, so they are config, not
/// constants buried in executors.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Maximum follow-up recursion depth a session chain may reach.
    pub follow_up_depth_limit: u32,
    /// Fallback assignee when a proposed agent id is not in the roster.
    pub default_agent_id: String,
    pub default_event_duration_minutes: i64,
    pub quote_number_prefix: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://conclave.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                stream_timeout_secs: 90,
            },
            engine: EngineConfig {
                follow_up_depth_limit: 2,
                default_agent_id: "agent-coordinator".to_string(),
                default_event_duration_minutes: 60,
                quote_number_prefix: "QT-".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string() },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    database: FileDatabase,
    #[serde(default)]
    llm: FileLlm,
    #[serde(default)]
    engine: FileEngine,
    #[serde(default)]
    logging: FileLogging,
}

#[derive(Debug, Default, Deserialize)]
struct FileDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLlm {
    model: Option<String>,
    api_key: Option<String>,
    stream_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileEngine {
    follow_up_depth_limit: Option<u32>,
    default_agent_id: Option<String>,
    default_event_duration_minutes: Option<i64>,
    quote_number_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogging {
    level: Option<String>,
}

impl AppConfig {
    /// Layered load: defaults, then the optional toml file, then
    /// `CONCLAVE_*` environment overrides.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path.or_else(default_config_path);
        if let Some(path) = path {
            if path.exists() {
                let raw = fs::read_to_string(&path)
                    .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
                let file: FileConfig = toml::from_str(&raw)
                    .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
                config.apply_file(file);
            }
        }

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(url) = file.database.url {
            self.database.url = url;
        }
        if let Some(max_connections) = file.database.max_connections {
            self.database.max_connections = max_connections;
        }
        if let Some(timeout_secs) = file.database.timeout_secs {
            self.database.timeout_secs = timeout_secs;
        }
        if let Some(model) = file.llm.model {
            self.llm.model = model;
        }
        if let Some(api_key) = file.llm.api_key {
            self.llm.api_key = Some(api_key.into());
        }
        if let Some(timeout) = file.llm.stream_timeout_secs {
            self.llm.stream_timeout_secs = timeout;
        }
        if let Some(limit) = file.engine.follow_up_depth_limit {
            self.engine.follow_up_depth_limit = limit;
        }
        if let Some(agent_id) = file.engine.default_agent_id {
            self.engine.default_agent_id = agent_id;
        }
        if let Some(minutes) = file.engine.default_event_duration_minutes {
            self.engine.default_event_duration_minutes = minutes;
        }
        if let Some(prefix) = file.engine.quote_number_prefix {
            self.engine.quote_number_prefix = prefix;
        }
        if let Some(level) = file.logging.level {
            self.logging.level = level;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("CONCLAVE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(level) = env::var("CONCLAVE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(model) = env::var("CONCLAVE_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(api_key) = env::var("CONCLAVE_LLM_API_KEY") {
            self.llm.api_key = Some(api_key.into());
        }
        if let Ok(agent_id) = env::var("CONCLAVE_DEFAULT_AGENT_ID") {
            self.engine.default_agent_id = agent_id;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.engine.default_agent_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "engine.default_agent_id must not be empty".to_string(),
            ));
        }
        if self.engine.default_event_duration_minutes <= 0 {
            return Err(ConfigError::Validation(
                "engine.default_event_duration_minutes must be positive".to_string(),
            ));
        }
        if self.llm.stream_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "llm.stream_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("CONCLAVE_CONFIG").map(PathBuf::from).ok()
}
