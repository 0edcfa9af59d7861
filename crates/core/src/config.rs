use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub knowledge: KnowledgeConfig,
    pub workflows: WorkflowConfig,
    pub auth: AuthConfig,
    pub conversation: ConversationConfig,
    pub content: ContentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Question-answering knowledge base used when input matches no menu option.
#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<SecretString>,
    pub project_name: Option<String>,
    pub deployment_name: Option<String>,
    pub api_version: String,
    pub timeout_secs: u64,
}

/// Workflow-automation trigger URLs. They embed signatures, so they are secrets.
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub unresolved_query_url: Option<SecretString>,
    pub course_request_url: Option<SecretString>,
    pub anonymous_complaint_url: Option<SecretString>,
    pub qna_log_url: Option<SecretString>,
    pub timeout_secs: u64,
    pub utc_offset_hours: i32,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub max_login_attempts: u32,
    pub lockout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ConversationConfig {
    pub collaborator_timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ContentConfig {
    pub path: Option<PathBuf>,
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
    pub server_port: Option<u16>,
    pub knowledge_endpoint: Option<String>,
    pub knowledge_api_key: Option<String>,
    pub content_path: Option<PathBuf>,
    pub auth_max_login_attempts: Option<u32>,
    pub auth_lockout_secs: Option<u64>,
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
                url: "sqlite://minerbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            knowledge: KnowledgeConfig {
                endpoint: None,
                api_key: None,
                project_name: None,
                deployment_name: None,
                api_version: "2021-10-01".to_string(),
                timeout_secs: 10,
            },
            workflows: WorkflowConfig {
                unresolved_query_url: None,
                course_request_url: None,
                anonymous_complaint_url: None,
                qna_log_url: None,
                timeout_secs: 10,
                utc_offset_hours: -4,
            },
            auth: AuthConfig { max_login_attempts: 3, lockout_secs: 60 },
            conversation: ConversationConfig { collaborator_timeout_secs: 10 },
            content: ContentConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3978,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AuthConfig {
    pub fn lockout_window(&self) -> Duration {
        Duration::from_secs(self.lockout_secs)
    }
}

impl ConversationConfig {
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }
}

impl KnowledgeConfig {
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("minerbot.toml"));
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

        if let Some(knowledge) = patch.knowledge {
            if let Some(endpoint) = knowledge.endpoint {
                self.knowledge.endpoint = Some(endpoint);
            }
            if let Some(api_key) = knowledge.api_key {
                self.knowledge.api_key = Some(secret_value(api_key));
            }
            if let Some(project_name) = knowledge.project_name {
                self.knowledge.project_name = Some(project_name);
            }
            if let Some(deployment_name) = knowledge.deployment_name {
                self.knowledge.deployment_name = Some(deployment_name);
            }
            if let Some(api_version) = knowledge.api_version {
                self.knowledge.api_version = api_version;
            }
            if let Some(timeout_secs) = knowledge.timeout_secs {
                self.knowledge.timeout_secs = timeout_secs;
            }
        }

        if let Some(workflows) = patch.workflows {
            if let Some(url) = workflows.unresolved_query_url {
                self.workflows.unresolved_query_url = Some(secret_value(url));
            }
            if let Some(url) = workflows.course_request_url {
                self.workflows.course_request_url = Some(secret_value(url));
            }
            if let Some(url) = workflows.anonymous_complaint_url {
                self.workflows.anonymous_complaint_url = Some(secret_value(url));
            }
            if let Some(url) = workflows.qna_log_url {
                self.workflows.qna_log_url = Some(secret_value(url));
            }
            if let Some(timeout_secs) = workflows.timeout_secs {
                self.workflows.timeout_secs = timeout_secs;
            }
            if let Some(utc_offset_hours) = workflows.utc_offset_hours {
                self.workflows.utc_offset_hours = utc_offset_hours;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(max_login_attempts) = auth.max_login_attempts {
                self.auth.max_login_attempts = max_login_attempts;
            }
            if let Some(lockout_secs) = auth.lockout_secs {
                self.auth.lockout_secs = lockout_secs;
            }
        }

        if let Some(conversation) = patch.conversation {
            if let Some(timeout_secs) = conversation.collaborator_timeout_secs {
                self.conversation.collaborator_timeout_secs = timeout_secs;
            }
        }

        if let Some(content) = patch.content {
            if let Some(path) = content.path {
                self.content.path = Some(path);
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
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("MINERBOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("MINERBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("MINERBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("MINERBOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("MINERBOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MINERBOT_KNOWLEDGE_ENDPOINT") {
            self.knowledge.endpoint = Some(value);
        }
        if let Some(value) = read_env("MINERBOT_KNOWLEDGE_API_KEY") {
            self.knowledge.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("MINERBOT_KNOWLEDGE_PROJECT_NAME") {
            self.knowledge.project_name = Some(value);
        }
        if let Some(value) = read_env("MINERBOT_KNOWLEDGE_DEPLOYMENT_NAME") {
            self.knowledge.deployment_name = Some(value);
        }
        if let Some(value) = read_env("MINERBOT_KNOWLEDGE_API_VERSION") {
            self.knowledge.api_version = value;
        }
        if let Some(value) = read_env("MINERBOT_KNOWLEDGE_TIMEOUT_SECS") {
            self.knowledge.timeout_secs = parse_u64("MINERBOT_KNOWLEDGE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MINERBOT_WORKFLOWS_UNRESOLVED_QUERY_URL") {
            self.workflows.unresolved_query_url = Some(secret_value(value));
        }
        if let Some(value) = read_env("MINERBOT_WORKFLOWS_COURSE_REQUEST_URL") {
            self.workflows.course_request_url = Some(secret_value(value));
        }
        if let Some(value) = read_env("MINERBOT_WORKFLOWS_ANONYMOUS_COMPLAINT_URL") {
            self.workflows.anonymous_complaint_url = Some(secret_value(value));
        }
        if let Some(value) = read_env("MINERBOT_WORKFLOWS_QNA_LOG_URL") {
            self.workflows.qna_log_url = Some(secret_value(value));
        }
        if let Some(value) = read_env("MINERBOT_WORKFLOWS_TIMEOUT_SECS") {
            self.workflows.timeout_secs = parse_u64("MINERBOT_WORKFLOWS_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("MINERBOT_WORKFLOWS_UTC_OFFSET_HOURS") {
            self.workflows.utc_offset_hours =
                parse_i32("MINERBOT_WORKFLOWS_UTC_OFFSET_HOURS", &value)?;
        }

        if let Some(value) = read_env("MINERBOT_AUTH_MAX_LOGIN_ATTEMPTS") {
            self.auth.max_login_attempts = parse_u32("MINERBOT_AUTH_MAX_LOGIN_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("MINERBOT_AUTH_LOCKOUT_SECS") {
            self.auth.lockout_secs = parse_u64("MINERBOT_AUTH_LOCKOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MINERBOT_CONVERSATION_COLLABORATOR_TIMEOUT_SECS") {
            self.conversation.collaborator_timeout_secs =
                parse_u64("MINERBOT_CONVERSATION_COLLABORATOR_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("MINERBOT_CONTENT_PATH") {
            self.content.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("MINERBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("MINERBOT_SERVER_PORT") {
            self.server.port = parse_u16("MINERBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("MINERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("MINERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("MINERBOT_LOGGING_LEVEL").or_else(|| read_env("MINERBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MINERBOT_LOGGING_FORMAT").or_else(|| read_env("MINERBOT_LOG_FORMAT"));
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
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(endpoint) = overrides.knowledge_endpoint {
            self.knowledge.endpoint = Some(endpoint);
        }
        if let Some(api_key) = overrides.knowledge_api_key {
            self.knowledge.api_key = Some(secret_value(api_key));
        }
        if let Some(path) = overrides.content_path {
            self.content.path = Some(path);
        }
        if let Some(max_login_attempts) = overrides.auth_max_login_attempts {
            self.auth.max_login_attempts = max_login_attempts;
        }
        if let Some(lockout_secs) = overrides.auth_lockout_secs {
            self.auth.lockout_secs = lockout_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_knowledge(&self.knowledge)?;
        validate_workflows(&self.workflows)?;
        validate_auth(&self.auth)?;
        validate_conversation(&self.conversation)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("minerbot.toml"), PathBuf::from("config/minerbot.toml")]
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

fn validate_knowledge(knowledge: &KnowledgeConfig) -> Result<(), ConfigError> {
    if knowledge.timeout_secs == 0 || knowledge.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "knowledge.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    let Some(endpoint) = &knowledge.endpoint else {
        return Ok(());
    };

    if !is_http_url(endpoint) {
        return Err(ConfigError::Validation(
            "knowledge.endpoint must start with http:// or https://".to_string(),
        ));
    }

    let missing_key = knowledge
        .api_key
        .as_ref()
        .map(|value| value.expose_secret().trim().is_empty())
        .unwrap_or(true);
    if missing_key {
        return Err(ConfigError::Validation(
            "knowledge.api_key is required when knowledge.endpoint is set".to_string(),
        ));
    }

    let blank = |value: &Option<String>| value.as_ref().map(|v| v.trim().is_empty()).unwrap_or(true);
    if blank(&knowledge.project_name) || blank(&knowledge.deployment_name) {
        return Err(ConfigError::Validation(
            "knowledge.project_name and knowledge.deployment_name are required when knowledge.endpoint is set"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_workflows(workflows: &WorkflowConfig) -> Result<(), ConfigError> {
    let urls = [
        ("workflows.unresolved_query_url", &workflows.unresolved_query_url),
        ("workflows.course_request_url", &workflows.course_request_url),
        ("workflows.anonymous_complaint_url", &workflows.anonymous_complaint_url),
        ("workflows.qna_log_url", &workflows.qna_log_url),
    ];
    for (key, url) in urls {
        if let Some(url) = url {
            if !is_http_url(url.expose_secret()) {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with http:// or https://"
                )));
            }
        }
    }

    if workflows.timeout_secs == 0 || workflows.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "workflows.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(-12..=14).contains(&workflows.utc_offset_hours) {
        return Err(ConfigError::Validation(
            "workflows.utc_offset_hours must be in range -12..=14".to_string(),
        ));
    }

    Ok(())
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
    if auth.max_login_attempts == 0 || auth.max_login_attempts > 20 {
        return Err(ConfigError::Validation(
            "auth.max_login_attempts must be in range 1..=20".to_string(),
        ));
    }

    if auth.lockout_secs == 0 || auth.lockout_secs > 86_400 {
        return Err(ConfigError::Validation(
            "auth.lockout_secs must be in range 1..=86400".to_string(),
        ));
    }

    Ok(())
}

fn validate_conversation(conversation: &ConversationConfig) -> Result<(), ConfigError> {
    if conversation.collaborator_timeout_secs == 0 || conversation.collaborator_timeout_secs > 300
    {
        return Err(ConfigError::Validation(
            "conversation.collaborator_timeout_secs must be in range 1..=300".to_string(),
        ));
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

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i32(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.parse::<i32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    knowledge: Option<KnowledgePatch>,
    workflows: Option<WorkflowPatch>,
    auth: Option<AuthPatch>,
    conversation: Option<ConversationPatch>,
    content: Option<ContentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    endpoint: Option<String>,
    api_key: Option<String>,
    project_name: Option<String>,
    deployment_name: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowPatch {
    unresolved_query_url: Option<String>,
    course_request_url: Option<String>,
    anonymous_complaint_url: Option<String>,
    qna_log_url: Option<String>,
    timeout_secs: Option<u64>,
    utc_offset_hours: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    max_login_attempts: Option<u32>,
    lockout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPatch {
    collaborator_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentPatch {
    path: Option<PathBuf>,
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

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.auth.max_login_attempts == 3, "default lockout threshold is three")?;
        ensure(config.auth.lockout_secs == 60, "default lockout window is one minute")?;
        ensure(!config.knowledge.is_enabled(), "knowledge base is disabled without an endpoint")?;
        ensure(config.server.port == 3978, "default port matches the bot host")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_KNOWLEDGE_KEY", "kb-key-from-env");
        env::set_var("TEST_COMPLAINT_FLOW", "https://flows.example.test/complaint?sig=abc");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("minerbot.toml");
            fs::write(
                &path,
                r#"
[knowledge]
endpoint = "https://language.example.test"
api_key = "${TEST_KNOWLEDGE_KEY}"
project_name = "hr-faq"
deployment_name = "production"

[workflows]
anonymous_complaint_url = "${TEST_COMPLAINT_FLOW}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config.knowledge.api_key.as_ref().map(|key| key.expose_secret());
            ensure(api_key == Some("kb-key-from-env"), "api key should come from environment")?;
            let complaint_url =
                config.workflows.anonymous_complaint_url.as_ref().map(|url| url.expose_secret());
            ensure(
                complaint_url == Some("https://flows.example.test/complaint?sig=abc"),
                "complaint flow url should come from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_KNOWLEDGE_KEY", "TEST_COMPLAINT_FLOW"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MINERBOT_LOG_LEVEL", "warn");
        env::set_var("MINERBOT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["MINERBOT_LOG_LEVEL", "MINERBOT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MINERBOT_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("MINERBOT_AUTH_LOCKOUT_SECS", "120");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("minerbot.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[auth]
max_login_attempts = 2
lockout_secs = 30

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.auth.max_login_attempts == 2, "file lockout threshold should apply")?;
            ensure(config.auth.lockout_secs == 120, "env lockout window should win over file")?;
            Ok(())
        })();

        clear_vars(&["MINERBOT_DATABASE_URL", "MINERBOT_AUTH_LOCKOUT_SECS"]);
        result
    }

    #[test]
    fn knowledge_endpoint_without_key_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                knowledge_endpoint: Some("https://language.example.test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("knowledge.api_key")
        );
        ensure(has_message, "validation failure should mention knowledge.api_key")
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MINERBOT_AUTH_MAX_LOGIN_ATTEMPTS", "three");
        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid override to be rejected".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "MINERBOT_AUTH_MAX_LOGIN_ATTEMPTS", "key should be reported")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["MINERBOT_AUTH_MAX_LOGIN_ATTEMPTS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("MINERBOT_KNOWLEDGE_ENDPOINT", "https://language.example.test");
        env::set_var("MINERBOT_KNOWLEDGE_API_KEY", "kb-secret-value");
        env::set_var("MINERBOT_KNOWLEDGE_PROJECT_NAME", "hr-faq");
        env::set_var("MINERBOT_KNOWLEDGE_DEPLOYMENT_NAME", "production");
        env::set_var("MINERBOT_WORKFLOWS_QNA_LOG_URL", "https://flows.example.test/qna?sig=s3cr3t");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("kb-secret-value"), "debug output should not contain api key")?;
            ensure(!debug.contains("sig=s3cr3t"), "debug output should not contain flow urls")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "MINERBOT_KNOWLEDGE_ENDPOINT",
            "MINERBOT_KNOWLEDGE_API_KEY",
            "MINERBOT_KNOWLEDGE_PROJECT_NAME",
            "MINERBOT_KNOWLEDGE_DEPLOYMENT_NAME",
            "MINERBOT_WORKFLOWS_QNA_LOG_URL",
        ]);
        result
    }
}
