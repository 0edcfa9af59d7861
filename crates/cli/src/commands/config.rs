use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use minerbot_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => render(&config),
        Err(error) => format!("config validation failed: {error}"),
    }
}

/// Effective configuration, one line per key, with secrets redacted.
pub fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, Some(env_key), config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "MINERBOT_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "MINERBOT_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "MINERBOT_DATABASE_TIMEOUT_SECS",
        ),
        ("knowledge.endpoint", optional(config.knowledge.endpoint.as_deref()), "MINERBOT_KNOWLEDGE_ENDPOINT"),
        ("knowledge.api_key", redact_secret(config.knowledge.api_key.as_ref()), "MINERBOT_KNOWLEDGE_API_KEY"),
        (
            "knowledge.project_name",
            optional(config.knowledge.project_name.as_deref()),
            "MINERBOT_KNOWLEDGE_PROJECT_NAME",
        ),
        (
            "knowledge.deployment_name",
            optional(config.knowledge.deployment_name.as_deref()),
            "MINERBOT_KNOWLEDGE_DEPLOYMENT_NAME",
        ),
        ("knowledge.api_version", config.knowledge.api_version.clone(), "MINERBOT_KNOWLEDGE_API_VERSION"),
        (
            "knowledge.timeout_secs",
            config.knowledge.timeout_secs.to_string(),
            "MINERBOT_KNOWLEDGE_TIMEOUT_SECS",
        ),
        (
            "workflows.unresolved_query_url",
            redact_secret(config.workflows.unresolved_query_url.as_ref()),
            "MINERBOT_WORKFLOWS_UNRESOLVED_QUERY_URL",
        ),
        (
            "workflows.course_request_url",
            redact_secret(config.workflows.course_request_url.as_ref()),
            "MINERBOT_WORKFLOWS_COURSE_REQUEST_URL",
        ),
        (
            "workflows.anonymous_complaint_url",
            redact_secret(config.workflows.anonymous_complaint_url.as_ref()),
            "MINERBOT_WORKFLOWS_ANONYMOUS_COMPLAINT_URL",
        ),
        (
            "workflows.qna_log_url",
            redact_secret(config.workflows.qna_log_url.as_ref()),
            "MINERBOT_WORKFLOWS_QNA_LOG_URL",
        ),
        (
            "workflows.timeout_secs",
            config.workflows.timeout_secs.to_string(),
            "MINERBOT_WORKFLOWS_TIMEOUT_SECS",
        ),
        (
            "workflows.utc_offset_hours",
            config.workflows.utc_offset_hours.to_string(),
            "MINERBOT_WORKFLOWS_UTC_OFFSET_HOURS",
        ),
        (
            "auth.max_login_attempts",
            config.auth.max_login_attempts.to_string(),
            "MINERBOT_AUTH_MAX_LOGIN_ATTEMPTS",
        ),
        ("auth.lockout_secs", config.auth.lockout_secs.to_string(), "MINERBOT_AUTH_LOCKOUT_SECS"),
        (
            "conversation.collaborator_timeout_secs",
            config.conversation.collaborator_timeout_secs.to_string(),
            "MINERBOT_CONVERSATION_COLLABORATOR_TIMEOUT_SECS",
        ),
        (
            "content.path",
            config
                .content
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<built-in>".to_string()),
            "MINERBOT_CONTENT_PATH",
        ),
        ("server.bind_address", config.server.bind_address.clone(), "MINERBOT_SERVER_BIND_ADDRESS"),
        ("server.port", config.server.port.to_string(), "MINERBOT_SERVER_PORT"),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            "MINERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ),
        ("logging.level", config.logging.level.clone(), "MINERBOT_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "MINERBOT_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        entries
            .into_iter()
            .map(|(key, value, env_key)| render_line(key, &value, source(key, env_key))),
    );
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("minerbot.toml"), PathBuf::from("config/minerbot.toml")]
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
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
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

fn optional(value: Option<&str>) -> String {
    value.unwrap_or("<unset>").to_string()
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        None => "<unset>".to_string(),
        Some(secret) if secret.expose_secret().trim().is_empty() => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}
