use std::sync::Arc;

use minerbot_connectors::{ConnectorError, HttpKnowledgeBase, WorkflowSubmissionSink};
use minerbot_core::collaborators::DisabledKnowledgeBase;
use minerbot_core::config::{AppConfig, ConfigError, ContentConfig, LoadOptions};
use minerbot_core::{
    ApplicationError, Collaborators, ContentTable, ConversationEngine, EngineSettings,
    KnowledgeBase,
};
use minerbot_db::{
    connect_from_config, migrations, BcryptPasswordVerifier, DbPool,
    SqlConversationStateRepository, SqlEmployeeDirectory,
};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<ConversationEngine>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("connector setup failed: {0}")]
    Connector(#[from] ConnectorError),
    #[error("content table could not be loaded: {0}")]
    Content(#[source] ApplicationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let engine = Arc::new(build_engine(&config, db_pool.clone())?);
    Ok(Application { config, db_pool, engine })
}

/// Wires the SQL store and directory, the bcrypt verifier, the HTTP connectors and
/// the content table into a conversation engine.
pub fn build_engine(
    config: &AppConfig,
    db_pool: DbPool,
) -> Result<ConversationEngine, BootstrapError> {
    let knowledge: Arc<dyn KnowledgeBase> = match HttpKnowledgeBase::from_config(&config.knowledge)? {
        Some(client) => Arc::new(client),
        None => {
            warn!(
                event_name = "system.bootstrap.knowledge_disabled",
                correlation_id = "bootstrap",
                "knowledge base endpoint not configured; fallback answers disabled"
            );
            Arc::new(DisabledKnowledgeBase)
        }
    };

    let collaborators = Collaborators {
        directory: Arc::new(SqlEmployeeDirectory::new(db_pool.clone())),
        verifier: Arc::new(BcryptPasswordVerifier),
        knowledge,
        sink: Arc::new(WorkflowSubmissionSink::from_config(&config.workflows)?),
        store: Arc::new(SqlConversationStateRepository::new(db_pool)),
    };

    let content = load_content(&config.content)?;
    info!(
        event_name = "system.bootstrap.content_loaded",
        correlation_id = "bootstrap",
        entries = content.len(),
        custom = config.content.path.is_some(),
        "content table ready"
    );

    Ok(ConversationEngine::new(
        collaborators,
        Arc::new(content),
        EngineSettings::from_config(config),
    ))
}

pub fn load_content(config: &ContentConfig) -> Result<ContentTable, BootstrapError> {
    match &config.path {
        Some(path) => ContentTable::from_path(path).map_err(BootstrapError::Content),
        None => Ok(ContentTable::standard()),
    }
}
