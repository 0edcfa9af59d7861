pub mod bootstrap;
pub mod health;
pub mod messages;

use axum::Router;
use minerbot_db::DbPool;
use std::sync::Arc;

use minerbot_core::ConversationEngine;

/// Webhook plus health probe.
pub fn app_router(engine: Arc<ConversationEngine>, db_pool: DbPool) -> Router {
    messages::router(engine).merge(health::router(db_pool))
}
