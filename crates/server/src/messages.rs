//! Message webhook: `POST /api/messages`.
//!
//! Each inbound activity names its conversation. Turns of one conversation run
//! one at a time so their load/mutate/save cycles never interleave; different
//! conversations proceed concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use minerbot_core::{ConversationEngine, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    Message,
    ConversationStart,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundActivity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub conversation_id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub replies: Vec<String>,
    pub correlation_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: &'static str,
    pub correlation_id: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Per-conversation turn locks. An entry lives only while some turn holds or
/// waits for it.
#[derive(Default)]
pub struct TurnLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnLocks {
    /// Registers interest in `conversation_id`. The entry is released when the
    /// returned slot drops, including when the request future is cancelled.
    pub fn acquire(self: &Arc<Self>, conversation_id: &str) -> TurnSlot {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let handle = locks.entry(conversation_id.to_string()).or_default().clone();
        TurnSlot { locks: Arc::clone(self), conversation_id: conversation_id.to_string(), handle }
    }

    pub fn active(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

pub struct TurnSlot {
    locks: Arc<TurnLocks>,
    conversation_id: String,
    handle: Arc<tokio::sync::Mutex<()>>,
}

impl TurnSlot {
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.handle.lock().await
    }
}

impl Drop for TurnSlot {
    fn drop(&mut self) {
        let mut locks = self.locks.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // map entry plus this slot
        if Arc::strong_count(&self.handle) == 2 {
            locks.remove(&self.conversation_id);
        }
    }
}

#[derive(Clone)]
pub struct MessagesState {
    engine: Arc<ConversationEngine>,
    turns: Arc<TurnLocks>,
}

impl MessagesState {
    pub fn new(engine: Arc<ConversationEngine>) -> Self {
        Self { engine, turns: Arc::new(TurnLocks::default()) }
    }
}

pub fn router(engine: Arc<ConversationEngine>) -> Router {
    router_with_state(MessagesState::new(engine))
}

pub fn router_with_state(state: MessagesState) -> Router {
    Router::new().route("/api/messages", post(post_message)).with_state(state)
}

pub async fn post_message(
    State(state): State<MessagesState>,
    payload: Result<Json<InboundActivity>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let Json(activity) = payload.map_err(|rejection| {
        bad_request(format!("malformed activity: {}", rejection.body_text()))
    })?;

    let conversation_id = activity.conversation_id.trim();
    if conversation_id.is_empty() {
        return Err(bad_request("conversationId must not be empty".to_string()));
    }

    let result = {
        let slot = state.turns.acquire(conversation_id);
        let _turn = slot.lock().await;
        match activity.kind {
            ActivityKind::Message => {
                state.engine.handle_message(conversation_id, &activity.text).await
            }
            ActivityKind::ConversationStart => {
                state.engine.handle_conversation_start(conversation_id).await
            }
        }
    };

    match result {
        Ok(reply) => {
            debug!(
                event_name = "http.turn_replied",
                conversation_id = %reply.conversation_id,
                correlation_id = %reply.correlation_id,
                replies = reply.effects.replies().len()
            );
            Ok(Json(TurnResponse { replies: reply.messages(), correlation_id: reply.correlation_id }))
        }
        Err(error) => {
            let interface = error.into_interface(Uuid::new_v4().to_string());
            warn!(
                event_name = "http.turn_failed",
                conversation_id = %conversation_id,
                correlation_id = %interface.correlation_id(),
                error = %interface,
                "turn failed"
            );
            Err(interface_response(interface))
        }
    }
}

fn bad_request(message: String) -> ApiError {
    let interface =
        InterfaceError::BadRequest { message, correlation_id: Uuid::new_v4().to_string() };
    warn!(
        event_name = "http.request_rejected",
        correlation_id = %interface.correlation_id(),
        error = %interface
    );
    interface_response(interface)
}

fn interface_response(error: InterfaceError) -> ApiError {
    let status = match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.user_message(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}
