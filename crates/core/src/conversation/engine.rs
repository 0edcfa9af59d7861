use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::collaborators::{
    bounded, ConversationStore, EmployeeDirectory, KnowledgeBase, PasswordVerifier,
    SubmissionKind, SubmissionPayload, SubmissionSink,
};
use crate::config::AppConfig;
use crate::conversation::auth::{AuthMenu, LockoutPolicy};
use crate::conversation::capture::CaptureHandler;
use crate::conversation::dispatcher::{MenuHandler, OptionMenu, UserInput};
use crate::conversation::messages;
use crate::conversation::navigation::Navigator;
use crate::conversation::state::{default_state, ConversationId, ConversationState};
use crate::conversation::turn::{DispatchResult, Effect, Effects, TurnContext};
use crate::domain::content::ContentResolver;
use crate::domain::menu::MenuId;
use crate::errors::ApplicationError;

const HOME_COMMANDS: [&str; 2] = ["menu", "menú"];
const ANONYMOUS_ORIGIN: &str = "No autenticado";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub collaborator_timeout: Duration,
    pub lockout: LockoutPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { collaborator_timeout: Duration::from_secs(10), lockout: LockoutPolicy::default() }
    }
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            collaborator_timeout: config.conversation.collaborator_timeout(),
            lockout: LockoutPolicy::new(
                config.auth.max_login_attempts,
                config.auth.lockout_window(),
            ),
        }
    }
}

/// Everything the engine talks to outside its own process memory.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn EmployeeDirectory>,
    pub verifier: Arc<dyn PasswordVerifier>,
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub sink: Arc<dyn SubmissionSink>,
    pub store: Arc<dyn ConversationStore>,
}

/// Outcome of one turn: what to send back and the state that was persisted.
#[derive(Clone, Debug)]
pub struct TurnReply {
    pub conversation_id: ConversationId,
    pub correlation_id: String,
    pub effects: Effects,
    pub state: ConversationState,
}

impl TurnReply {
    pub fn messages(&self) -> Vec<String> {
        self.effects.replies()
    }
}

/// Runs turns for any number of conversations. Holds no per-conversation state;
/// callers serialise turns of the same conversation.
#[derive(Clone)]
pub struct ConversationEngine {
    collaborators: Collaborators,
    content: Arc<dyn ContentResolver>,
    settings: EngineSettings,
}

impl ConversationEngine {
    pub fn new(
        collaborators: Collaborators,
        content: Arc<dyn ContentResolver>,
        settings: EngineSettings,
    ) -> Self {
        Self { collaborators, content, settings }
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub async fn handle_message(
        &self,
        conversation_id: &str,
        raw_text: &str,
    ) -> Result<TurnReply, ApplicationError> {
        self.handle_message_at(conversation_id, raw_text, Utc::now()).await
    }

    pub async fn handle_message_at(
        &self,
        conversation_id: &str,
        raw_text: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnReply, ApplicationError> {
        let ctx = TurnContext::new(ConversationId::new(conversation_id), now);
        let mut state = self.load_state(&ctx).await?;
        let effects = self.process_turn(&ctx, raw_text, &mut state).await;
        self.save_state(&ctx, &state).await?;

        debug!(
            event_name = "conversation.turn_completed",
            conversation_id = %ctx.conversation_id,
            correlation_id = %ctx.correlation_id,
            menu_id = %state.current_menu_id,
            stack_depth = state.menu_stack.len(),
            "turn completed"
        );
        Ok(TurnReply {
            conversation_id: ctx.conversation_id,
            correlation_id: ctx.correlation_id,
            effects,
            state,
        })
    }

    pub async fn handle_conversation_start(
        &self,
        conversation_id: &str,
    ) -> Result<TurnReply, ApplicationError> {
        self.handle_conversation_start_at(conversation_id, Utc::now()).await
    }

    pub async fn handle_conversation_start_at(
        &self,
        conversation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TurnReply, ApplicationError> {
        let ctx = TurnContext::new(ConversationId::new(conversation_id), now);
        let mut state = self.load_state(&ctx).await?;
        let navigator = Navigator::new(self.content.as_ref());
        let mut effects = Effects::new();

        state.reset_awaiting_states();
        if state.violates_auth_gate() {
            repair_auth_gate(&mut state);
            effects.push(Effect::StateRepaired);
        }

        let returning_name = state
            .employee_profile
            .as_ref()
            .filter(|_| state.is_authenticated)
            .map(|profile| profile.name.clone());
        match returning_name {
            Some(name) => {
                effects.reply(messages::welcome_back(&name));
                effects.extend(navigator.go_home(&mut state));
            }
            None => {
                effects.reply(messages::GREETING);
                effects.push(Effect::AuthenticationRequired);
                effects.reply(navigator.render(&state, MenuId::Auth));
            }
        }

        self.save_state(&ctx, &state).await?;
        info!(
            event_name = "conversation.started",
            conversation_id = %ctx.conversation_id,
            correlation_id = %ctx.correlation_id,
            authenticated = state.is_authenticated,
            "conversation opened"
        );
        Ok(TurnReply {
            conversation_id: ctx.conversation_id,
            correlation_id: ctx.correlation_id,
            effects,
            state,
        })
    }

    /// Applies one inbound message to `state`. Captures take priority, then the
    /// authentication gate, the global home command, the current menu and finally
    /// the knowledge base.
    pub async fn process_turn(
        &self,
        ctx: &TurnContext,
        raw_text: &str,
        state: &mut ConversationState,
    ) -> Effects {
        let navigator = Navigator::new(self.content.as_ref());
        let input = UserInput::parse(raw_text);

        if state.is_authenticated && state.awaiting_free_text.is_active() {
            let capture = CaptureHandler::new(
                self.collaborators.sink.as_ref(),
                &navigator,
                self.settings.collaborator_timeout,
            );
            return capture.handle(ctx, &input, state).await;
        }

        let mut effects = Effects::new();
        if state.violates_auth_gate() {
            warn!(
                event_name = "conversation.state_repaired",
                conversation_id = %ctx.conversation_id,
                correlation_id = %ctx.correlation_id,
                menu_id = %state.current_menu_id,
                "unauthenticated state outside the auth menu was reset"
            );
            repair_auth_gate(state);
            effects.push(Effect::StateRepaired);
            effects.push(Effect::AuthenticationRequired);
            effects.reply(messages::LOGIN_REQUIRED_TO_CONTINUE);
            effects.reply(navigator.render(state, MenuId::Auth));
            return effects;
        }
        if state.is_authenticated && state.current_menu_id == MenuId::Auth {
            state.pending_auth = None;
            state.menu_stack.clear();
            state.current_menu_id = MenuId::Main;
            effects.push(Effect::StateRepaired);
        }

        if HOME_COMMANDS.contains(&input.lowered.as_str()) {
            effects.extend(navigator.go_home(state));
            return effects;
        }

        if input.is_empty() && state.current_menu_id != MenuId::Auth {
            effects.reply(messages::EMPTY_MENU_INPUT);
            navigator.show_current(state, &mut effects);
            return effects;
        }

        let handler = self.handler_for(state.current_menu_id, &navigator);
        match handler.handle_input(ctx, input.trimmed, state).await {
            DispatchResult::Handled(handled) => effects.extend(handled),
            DispatchResult::Unhandled => {
                effects.extend(self.ask_knowledge_base(ctx, &input, state).await)
            }
        }
        effects
    }

    fn handler_for<'h>(
        &'h self,
        menu: MenuId,
        navigator: &'h Navigator<'h>,
    ) -> Box<dyn MenuHandler + 'h> {
        match menu {
            MenuId::Auth => Box::new(AuthMenu::new(
                self.collaborators.directory.as_ref(),
                self.collaborators.verifier.as_ref(),
                navigator,
                self.settings.lockout,
                self.settings.collaborator_timeout,
            )),
            other => Box::new(OptionMenu::new(other, navigator)),
        }
    }

    async fn ask_knowledge_base(
        &self,
        ctx: &TurnContext,
        input: &UserInput<'_>,
        state: &mut ConversationState,
    ) -> Effects {
        let mut effects = Effects::new();
        let answer = bounded(
            "knowledge_base.ask",
            self.settings.collaborator_timeout,
            self.collaborators.knowledge.ask(input.trimmed),
        )
        .await;

        match answer {
            Ok(Some(answer)) => {
                state.is_showing_content = false;
                effects.push(Effect::KnowledgeAnswered { found: true });
                effects.reply(answer.clone());
                self.log_interaction(ctx, state, input.trimmed, answer);
            }
            Ok(None) => {
                effects.push(Effect::KnowledgeAnswered { found: false });
                effects.reply(messages::KNOWLEDGE_NO_MATCH);
                self.log_interaction(
                    ctx,
                    state,
                    input.trimmed,
                    messages::KNOWLEDGE_NO_ANSWER_LOGGED.to_string(),
                );
            }
            Err(error) => {
                error!(
                    event_name = "knowledge.query_failed",
                    conversation_id = %ctx.conversation_id,
                    correlation_id = %ctx.correlation_id,
                    error_class = error.error_class(),
                    error = %error,
                    "knowledge base query failed"
                );
                effects.reply(messages::KNOWLEDGE_UNAVAILABLE);
                self.log_interaction(
                    ctx,
                    state,
                    input.trimmed,
                    messages::KNOWLEDGE_FAILURE_LOGGED.to_string(),
                );
            }
        }
        effects
    }

    /// Records the question and answer on the workflow sink without holding up the reply.
    fn log_interaction(
        &self,
        ctx: &TurnContext,
        state: &ConversationState,
        question: &str,
        answer: String,
    ) {
        let (site, area) = state
            .employee_profile
            .as_ref()
            .map(|profile| (profile.site.clone(), profile.area.clone()))
            .unwrap_or_else(|| (ANONYMOUS_ORIGIN.to_string(), ANONYMOUS_ORIGIN.to_string()));
        let mut payload = SubmissionPayload::new();
        payload.insert("sede".to_string(), site);
        payload.insert("area".to_string(), area);
        payload.insert("consulta".to_string(), question.to_string());
        payload.insert("respuesta".to_string(), answer);

        let sink = Arc::clone(&self.collaborators.sink);
        let limit = self.settings.collaborator_timeout;
        let conversation_id = ctx.conversation_id.clone();
        let correlation_id = ctx.correlation_id.clone();
        tokio::spawn(async move {
            let outcome =
                bounded("submission_sink.qna_log", limit, sink.submit(SubmissionKind::QnaLog, payload))
                    .await;
            if let Err(error) = outcome {
                warn!(
                    event_name = "knowledge.interaction_log_failed",
                    conversation_id = %conversation_id,
                    correlation_id = %correlation_id,
                    error_class = error.error_class(),
                    error = %error,
                    "question/answer log was not delivered"
                );
            }
        });
    }

    async fn load_state(&self, ctx: &TurnContext) -> Result<ConversationState, ApplicationError> {
        let loaded = bounded(
            "conversation_store.load",
            self.settings.collaborator_timeout,
            self.collaborators.store.load(&ctx.conversation_id),
        )
        .await;

        match loaded {
            Ok(state) => Ok(state.unwrap_or_else(default_state)),
            Err(error) => {
                error!(
                    event_name = "conversation.state_load_failed",
                    conversation_id = %ctx.conversation_id,
                    correlation_id = %ctx.correlation_id,
                    error_class = error.error_class(),
                    error = %error,
                    "conversation state could not be loaded"
                );
                Err(ApplicationError::Persistence(error.to_string()))
            }
        }
    }

    async fn save_state(
        &self,
        ctx: &TurnContext,
        state: &ConversationState,
    ) -> Result<(), ApplicationError> {
        let saved = bounded(
            "conversation_store.save",
            self.settings.collaborator_timeout,
            self.collaborators.store.save(&ctx.conversation_id, state),
        )
        .await;

        saved.map_err(|error| {
            error!(
                event_name = "conversation.state_save_failed",
                conversation_id = %ctx.conversation_id,
                correlation_id = %ctx.correlation_id,
                error_class = error.error_class(),
                error = %error,
                "conversation state could not be saved"
            );
            ApplicationError::Persistence(error.to_string())
        })
    }
}

/// Resets a conversation to the auth menu. Lockout counters survive the reset.
fn repair_auth_gate(state: &mut ConversationState) {
    let attempts = state.failed_login_attempts;
    let last_failed_attempt_at = state.last_failed_attempt_at;
    state.reset_for_auth();
    state.failed_login_attempts = attempts;
    state.last_failed_attempt_at = last_failed_attempt_at;
}
