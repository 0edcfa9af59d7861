use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::collaborators::{bounded, EmployeeDirectory, PasswordVerifier};
use crate::conversation::messages;
use crate::conversation::navigation::Navigator;
use crate::conversation::state::ConversationState;
use crate::conversation::turn::{DispatchResult, Effect, Effects, TurnContext};
use crate::domain::menu::MenuId;

/// Brute-force protection: `max_attempts` failures lock the conversation for `window`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub window: chrono::Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, window: chrono::Duration::seconds(60) }
    }
}

impl LockoutPolicy {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        let window = chrono::Duration::from_std(window)
            .unwrap_or_else(|_| LockoutPolicy::default().window);
        Self { max_attempts, window }
    }

    /// Remaining lockout at `now`. An elapsed lockout resets the counters.
    pub fn check(&self, state: &mut ConversationState, now: DateTime<Utc>) -> Option<chrono::Duration> {
        if state.failed_login_attempts < self.max_attempts {
            return None;
        }

        let remaining = state
            .last_failed_attempt_at
            .map(|last| self.window - (now - last))
            .filter(|remaining| *remaining > chrono::Duration::zero());
        if remaining.is_none() {
            state.clear_failed_logins();
        }
        remaining
    }

    pub fn is_exhausted(&self, state: &ConversationState) -> bool {
        state.failed_login_attempts >= self.max_attempts
    }
}

fn ceil_secs(duration: chrono::Duration) -> i64 {
    let millis = duration.num_milliseconds().max(0);
    (millis + 999) / 1000
}

/// Two-step login: identifier lookup, then password verification.
pub struct AuthMenu<'a> {
    directory: &'a dyn EmployeeDirectory,
    verifier: &'a dyn PasswordVerifier,
    navigator: &'a Navigator<'a>,
    policy: LockoutPolicy,
    timeout: Duration,
}

impl<'a> AuthMenu<'a> {
    pub fn new(
        directory: &'a dyn EmployeeDirectory,
        verifier: &'a dyn PasswordVerifier,
        navigator: &'a Navigator<'a>,
        policy: LockoutPolicy,
        timeout: Duration,
    ) -> Self {
        Self { directory, verifier, navigator, policy, timeout }
    }

    async fn identifier_step(
        &self,
        ctx: &TurnContext,
        identifier: &str,
        state: &mut ConversationState,
    ) -> Effects {
        let mut effects = Effects::new();
        if identifier.is_empty() {
            effects.reply(messages::EMPTY_IDENTIFIER);
            return effects;
        }

        let lookup = bounded(
            "employee_directory.lookup",
            self.timeout,
            self.directory.lookup_by_identifier(identifier),
        )
        .await;

        match lookup {
            Ok(Some(employee)) if employee.has_credential() => {
                state.pending_auth = Some(employee);
                effects.reply(messages::PASSWORD_PROMPT);
            }
            Ok(Some(employee)) => {
                warn!(
                    event_name = "auth.credential_missing",
                    conversation_id = %ctx.conversation_id,
                    correlation_id = %ctx.correlation_id,
                    employee_id = %employee.id,
                    "employee has no credential hash configured"
                );
                effects.reply(messages::NO_CREDENTIAL_CONFIGURED);
            }
            Ok(None) => {
                state.record_failed_login(ctx.now);
                self.report_rejection(ctx, state, messages::EMPLOYEE_NOT_FOUND, &mut effects);
            }
            Err(error) => {
                error!(
                    event_name = "auth.lookup_failed",
                    conversation_id = %ctx.conversation_id,
                    correlation_id = %ctx.correlation_id,
                    error_class = error.error_class(),
                    error = %error,
                    "employee directory lookup failed"
                );
                effects.reply(messages::LOOKUP_FAILED);
            }
        }

        effects
    }

    async fn password_step(
        &self,
        ctx: &TurnContext,
        password: &str,
        state: &mut ConversationState,
    ) -> Effects {
        let mut effects = Effects::new();
        let Some(pending) = state.pending_auth.clone() else {
            effects.reply(messages::IDENTIFIER_PROMPT);
            return effects;
        };
        if password.is_empty() {
            effects.reply(messages::EMPTY_PASSWORD);
            return effects;
        }
        let stored_hash = pending.credential_hash.clone().unwrap_or_default();

        let verified = bounded(
            "password_verifier.verify",
            self.timeout,
            self.verifier.verify(password, &stored_hash),
        )
        .await;

        match verified {
            Ok(true) => {
                state.sign_in(&pending);
                info!(
                    event_name = "auth.login_succeeded",
                    conversation_id = %ctx.conversation_id,
                    correlation_id = %ctx.correlation_id,
                    employee_id = %pending.id,
                    "employee authenticated"
                );
                effects.push(Effect::Authenticated { employee_id: pending.id.clone() });
                effects.reply(messages::login_succeeded(pending.first_name.trim()));
                effects.extend(self.navigator.enter_main(state));
            }
            Ok(false) => {
                state.record_failed_login(ctx.now);
                state.pending_auth = None;
                self.report_rejection(ctx, state, messages::WRONG_PASSWORD, &mut effects);
            }
            Err(error) => {
                error!(
                    event_name = "auth.verification_failed",
                    conversation_id = %ctx.conversation_id,
                    correlation_id = %ctx.correlation_id,
                    error_class = error.error_class(),
                    error = %error,
                    "password verification failed"
                );
                effects.reply(messages::VERIFICATION_FAILED);
            }
        }

        effects
    }

    fn report_rejection(
        &self,
        ctx: &TurnContext,
        state: &ConversationState,
        message: &str,
        effects: &mut Effects,
    ) {
        effects.push(Effect::LoginRejected { attempts: state.failed_login_attempts });
        effects.reply(message);

        if self.policy.is_exhausted(state) {
            let remaining_secs = ceil_secs(self.policy.window);
            warn!(
                event_name = "auth.locked_out",
                conversation_id = %ctx.conversation_id,
                correlation_id = %ctx.correlation_id,
                attempts = state.failed_login_attempts,
                "login locked after repeated failures"
            );
            effects.push(Effect::LockedOut { remaining_secs });
            effects.reply(messages::locked_out(remaining_secs));
        }
    }
}

#[async_trait]
impl<'a> crate::conversation::dispatcher::MenuHandler for AuthMenu<'a> {
    fn menu_id(&self) -> MenuId {
        MenuId::Auth
    }

    fn show(&self, state: &ConversationState) -> String {
        self.navigator.render(state, MenuId::Auth)
    }

    async fn handle_input(
        &self,
        ctx: &TurnContext,
        raw_text: &str,
        state: &mut ConversationState,
    ) -> DispatchResult {
        if let Some(remaining) = self.policy.check(state, ctx.now) {
            let remaining_secs = ceil_secs(remaining);
            let mut effects = Effects::new();
            effects.push(Effect::LockedOut { remaining_secs });
            effects.reply(messages::locked_out(remaining_secs));
            return DispatchResult::Handled(effects);
        }

        let text = raw_text.trim();
        let effects = if state.pending_auth.is_some() {
            self.password_step(ctx, text, state).await
        } else {
            self.identifier_step(ctx, text, state).await
        };
        DispatchResult::Handled(effects)
    }
}
