use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::{EmployeeProfile, EmployeeRecord};
use crate::domain::menu::{CaptureKind, MenuId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AwaitingFreeText {
    #[default]
    None,
    UserQuery,
    CourseSelection,
    AnonymousComplaint,
}

impl AwaitingFreeText {
    pub fn kind(self) -> Option<CaptureKind> {
        match self {
            Self::None => None,
            Self::UserQuery => Some(CaptureKind::UserQuery),
            Self::CourseSelection => Some(CaptureKind::CourseSelection),
            Self::AnonymousComplaint => Some(CaptureKind::AnonymousComplaint),
        }
    }

    pub fn is_active(self) -> bool {
        self != Self::None
    }
}

impl From<CaptureKind> for AwaitingFreeText {
    fn from(kind: CaptureKind) -> Self {
        match kind {
            CaptureKind::UserQuery => Self::UserQuery,
            CaptureKind::CourseSelection => Self::CourseSelection,
            CaptureKind::AnonymousComplaint => Self::AnonymousComplaint,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthStep {
    AwaitingIdentifier,
    AwaitingPassword,
    Authenticated,
}

/// Per-conversation state, persisted as camelCase JSON between turns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationState {
    pub is_authenticated: bool,
    pub employee_profile: Option<EmployeeProfile>,
    pub current_menu_id: MenuId,
    pub menu_stack: Vec<MenuId>,
    pub is_showing_content: bool,
    pub awaiting_free_text: AwaitingFreeText,
    pub failed_login_attempts: u32,
    pub last_failed_attempt_at: Option<DateTime<Utc>>,
    pub pending_auth: Option<EmployeeRecord>,
}

pub fn default_state() -> ConversationState {
    ConversationState {
        is_authenticated: false,
        employee_profile: None,
        current_menu_id: MenuId::Auth,
        menu_stack: Vec::new(),
        is_showing_content: false,
        awaiting_free_text: AwaitingFreeText::None,
        failed_login_attempts: 0,
        last_failed_attempt_at: None,
        pending_auth: None,
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        default_state()
    }
}

impl ConversationState {
    pub fn reset_for_auth(&mut self) {
        *self = default_state();
    }

    pub fn reset_awaiting_states(&mut self) {
        self.awaiting_free_text = AwaitingFreeText::None;
    }

    pub fn start_capture(&mut self, kind: CaptureKind) {
        self.awaiting_free_text = kind.into();
    }

    pub fn auth_step(&self) -> AuthStep {
        if self.is_authenticated {
            AuthStep::Authenticated
        } else if self.pending_auth.is_some() {
            AuthStep::AwaitingPassword
        } else {
            AuthStep::AwaitingIdentifier
        }
    }

    pub fn site_id(&self) -> Option<&str> {
        self.employee_profile.as_ref().map(|profile| profile.site_id.as_str())
    }

    /// Unauthenticated conversations must sit on the auth menu with nothing stacked or captured.
    pub fn violates_auth_gate(&self) -> bool {
        !self.is_authenticated
            && (self.current_menu_id != MenuId::Auth
                || !self.menu_stack.is_empty()
                || self.awaiting_free_text.is_active()
                || self.employee_profile.is_some())
    }

    pub fn record_failed_login(&mut self, now: DateTime<Utc>) {
        self.failed_login_attempts = self.failed_login_attempts.saturating_add(1);
        self.last_failed_attempt_at = Some(now);
    }

    pub fn clear_failed_logins(&mut self) {
        self.failed_login_attempts = 0;
        self.last_failed_attempt_at = None;
    }

    pub fn sign_in(&mut self, employee: &EmployeeRecord) {
        self.is_authenticated = true;
        self.employee_profile = Some(employee.profile());
        self.pending_auth = None;
        self.clear_failed_logins();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::domain::employee::{EmployeeId, EmployeeRecord};
    use crate::domain::menu::{CaptureKind, MenuId};

    use super::{default_state, AuthStep, AwaitingFreeText, ConversationState};

    fn employee() -> EmployeeRecord {
        EmployeeRecord {
            id: EmployeeId("E-7".to_string()),
            first_name: "Jorge".to_string(),
            last_name: "Muñoz".to_string(),
            email: "jorge.munoz@minera.example".to_string(),
            tax_id: "11111111-1".to_string(),
            site: "Oficina Santiago".to_string(),
            site_id: "2".to_string(),
            area: "Finanzas".to_string(),
            role: "Analista".to_string(),
            credential_hash: Some("hash".to_string()),
        }
    }

    #[test]
    fn default_state_is_unauthenticated_on_auth_menu() {
        let state = default_state();
        assert!(!state.is_authenticated);
        assert_eq!(state.current_menu_id, MenuId::Auth);
        assert!(state.menu_stack.is_empty());
        assert_eq!(state.awaiting_free_text, AwaitingFreeText::None);
        assert_eq!(state.auth_step(), AuthStep::AwaitingIdentifier);
        assert!(!state.violates_auth_gate());
    }

    #[test]
    fn reset_for_auth_overwrites_everything() {
        let mut state = default_state();
        state.current_menu_id = MenuId::Beneficios;
        state.menu_stack.push(MenuId::Main);
        state.start_capture(CaptureKind::UserQuery);
        assert!(state.violates_auth_gate());

        state.reset_for_auth();
        assert_eq!(state, default_state());
    }

    #[test]
    fn reset_awaiting_states_only_clears_capture() {
        let mut state = default_state();
        state.is_showing_content = true;
        state.start_capture(CaptureKind::AnonymousComplaint);

        state.reset_awaiting_states();
        assert_eq!(state.awaiting_free_text, AwaitingFreeText::None);
        assert!(state.is_showing_content);
    }

    #[test]
    fn sign_in_populates_profile_and_clears_counters() {
        let mut state = default_state();
        state.record_failed_login(Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap());
        state.pending_auth = Some(employee());
        assert_eq!(state.auth_step(), AuthStep::AwaitingPassword);

        state.sign_in(&employee());
        assert_eq!(state.auth_step(), AuthStep::Authenticated);
        assert_eq!(state.site_id(), Some("2"));
        assert_eq!(state.failed_login_attempts, 0);
        assert!(state.pending_auth.is_none());
    }

    #[test]
    fn persisted_shape_uses_camel_case_and_tolerates_missing_keys() {
        let mut state = default_state();
        state.start_capture(CaptureKind::CourseSelection);
        let json = serde_json::to_value(&state).expect("state serializes");
        assert_eq!(json["currentMenuId"], "auth");
        assert_eq!(json["awaitingFreeText"], "courseSelection");
        assert_eq!(json["failedLoginAttempts"], 0);

        let partial: ConversationState = serde_json::from_str(
            r#"{"isAuthenticated": false, "currentMenuId": "auth", "unknownKey": 1}"#,
        )
        .expect("partial state decodes");
        assert_eq!(partial, default_state());
    }
}
