use chrono::{DateTime, Utc};

use crate::collaborators::SubmissionKind;
use crate::conversation::state::ConversationId;
use crate::domain::employee::EmployeeId;
use crate::domain::menu::{CaptureKind, MenuId};

/// Identifiers and clock shared by every handler during one turn.
#[derive(Clone, Debug)]
pub struct TurnContext {
    pub conversation_id: ConversationId,
    pub correlation_id: String,
    pub now: DateTime<Utc>,
}

impl TurnContext {
    pub fn new(conversation_id: ConversationId, now: DateTime<Utc>) -> Self {
        Self { conversation_id, correlation_id: uuid::Uuid::new_v4().to_string(), now }
    }
}

/// Something a turn did: an outbound message or a state transition worth observing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Reply(String),
    Navigated { from: MenuId, to: MenuId },
    WentBack { to: MenuId },
    WentHome { to: MenuId },
    ShowedContent { label: &'static str },
    CaptureStarted(CaptureKind),
    CaptureCancelled(CaptureKind),
    Submitted { kind: SubmissionKind, delivered: bool },
    AuthenticationRequired,
    Authenticated { employee_id: EmployeeId },
    LoginRejected { attempts: u32 },
    LockedOut { remaining_secs: i64 },
    StateRepaired,
    KnowledgeAnswered { found: bool },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Effects(Vec<Effect>);

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&mut self, text: impl Into<String>) {
        self.0.push(Effect::Reply(text.into()));
    }

    pub fn push(&mut self, effect: Effect) {
        self.0.push(effect);
    }

    pub fn extend(&mut self, other: Effects) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, effect: &Effect) -> bool {
        self.0.contains(effect)
    }

    /// Outbound messages in the order they were produced.
    pub fn replies(&self) -> Vec<String> {
        self.0
            .iter()
            .filter_map(|effect| match effect {
                Effect::Reply(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl From<Vec<Effect>> for Effects {
    fn from(effects: Vec<Effect>) -> Self {
        Self(effects)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchResult {
    Handled(Effects),
    Unhandled,
}

impl DispatchResult {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }
}
