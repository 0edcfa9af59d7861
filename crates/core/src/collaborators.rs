//! Narrow interfaces to everything outside the conversation core, plus in-memory
//! implementations used by tests and the local console.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::conversation::state::{ConversationId, ConversationState};
use crate::domain::employee::EmployeeRecord;
use crate::domain::menu::CaptureKind;
use crate::errors::CollaboratorError;

pub type SubmissionPayload = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionKind {
    UnresolvedQuery,
    CourseRequest,
    AnonymousComplaint,
    QnaLog,
}

impl SubmissionKind {
    pub const ALL: [SubmissionKind; 4] = [
        SubmissionKind::UnresolvedQuery,
        SubmissionKind::CourseRequest,
        SubmissionKind::AnonymousComplaint,
        SubmissionKind::QnaLog,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnresolvedQuery => "unresolvedQuery",
            Self::CourseRequest => "courseRequest",
            Self::AnonymousComplaint => "anonymousComplaint",
            Self::QnaLog => "qnaLog",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CaptureKind> for SubmissionKind {
    fn from(kind: CaptureKind) -> Self {
        match kind {
            CaptureKind::UserQuery => Self::UnresolvedQuery,
            CaptureKind::CourseSelection => Self::CourseRequest,
            CaptureKind::AnonymousComplaint => Self::AnonymousComplaint,
        }
    }
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Finds an active employee by corporate email or national tax id.
    async fn lookup_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<EmployeeRecord>, CollaboratorError>;
}

#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    async fn verify(&self, candidate: &str, stored_hash: &str) -> Result<bool, CollaboratorError>;
}

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Returns `Ok(None)` when the knowledge base has no answer for the question.
    async fn ask(&self, question: &str) -> Result<Option<String>, CollaboratorError>;
}

#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(
        &self,
        kind: SubmissionKind,
        payload: SubmissionPayload,
    ) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationState>, CollaboratorError>;

    async fn save(
        &self,
        conversation_id: &ConversationId,
        state: &ConversationState,
    ) -> Result<(), CollaboratorError>;
}

/// Runs a collaborator call under a deadline; elapsing is reported as a timeout failure.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout { operation, after: limit }),
    }
}

#[derive(Default)]
pub struct InMemoryEmployeeDirectory {
    employees: RwLock<Vec<EmployeeRecord>>,
}

impl InMemoryEmployeeDirectory {
    pub fn new(employees: impl IntoIterator<Item = EmployeeRecord>) -> Self {
        Self { employees: RwLock::new(employees.into_iter().collect()) }
    }

    pub async fn insert(&self, employee: EmployeeRecord) {
        self.employees.write().await.push(employee);
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryEmployeeDirectory {
    async fn lookup_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<EmployeeRecord>, CollaboratorError> {
        let needle = identifier.trim();
        let employees = self.employees.read().await;
        Ok(employees
            .iter()
            .find(|employee| employee.email.eq_ignore_ascii_case(needle) || employee.tax_id == needle)
            .cloned())
    }
}

/// Compares the candidate with the stored value verbatim. Only for fixtures.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainPasswordVerifier;

#[async_trait]
impl PasswordVerifier for PlainPasswordVerifier {
    async fn verify(&self, candidate: &str, stored_hash: &str) -> Result<bool, CollaboratorError> {
        Ok(candidate == stored_hash)
    }
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    states: RwLock<HashMap<String, ConversationState>>,
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationState>, CollaboratorError> {
        let states = self.states.read().await;
        Ok(states.get(conversation_id.as_str()).cloned())
    }

    async fn save(
        &self,
        conversation_id: &ConversationId,
        state: &ConversationState,
    ) -> Result<(), CollaboratorError> {
        let mut states = self.states.write().await;
        states.insert(conversation_id.0.clone(), state.clone());
        Ok(())
    }
}

/// Answers questions from a fixed, case-insensitive question map.
#[derive(Clone, Debug, Default)]
pub struct StaticKnowledgeBase {
    answers: HashMap<String, String>,
}

impl StaticKnowledgeBase {
    pub fn new<Q, A>(answers: impl IntoIterator<Item = (Q, A)>) -> Self
    where
        Q: Into<String>,
        A: Into<String>,
    {
        Self {
            answers: answers
                .into_iter()
                .map(|(question, answer)| (question.into().trim().to_lowercase(), answer.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl KnowledgeBase for StaticKnowledgeBase {
    async fn ask(&self, question: &str) -> Result<Option<String>, CollaboratorError> {
        Ok(self.answers.get(&question.trim().to_lowercase()).cloned())
    }
}

/// Knowledge base that is never reachable; used when no endpoint is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledKnowledgeBase;

#[async_trait]
impl KnowledgeBase for DisabledKnowledgeBase {
    async fn ask(&self, _question: &str) -> Result<Option<String>, CollaboratorError> {
        Err(CollaboratorError::unavailable("knowledge_base", "no endpoint configured"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub kind: SubmissionKind,
    pub payload: SubmissionPayload,
}

#[derive(Clone, Default)]
pub struct RecordingSubmissionSink {
    submissions: Arc<Mutex<Vec<RecordedSubmission>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSubmissionSink {
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub fn submissions_of(&self, kind: SubmissionKind) -> Vec<SubmissionPayload> {
        self.submissions()
            .into_iter()
            .filter(|submission| submission.kind == kind)
            .map(|submission| submission.payload)
            .collect()
    }
}

#[async_trait]
impl SubmissionSink for RecordingSubmissionSink {
    async fn submit(
        &self,
        kind: SubmissionKind,
        payload: SubmissionPayload,
    ) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::rejected("workflow_sink", "recording sink set to fail"));
        }

        if let Ok(mut guard) = self.submissions.lock() {
            guard.push(RecordedSubmission { kind, payload });
        }
        Ok(())
    }
}
