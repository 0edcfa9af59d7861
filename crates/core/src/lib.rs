pub mod collaborators;
pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;

pub use collaborators::{
    ConversationStore, EmployeeDirectory, KnowledgeBase, PasswordVerifier, SubmissionKind,
    SubmissionPayload, SubmissionSink,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use conversation::{
    Collaborators, ConversationEngine, ConversationId, ConversationState, Effect, Effects,
    EngineSettings, TurnReply,
};
pub use domain::content::{ContentEntry, ContentResolver, ContentTable};
pub use domain::employee::{EmployeeId, EmployeeProfile, EmployeeRecord};
pub use domain::menu::{CaptureKind, MenuId};
pub use errors::{ApplicationError, CollaboratorError, DomainError, InterfaceError};
