use thiserror::Error;

use minerbot_core::errors::CollaboratorError;

pub mod conversation;
pub mod employee;

pub use conversation::SqlConversationStateRepository;
pub use employee::{NewEmployee, SqlEmployeeDirectory};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// Maps a storage failure onto the collaborator taxonomy used by the conversation core.
    pub fn into_collaborator(self, collaborator: &'static str) -> CollaboratorError {
        match self {
            Self::Database(error) => CollaboratorError::unavailable(collaborator, error.to_string()),
            Self::Decode(message) => CollaboratorError::decode(collaborator, message),
        }
    }
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
