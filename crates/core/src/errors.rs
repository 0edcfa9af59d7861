use std::time::Duration;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown menu id `{0}`")]
    UnknownMenu(String),
    #[error("content entry `{key}` is invalid: {reason}")]
    InvalidContent { key: String, reason: String },
    #[error("content table could not be parsed: {0}")]
    ContentParse(String),
    #[error("conversation invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failure reported by any collaborator behind a core trait.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{collaborator} is unavailable: {message}")]
    Unavailable { collaborator: &'static str, message: String },
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: &'static str, after: Duration },
    #[error("{collaborator} rejected the request: {message}")]
    Rejected { collaborator: &'static str, message: String },
    #[error("{collaborator} returned an undecodable response: {message}")]
    Decode { collaborator: &'static str, message: String },
}

impl CollaboratorError {
    pub fn unavailable(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable { collaborator, message: message.into() }
    }

    pub fn rejected(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected { collaborator, message: message.into() }
    }

    pub fn decode(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self::Decode { collaborator, message: message.into() }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Rejected { .. } => "rejected",
            Self::Decode { .. } => "decode",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "No pude procesar tu mensaje. Revisa el contenido e intenta de nuevo."
            }
            Self::ServiceUnavailable { .. } => {
                "Lo siento, el servicio no está disponible en este momento. Intenta de nuevo en unos minutos."
            }
            Self::Internal { .. } => "Lo siento, parece que algo salió mal. Por favor, intenta de nuevo.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
