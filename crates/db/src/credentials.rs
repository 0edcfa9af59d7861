use async_trait::async_trait;
use thiserror::Error;

use minerbot_core::collaborators::PasswordVerifier;
use minerbot_core::errors::CollaboratorError;

const COLLABORATOR: &str = "password_verifier";

pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("could not hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Produces a `$2b$` bcrypt hash suitable for the `employees.password_hash` column.
pub fn hash_password(password: &str, cost: u32) -> Result<String, CredentialError> {
    if password.trim().is_empty() {
        return Err(CredentialError::EmptyPassword);
    }
    Ok(bcrypt::hash(password, cost)?)
}

/// Checks candidates against stored bcrypt hashes on the blocking pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct BcryptPasswordVerifier;

#[async_trait]
impl PasswordVerifier for BcryptPasswordVerifier {
    async fn verify(&self, candidate: &str, stored_hash: &str) -> Result<bool, CollaboratorError> {
        let candidate = candidate.to_string();
        let stored_hash = stored_hash.to_string();

        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &stored_hash))
            .await
            .map_err(|error| CollaboratorError::unavailable(COLLABORATOR, error.to_string()))?;

        outcome.map_err(|error| CollaboratorError::decode(COLLABORATOR, error.to_string()))
    }
}
