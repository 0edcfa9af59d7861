use crate::commands::CommandResult;
use minerbot_db::{hash_password, CredentialError};

pub fn run(password: &str, cost: u32) -> CommandResult {
    match hash_password(password, cost) {
        Ok(hash) => CommandResult::success("hash-password", hash),
        Err(CredentialError::EmptyPassword) => {
            CommandResult::failure("hash-password", "invalid_input", "password must not be empty", 2)
        }
        Err(error) => CommandResult::failure("hash-password", "hashing", error.to_string(), 5),
    }
}
