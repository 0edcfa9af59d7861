pub mod connection;
pub mod credentials;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_from_config, connect_with_settings, ping, DbPool};
pub use credentials::{hash_password, BcryptPasswordVerifier, CredentialError};
pub use fixtures::{
    DemoDirectory, SeedError, SeedResult, SeededEmployee, VerificationResult, DEMO_PASSWORD,
};
pub use repositories::{RepositoryError, SqlConversationStateRepository, SqlEmployeeDirectory};
