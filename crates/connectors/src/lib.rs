//! HTTP adapters for the collaborators that live outside the process: the
//! question-answering knowledge base and the workflow-automation flows.

pub mod knowledge;
pub mod workflows;

use std::time::Duration;

use thiserror::Error;

pub use knowledge::HttpKnowledgeBase;
pub use workflows::{timestamp_fields, WorkflowSubmissionSink};

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("`{0}` must be set to enable this connector")]
    MissingSetting(&'static str),
    #[error("invalid utc offset of {0} hours")]
    InvalidOffset(i32),
    #[error("http client could not be built: {0}")]
    Client(#[from] reqwest::Error),
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, ConnectorError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
