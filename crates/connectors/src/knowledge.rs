use std::time::Duration;

use async_trait::async_trait;
use minerbot_core::config::KnowledgeConfig;
use minerbot_core::{CollaboratorError, KnowledgeBase};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{http_client, ConnectorError};

const COLLABORATOR: &str = "knowledge_base";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Custom question-answering endpoint. Asks for the single best answer.
pub struct HttpKnowledgeBase {
    client: Client,
    url: String,
    project_name: String,
    deployment_name: String,
    api_version: String,
    api_key: SecretString,
    timeout: Duration,
}

impl std::fmt::Debug for HttpKnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpKnowledgeBase")
            .field("url", &self.url)
            .field("project_name", &self.project_name)
            .field("deployment_name", &self.deployment_name)
            .field("api_key", &"[redacted]")
            .finish()
    }
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
    top: u8,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    answers: Vec<QueryAnswer>,
}

#[derive(Deserialize)]
struct QueryAnswer {
    #[serde(default)]
    answer: String,
}

impl HttpKnowledgeBase {
    /// `Ok(None)` when no endpoint is configured.
    pub fn from_config(config: &KnowledgeConfig) -> Result<Option<Self>, ConnectorError> {
        let Some(endpoint) = config.endpoint.as_deref() else {
            return Ok(None);
        };

        let api_key = config.api_key.clone().ok_or(ConnectorError::MissingSetting("knowledge.api_key"))?;
        let project_name = config
            .project_name
            .clone()
            .ok_or(ConnectorError::MissingSetting("knowledge.project_name"))?;
        let deployment_name = config
            .deployment_name
            .clone()
            .ok_or(ConnectorError::MissingSetting("knowledge.deployment_name"))?;
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Some(Self {
            client: http_client(timeout)?,
            url: query_url(endpoint),
            project_name,
            deployment_name,
            api_version: config.api_version.clone(),
            api_key,
            timeout,
        }))
    }

    fn map_send_error(&self, error: reqwest::Error) -> CollaboratorError {
        if error.is_timeout() {
            CollaboratorError::Timeout { operation: "knowledge_base.ask", after: self.timeout }
        } else {
            CollaboratorError::unavailable(COLLABORATOR, error.to_string())
        }
    }
}

fn query_url(endpoint: &str) -> String {
    format!("{}/language/:query-knowledgebases", endpoint.trim_end_matches('/'))
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    async fn ask(&self, question: &str) -> Result<Option<String>, CollaboratorError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let response = self
            .client
            .post(&self.url)
            .query(&[
                ("projectName", self.project_name.as_str()),
                ("deploymentName", self.deployment_name.as_str()),
                ("api-version", self.api_version.as_str()),
            ])
            .header(SUBSCRIPTION_KEY_HEADER, self.api_key.expose_secret())
            .json(&QueryRequest { question, top: 1 })
            .send()
            .await
            .map_err(|error| self.map_send_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "knowledge.query_rejected",
                status = status.as_u16(),
                body = %body,
                "knowledge base rejected the query"
            );
            return Err(CollaboratorError::rejected(COLLABORATOR, format!("status {status}")));
        }

        let decoded: QueryResponse = response
            .json()
            .await
            .map_err(|error| CollaboratorError::decode(COLLABORATOR, error.to_string()))?;

        let answer = decoded
            .answers
            .into_iter()
            .next()
            .map(|answer| answer.answer)
            .filter(|answer| !answer.trim().is_empty());
        debug!(event_name = "knowledge.query_completed", found = answer.is_some());
        Ok(answer)
    }
}
