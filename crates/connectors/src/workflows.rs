use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use minerbot_core::config::WorkflowConfig;
use minerbot_core::{CollaboratorError, SubmissionKind, SubmissionPayload, SubmissionSink};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, warn};

use crate::{http_client, ConnectorError};

const COLLABORATOR: &str = "workflow_sink";

/// Posts submissions to one workflow trigger URL per kind, stamped with the
/// local `fecha` and `hora`.
pub struct WorkflowSubmissionSink {
    client: Client,
    unresolved_query: Option<SecretString>,
    course_request: Option<SecretString>,
    anonymous_complaint: Option<SecretString>,
    qna_log: Option<SecretString>,
    offset: FixedOffset,
    timeout: Duration,
}

impl std::fmt::Debug for WorkflowSubmissionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("WorkflowSubmissionSink");
        for kind in SubmissionKind::ALL {
            let state = if self.url_for(kind).is_some() { "configured" } else { "missing" };
            debug.field(kind.as_str(), &state);
        }
        debug.field("offset", &self.offset).finish()
    }
}

impl WorkflowSubmissionSink {
    pub fn from_config(config: &WorkflowConfig) -> Result<Self, ConnectorError> {
        let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600)
            .ok_or(ConnectorError::InvalidOffset(config.utc_offset_hours))?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let sink = Self {
            client: http_client(timeout)?,
            unresolved_query: config.unresolved_query_url.clone(),
            course_request: config.course_request_url.clone(),
            anonymous_complaint: config.anonymous_complaint_url.clone(),
            qna_log: config.qna_log_url.clone(),
            offset,
            timeout,
        };

        for kind in SubmissionKind::ALL {
            info!(
                event_name = "workflow.flow_configured",
                flow = kind.as_str(),
                configured = sink.url_for(kind).is_some()
            );
        }
        Ok(sink)
    }

    pub fn configured_kinds(&self) -> Vec<SubmissionKind> {
        SubmissionKind::ALL.into_iter().filter(|kind| self.url_for(*kind).is_some()).collect()
    }

    fn url_for(&self, kind: SubmissionKind) -> Option<&SecretString> {
        match kind {
            SubmissionKind::UnresolvedQuery => self.unresolved_query.as_ref(),
            SubmissionKind::CourseRequest => self.course_request.as_ref(),
            SubmissionKind::AnonymousComplaint => self.anonymous_complaint.as_ref(),
            SubmissionKind::QnaLog => self.qna_log.as_ref(),
        }
    }
}

/// Local date (`dd-mm-yyyy`) and 24-hour time for `now` at `offset`.
pub fn timestamp_fields(now: DateTime<Utc>, offset: FixedOffset) -> (String, String) {
    let local = now.with_timezone(&offset);
    (local.format("%d-%m-%Y").to_string(), local.format("%H:%M:%S").to_string())
}

#[async_trait]
impl SubmissionSink for WorkflowSubmissionSink {
    async fn submit(
        &self,
        kind: SubmissionKind,
        mut payload: SubmissionPayload,
    ) -> Result<(), CollaboratorError> {
        let Some(url) = self.url_for(kind) else {
            if kind == SubmissionKind::QnaLog {
                warn!(event_name = "workflow.flow_unconfigured", flow = kind.as_str());
            } else {
                error!(event_name = "workflow.flow_unconfigured", flow = kind.as_str());
            }
            return Err(CollaboratorError::unavailable(
                COLLABORATOR,
                format!("no url configured for `{kind}`"),
            ));
        };

        let (fecha, hora) = timestamp_fields(Utc::now(), self.offset);
        payload.insert("fecha".to_string(), fecha);
        payload.insert("hora".to_string(), hora);

        let response =
            self.client.post(url.expose_secret()).json(&payload).send().await.map_err(|send_error| {
                error!(
                    event_name = "workflow.submission_failed",
                    flow = kind.as_str(),
                    error = %send_error
                );
                if send_error.is_timeout() {
                    CollaboratorError::Timeout { operation: "workflow_sink.submit", after: self.timeout }
                } else {
                    CollaboratorError::unavailable(COLLABORATOR, send_error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                event_name = "workflow.submission_rejected",
                flow = kind.as_str(),
                status = status.as_u16(),
                body = %body
            );
            return Err(CollaboratorError::rejected(COLLABORATOR, format!("status {status}")));
        }

        info!(event_name = "workflow.submitted", flow = kind.as_str());
        Ok(())
    }
}
