use std::time::Duration;

use tracing::{error, info};

use crate::collaborators::{bounded, SubmissionKind, SubmissionPayload, SubmissionSink};
use crate::conversation::dispatcher::UserInput;
use crate::conversation::messages;
use crate::conversation::navigation::Navigator;
use crate::conversation::state::ConversationState;
use crate::conversation::turn::{Effect, Effects, TurnContext};
use crate::domain::employee::EmployeeProfile;
use crate::domain::menu::{find_course, CaptureKind};

const CANCEL_TOKENS: [&str; 2] = ["volver", "cancelar"];

/// Builds the workflow payload for a captured text. Anonymous complaints carry the text only.
pub fn capture_payload(
    kind: CaptureKind,
    profile: Option<&EmployeeProfile>,
    text: &str,
) -> SubmissionPayload {
    let mut payload = SubmissionPayload::new();
    let text_field = match kind {
        CaptureKind::UserQuery => "consultaTexto",
        CaptureKind::CourseSelection => "cursoSolicitado",
        CaptureKind::AnonymousComplaint => "textoDenuncia",
    };
    payload.insert(text_field.to_string(), text.to_string());

    if kind == CaptureKind::AnonymousComplaint {
        return payload;
    }

    let (name, tax_id, area, role) = profile
        .map(|p| (p.name.clone(), p.tax_id.clone(), p.area.clone(), p.role.clone()))
        .unwrap_or_default();
    payload.insert("nombreEmpleado".to_string(), name);
    payload.insert("rutEmpleado".to_string(), tax_id);
    payload.insert("employeeArea".to_string(), area);
    payload.insert("employeeCargo".to_string(), role);
    payload
}

/// Intercepts input while a free-text capture is active.
pub struct CaptureHandler<'a> {
    sink: &'a dyn SubmissionSink,
    navigator: &'a Navigator<'a>,
    timeout: Duration,
}

impl<'a> CaptureHandler<'a> {
    pub fn new(sink: &'a dyn SubmissionSink, navigator: &'a Navigator<'a>, timeout: Duration) -> Self {
        Self { sink, navigator, timeout }
    }

    pub async fn handle(
        &self,
        ctx: &TurnContext,
        input: &UserInput<'_>,
        state: &mut ConversationState,
    ) -> Effects {
        let mut effects = Effects::new();
        let Some(kind) = state.awaiting_free_text.kind() else {
            return effects;
        };

        if CANCEL_TOKENS.contains(&input.lowered.as_str()) {
            state.reset_awaiting_states();
            effects.push(Effect::CaptureCancelled(kind));
            effects.reply(messages::capture_cancelled(kind));
            self.navigator.show_current(state, &mut effects);
            return effects;
        }

        if input.is_empty() {
            effects.reply(messages::capture_empty(kind));
            return effects;
        }

        let captured = match kind {
            CaptureKind::CourseSelection => match find_course(input.trimmed) {
                Some(course) => course.to_string(),
                None => {
                    effects.reply(messages::COURSE_NOT_RECOGNIZED);
                    return effects;
                }
            },
            CaptureKind::UserQuery | CaptureKind::AnonymousComplaint => input.trimmed.to_string(),
        };

        let submission_kind = SubmissionKind::from(kind);
        let payload = capture_payload(kind, state.employee_profile.as_ref(), &captured);
        let outcome =
            bounded("submission_sink.submit", self.timeout, self.sink.submit(submission_kind, payload))
                .await;

        let delivered = match outcome {
            Ok(()) => {
                info!(
                    event_name = "capture.submitted",
                    conversation_id = %ctx.conversation_id,
                    correlation_id = %ctx.correlation_id,
                    submission_kind = %submission_kind,
                    "captured text forwarded to workflow"
                );
                effects.reply(messages::submission_succeeded(kind, Some(&captured)));
                true
            }
            Err(error) => {
                error!(
                    event_name = "capture.submission_failed",
                    conversation_id = %ctx.conversation_id,
                    correlation_id = %ctx.correlation_id,
                    submission_kind = %submission_kind,
                    error_class = error.error_class(),
                    error = %error,
                    "workflow submission failed"
                );
                effects.reply(messages::submission_failed(kind));
                false
            }
        };
        effects.push(Effect::Submitted { kind: submission_kind, delivered });

        state.reset_awaiting_states();
        state.is_showing_content = false;
        self.navigator.show_current(state, &mut effects);
        effects
    }
}
