use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use minerbot_connectors::{HttpKnowledgeBase, WorkflowSubmissionSink};
use minerbot_core::config::{KnowledgeConfig, WorkflowConfig};
use minerbot_core::{CollaboratorError, KnowledgeBase, SubmissionKind, SubmissionPayload, SubmissionSink};
use serde_json::{json, Value};

#[derive(Clone, Debug, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

impl Captured {
    fn push(&self, uri: &Uri, headers: &HeaderMap, body: Value) {
        let key = headers
            .get("Ocp-Apim-Subscription-Key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests.lock().expect("lock").push((uri.to_string(), key, body));
    }

    fn all(&self) -> Vec<(String, Option<String>, Value)> {
        self.requests.lock().expect("lock").clone()
    }
}

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let address = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve stub");
    });
    format!("http://{address}")
}

fn knowledge_stub(captured: Captured, reply: Value, status: StatusCode) -> Router {
    Router::new().fallback(move |uri: Uri, headers: HeaderMap, Json(body): Json<Value>| {
        let captured = captured.clone();
        let reply = reply.clone();
        async move {
            captured.push(&uri, &headers, body);
            (status, Json(reply))
        }
    })
}

fn knowledge_config(endpoint: String) -> KnowledgeConfig {
    KnowledgeConfig {
        endpoint: Some(endpoint),
        api_key: Some("kb-secret".to_string().into()),
        project_name: Some("rrhh-faq".to_string()),
        deployment_name: Some("production".to_string()),
        api_version: "2021-10-01".to_string(),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn knowledge_base_posts_question_and_returns_first_answer() {
    let captured = Captured::default();
    let reply = json!({
        "answers": [
            { "answer": "El aguinaldo se paga en diciembre.", "confidenceScore": 0.91 },
            { "answer": "Otra respuesta", "confidenceScore": 0.2 }
        ]
    });
    let base = spawn_stub(knowledge_stub(captured.clone(), reply, StatusCode::OK)).await;
    let client = HttpKnowledgeBase::from_config(&knowledge_config(base))
        .expect("config accepted")
        .expect("enabled");

    let answer = client.ask("¿Cuándo pagan el aguinaldo?").await.expect("answer");
    assert_eq!(answer.as_deref(), Some("El aguinaldo se paga en diciembre."));

    let requests = captured.all();
    assert_eq!(requests.len(), 1);
    let (uri, key, body) = &requests[0];
    assert!(uri.starts_with("/language/:query-knowledgebases?"), "unexpected uri {uri}");
    assert!(uri.contains("projectName=rrhh-faq"));
    assert!(uri.contains("deploymentName=production"));
    assert!(uri.contains("api-version=2021-10-01"));
    assert_eq!(key.as_deref(), Some("kb-secret"));
    assert_eq!(body, &json!({ "question": "¿Cuándo pagan el aguinaldo?", "top": 1 }));
}

#[tokio::test]
async fn knowledge_base_without_answers_returns_none() {
    let captured = Captured::default();
    let base =
        spawn_stub(knowledge_stub(captured.clone(), json!({ "answers": [] }), StatusCode::OK)).await;
    let client = HttpKnowledgeBase::from_config(&knowledge_config(base))
        .expect("config accepted")
        .expect("enabled");

    assert_eq!(client.ask("pregunta sin respuesta").await, Ok(None));
}

#[tokio::test]
async fn knowledge_base_error_status_is_rejected() {
    let captured = Captured::default();
    let base = spawn_stub(knowledge_stub(
        captured,
        json!({ "error": "quota" }),
        StatusCode::TOO_MANY_REQUESTS,
    ))
    .await;
    let client = HttpKnowledgeBase::from_config(&knowledge_config(base))
        .expect("config accepted")
        .expect("enabled");

    let result = client.ask("hola").await;
    assert!(matches!(result, Err(CollaboratorError::Rejected { .. })));
}

#[tokio::test]
async fn blank_question_is_not_sent() {
    let captured = Captured::default();
    let base = spawn_stub(knowledge_stub(captured.clone(), json!({}), StatusCode::OK)).await;
    let client = HttpKnowledgeBase::from_config(&knowledge_config(base))
        .expect("config accepted")
        .expect("enabled");

    assert_eq!(client.ask("   ").await, Ok(None));
    assert!(captured.all().is_empty());
}

fn workflow_stub(captured: Captured, status: StatusCode) -> Router {
    Router::new().route(
        "/flows/{flow}",
        post(move |uri: Uri, headers: HeaderMap, Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                captured.push(&uri, &headers, body);
                status
            }
        }),
    )
}

fn workflow_config(base: &str) -> WorkflowConfig {
    WorkflowConfig {
        unresolved_query_url: Some(format!("{base}/flows/query").into()),
        course_request_url: Some(format!("{base}/flows/course").into()),
        anonymous_complaint_url: Some(format!("{base}/flows/complaint").into()),
        qna_log_url: None,
        timeout_secs: 5,
        utc_offset_hours: -3,
    }
}

#[tokio::test]
async fn workflow_sink_posts_payload_with_local_timestamp() {
    let captured = Captured::default();
    let base = spawn_stub(workflow_stub(captured.clone(), StatusCode::ACCEPTED)).await;
    let sink = WorkflowSubmissionSink::from_config(&workflow_config(&base)).expect("sink");

    let payload = SubmissionPayload::from([
        ("nombreEmpleado".to_string(), "Rodrigo Tapia".to_string()),
        ("cursoSolicitado".to_string(), "Liderazgo y Gestión de Equipos".to_string()),
    ]);
    sink.submit(SubmissionKind::CourseRequest, payload).await.expect("submitted");

    let requests = captured.all();
    assert_eq!(requests.len(), 1);
    let (uri, _, body) = &requests[0];
    assert_eq!(uri, "/flows/course");
    assert_eq!(body["nombreEmpleado"], "Rodrigo Tapia");
    assert_eq!(body["cursoSolicitado"], "Liderazgo y Gestión de Equipos");

    let fecha = body["fecha"].as_str().expect("fecha");
    let hora = body["hora"].as_str().expect("hora");
    assert_eq!(fecha.len(), 10);
    assert_eq!(fecha.matches('-').count(), 2);
    assert_eq!(hora.len(), 8);
    assert_eq!(hora.matches(':').count(), 2);
}

#[tokio::test]
async fn workflow_sink_reports_rejected_status() {
    let captured = Captured::default();
    let base = spawn_stub(workflow_stub(captured, StatusCode::INTERNAL_SERVER_ERROR)).await;
    let sink = WorkflowSubmissionSink::from_config(&workflow_config(&base)).expect("sink");

    let payload = SubmissionPayload::from([("textoDenuncia".to_string(), "texto".to_string())]);
    let result = sink.submit(SubmissionKind::AnonymousComplaint, payload).await;
    assert!(matches!(result, Err(CollaboratorError::Rejected { .. })));
}

#[tokio::test]
async fn unconfigured_interaction_log_is_unavailable() {
    let captured = Captured::default();
    let base = spawn_stub(workflow_stub(captured.clone(), StatusCode::OK)).await;
    let sink = WorkflowSubmissionSink::from_config(&workflow_config(&base)).expect("sink");

    let result = sink.submit(SubmissionKind::QnaLog, SubmissionPayload::new()).await;
    assert!(matches!(result, Err(CollaboratorError::Unavailable { .. })));
    assert!(captured.all().is_empty());
}
