use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use minerbot_core::collaborators::{
    DisabledKnowledgeBase, InMemoryConversationStore, InMemoryEmployeeDirectory, KnowledgeBase,
    PlainPasswordVerifier, RecordingSubmissionSink, StaticKnowledgeBase,
};
use minerbot_core::conversation::messages;
use minerbot_core::conversation::{
    AwaitingFreeText, Collaborators, ConversationEngine, Effect, EngineSettings, LockoutPolicy,
};
use minerbot_core::domain::menu::COURSE_CATALOG;
use minerbot_core::{
    ContentResolver, ContentTable, EmployeeId, EmployeeRecord, MenuId, SubmissionKind,
};

const CONVERSATION: &str = "teams:19:abc";
const PASSWORD: &str = "Cobre#2026";

fn employee(site_id: &str) -> EmployeeRecord {
    EmployeeRecord {
        id: EmployeeId("EMP-001".to_string()),
        first_name: "Camila".to_string(),
        last_name: "Rojas".to_string(),
        email: "camila.rojas@minerbot.example".to_string(),
        tax_id: "12345678-9".to_string(),
        site: if site_id == "1" { "Faena Norte".to_string() } else { "Oficina Santiago".to_string() },
        site_id: site_id.to_string(),
        area: "Mantenimiento".to_string(),
        role: "Ingeniera de Confiabilidad".to_string(),
        credential_hash: Some(PASSWORD.to_string()),
    }
}

struct Harness {
    engine: ConversationEngine,
    sink: Arc<RecordingSubmissionSink>,
}

fn harness_with(
    site_id: &str,
    knowledge: Arc<dyn KnowledgeBase>,
    content: Arc<dyn ContentResolver>,
) -> Harness {
    let sink = Arc::new(RecordingSubmissionSink::default());
    let engine = ConversationEngine::new(
        Collaborators {
            directory: Arc::new(InMemoryEmployeeDirectory::new([employee(site_id)])),
            verifier: Arc::new(PlainPasswordVerifier),
            knowledge,
            sink: sink.clone(),
            store: Arc::new(InMemoryConversationStore::default()),
        },
        content,
        EngineSettings {
            collaborator_timeout: Duration::from_secs(2),
            lockout: LockoutPolicy::default(),
        },
    );
    Harness { engine, sink }
}

fn harness() -> Harness {
    harness_with("1", Arc::new(DisabledKnowledgeBase), Arc::new(ContentTable::standard()))
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
}

async fn login(harness: &Harness) {
    harness.engine.handle_message(CONVERSATION, "camila.rojas@minerbot.example").await.unwrap();
    harness.engine.handle_message(CONVERSATION, PASSWORD).await.unwrap();
}

async fn wait_for_submissions(sink: &RecordingSubmissionSink, expected: usize) {
    for _ in 0..50 {
        if sink.submissions().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn email_then_password_lands_on_main_with_empty_stack() {
    let harness = harness();

    let first = harness
        .engine
        .handle_message(CONVERSATION, "Camila.Rojas@minerbot.example")
        .await
        .expect("identifier turn");
    assert_eq!(first.messages(), vec![messages::PASSWORD_PROMPT.to_string()]);
    assert!(first.state.pending_auth.is_some());
    assert!(!first.state.is_authenticated);

    let second = harness.engine.handle_message(CONVERSATION, PASSWORD).await.expect("password turn");
    assert!(second.state.is_authenticated);
    assert_eq!(second.state.current_menu_id, MenuId::Main);
    assert!(second.state.menu_stack.is_empty());
    assert!(second.state.pending_auth.is_none());
    assert!(second
        .effects
        .contains(&Effect::Authenticated { employee_id: EmployeeId("EMP-001".to_string()) }));

    let replies = second.messages();
    assert_eq!(replies[0], messages::login_succeeded("Camila"));
    assert!(replies[1].starts_with("Menú principal:"));
}

#[tokio::test]
async fn numeric_navigation_pushes_and_return_pops() {
    let harness = harness();
    login(&harness).await;

    let vacaciones = harness.engine.handle_message(CONVERSATION, "1").await.unwrap();
    assert_eq!(vacaciones.state.current_menu_id, MenuId::Vacaciones);
    assert_eq!(vacaciones.state.menu_stack, vec![MenuId::Main]);

    let child = harness.engine.handle_message(CONVERSATION, "4").await.unwrap();
    assert_eq!(child.state.current_menu_id, MenuId::TiposPermisosLegales);
    assert_eq!(child.state.menu_stack, vec![MenuId::Main, MenuId::Vacaciones]);

    let back = harness.engine.handle_message(CONVERSATION, "volver").await.unwrap();
    assert_eq!(back.state.current_menu_id, MenuId::Vacaciones);
    assert_eq!(back.state.menu_stack, vec![MenuId::Main]);
    assert!(back.messages()[0].starts_with("Vacaciones, Licencias y Permisos:"));
}

#[tokio::test]
async fn home_command_is_idempotent_from_any_depth() {
    let harness = harness();
    login(&harness).await;
    harness.engine.handle_message(CONVERSATION, "3").await.unwrap();
    harness.engine.handle_message(CONVERSATION, "4").await.unwrap();

    let once = harness.engine.handle_message(CONVERSATION, "menu").await.unwrap();
    let twice = harness.engine.handle_message(CONVERSATION, "MENÚ").await.unwrap();

    assert_eq!(once.state, twice.state);
    assert_eq!(twice.state.current_menu_id, MenuId::Main);
    assert!(twice.state.menu_stack.is_empty());
}

#[tokio::test]
async fn course_request_reprompts_until_a_valid_course_is_chosen() {
    let harness = harness();
    login(&harness).await;
    harness.engine.handle_message(CONVERSATION, "6").await.unwrap();

    let prompt = harness.engine.handle_message(CONVERSATION, "Solicitar Curso").await.unwrap();
    assert_eq!(prompt.state.awaiting_free_text, AwaitingFreeText::CourseSelection);
    assert!(prompt.messages()[0].contains(COURSE_CATALOG[0]));

    let rejected = harness.engine.handle_message(CONVERSATION, "9").await.unwrap();
    assert_eq!(rejected.messages(), vec![messages::COURSE_NOT_RECOGNIZED.to_string()]);
    assert_eq!(rejected.state.awaiting_free_text, AwaitingFreeText::CourseSelection);
    assert!(harness.sink.submissions().is_empty());

    let accepted = harness.engine.handle_message(CONVERSATION, "2").await.unwrap();
    assert_eq!(accepted.state.awaiting_free_text, AwaitingFreeText::None);
    assert_eq!(accepted.state.current_menu_id, MenuId::CrecimientoDesarrollo);
    assert!(accepted
        .effects
        .contains(&Effect::Submitted { kind: SubmissionKind::CourseRequest, delivered: true }));

    let requests = harness.sink.submissions_of(SubmissionKind::CourseRequest);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["cursoSolicitado"], COURSE_CATALOG[1]);
    assert_eq!(requests[0]["rutEmpleado"], "12345678-9");
}

#[tokio::test]
async fn capture_takes_priority_over_menu_and_home_matching() {
    let harness = harness();
    login(&harness).await;
    harness.engine.handle_message(CONVERSATION, "7").await.unwrap();
    harness.engine.handle_message(CONVERSATION, "2").await.unwrap();

    let captured = harness.engine.handle_message(CONVERSATION, "1").await.unwrap();
    assert_eq!(captured.state.current_menu_id, MenuId::ConsultasGenerales);
    assert_eq!(captured.state.awaiting_free_text, AwaitingFreeText::None);

    let queries = harness.sink.submissions_of(SubmissionKind::UnresolvedQuery);
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["consultaTexto"], "1");
    assert_eq!(queries[0]["nombreEmpleado"], "Camila Rojas");
}

#[tokio::test]
async fn cancelling_a_capture_submits_nothing() {
    let harness = harness();
    login(&harness).await;
    harness.engine.handle_message(CONVERSATION, "5").await.unwrap();
    harness.engine.handle_message(CONVERSATION, "4").await.unwrap();
    let prompt = harness.engine.handle_message(CONVERSATION, "4").await.unwrap();
    assert_eq!(prompt.state.awaiting_free_text, AwaitingFreeText::AnonymousComplaint);

    let cancelled = harness.engine.handle_message(CONVERSATION, "Volver").await.unwrap();
    assert_eq!(cancelled.state.awaiting_free_text, AwaitingFreeText::None);
    assert_eq!(cancelled.state.current_menu_id, MenuId::ProcedimientoDenuncias);
    assert!(harness.sink.submissions().is_empty());
}

#[tokio::test]
async fn anonymous_complaint_carries_only_the_text() {
    let harness = harness();
    login(&harness).await;
    harness.engine.handle_message(CONVERSATION, "5").await.unwrap();
    harness.engine.handle_message(CONVERSATION, "4").await.unwrap();
    harness.engine.handle_message(CONVERSATION, "realizar denuncia anónima").await.unwrap();

    harness.engine.handle_message(CONVERSATION, "Hay maltrato en el turno B").await.unwrap();

    let complaints = harness.sink.submissions_of(SubmissionKind::AnonymousComplaint);
    assert_eq!(complaints.len(), 1);
    assert_eq!(complaints[0].len(), 1);
    assert_eq!(complaints[0]["textoDenuncia"], "Hay maltrato en el turno B");
}

#[tokio::test]
async fn failed_submission_apologises_and_still_clears_the_capture() {
    let harness = harness();
    login(&harness).await;
    harness.sink.set_failing(true);
    harness.engine.handle_message(CONVERSATION, "7").await.unwrap();
    harness.engine.handle_message(CONVERSATION, "2").await.unwrap();

    let failed = harness.engine.handle_message(CONVERSATION, "¿Cómo cambio mi cuenta?").await.unwrap();
    assert_eq!(failed.messages()[0], messages::submission_failed(minerbot_core::CaptureKind::UserQuery));
    assert_eq!(failed.state.awaiting_free_text, AwaitingFreeText::None);
    assert!(failed
        .effects
        .contains(&Effect::Submitted { kind: SubmissionKind::UnresolvedQuery, delivered: false }));
}

#[tokio::test]
async fn site_two_sees_its_own_variant_and_others_fall_back_to_default() {
    let content = ContentTable::from_toml_str(
        r#"
"procedimiento de reembolso médico/dental" = { default = "Reembolso general", "2" = "Reembolso Santiago" }
"#,
    )
    .expect("content table");
    let content: Arc<dyn ContentResolver> = Arc::new(content);

    let santiago = harness_with("2", Arc::new(DisabledKnowledgeBase), content.clone());
    login(&santiago).await;
    santiago.engine.handle_message(CONVERSATION, "3").await.unwrap();
    let shown = santiago.engine.handle_message(CONVERSATION, "1").await.unwrap();
    assert_eq!(shown.messages(), vec!["Reembolso Santiago".to_string()]);
    assert!(shown.state.is_showing_content);

    let north = harness_with("1", Arc::new(DisabledKnowledgeBase), content);
    login(&north).await;
    north.engine.handle_message(CONVERSATION, "3").await.unwrap();
    let shown = north.engine.handle_message(CONVERSATION, "1").await.unwrap();
    assert_eq!(shown.messages(), vec!["Reembolso general".to_string()]);
}

#[tokio::test]
async fn return_after_content_rerenders_before_popping() {
    let harness = harness();
    login(&harness).await;
    harness.engine.handle_message(CONVERSATION, "2").await.unwrap();
    harness.engine.handle_message(CONVERSATION, "1").await.unwrap();

    let rerendered = harness.engine.handle_message(CONVERSATION, "volver").await.unwrap();
    assert_eq!(rerendered.state.current_menu_id, MenuId::Beneficios);
    assert!(!rerendered.state.is_showing_content);

    let popped = harness.engine.handle_message(CONVERSATION, "volver").await.unwrap();
    assert_eq!(popped.state.current_menu_id, MenuId::Main);
    assert!(popped.state.menu_stack.is_empty());
}

#[tokio::test]
async fn lockout_blocks_until_the_window_elapses() {
    let harness = harness();
    let engine = &harness.engine;

    for attempt in 0..3 {
        let reply =
            engine.handle_message_at(CONVERSATION, "nadie@minerbot.example", at(attempt)).await.unwrap();
        assert_eq!(reply.messages()[0], messages::EMPLOYEE_NOT_FOUND);
    }

    let locked = engine
        .handle_message_at(CONVERSATION, "camila.rojas@minerbot.example", at(20))
        .await
        .unwrap();
    assert_eq!(locked.messages(), vec![messages::locked_out(42)]);
    assert!(locked.state.pending_auth.is_none());

    let unlocked = engine
        .handle_message_at(CONVERSATION, "camila.rojas@minerbot.example", at(63))
        .await
        .unwrap();
    assert_eq!(unlocked.messages(), vec![messages::PASSWORD_PROMPT.to_string()]);
    assert_eq!(unlocked.state.failed_login_attempts, 0);

    let signed_in = engine.handle_message_at(CONVERSATION, PASSWORD, at(64)).await.unwrap();
    assert!(signed_in.state.is_authenticated);
}

#[tokio::test]
async fn wrong_password_restarts_at_the_identifier_step() {
    let harness = harness();
    harness.engine.handle_message(CONVERSATION, "12345678-9").await.unwrap();

    let rejected = harness.engine.handle_message(CONVERSATION, "incorrecta").await.unwrap();
    assert_eq!(rejected.messages()[0], messages::WRONG_PASSWORD);
    assert!(rejected.state.pending_auth.is_none());
    assert_eq!(rejected.state.failed_login_attempts, 1);
    assert!(!rejected.state.is_authenticated);
}

#[tokio::test]
async fn unmatched_input_falls_back_to_knowledge_base_and_logs_the_exchange() {
    let knowledge = StaticKnowledgeBase::new([(
        "¿cuándo pagan el bono?",
        "El bono se paga en marzo.",
    )]);
    let harness = harness_with("1", Arc::new(knowledge), Arc::new(ContentTable::standard()));
    login(&harness).await;

    let answered = harness.engine.handle_message(CONVERSATION, "¿Cuándo pagan el bono?").await.unwrap();
    assert_eq!(answered.messages(), vec!["El bono se paga en marzo.".to_string()]);
    assert!(answered.effects.contains(&Effect::KnowledgeAnswered { found: true }));
    assert_eq!(answered.state.current_menu_id, MenuId::Main);

    wait_for_submissions(&harness.sink, 1).await;
    let logged = harness.sink.submissions_of(SubmissionKind::QnaLog);
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0]["sede"], "Faena Norte");
    assert_eq!(logged[0]["area"], "Mantenimiento");
    assert_eq!(logged[0]["consulta"], "¿Cuándo pagan el bono?");
    assert_eq!(logged[0]["respuesta"], "El bono se paga en marzo.");

    let unknown = harness.engine.handle_message(CONVERSATION, "horario del casino").await.unwrap();
    assert_eq!(unknown.messages(), vec![messages::KNOWLEDGE_NO_MATCH.to_string()]);
    wait_for_submissions(&harness.sink, 2).await;
    let logged = harness.sink.submissions_of(SubmissionKind::QnaLog);
    assert_eq!(logged[1]["respuesta"], messages::KNOWLEDGE_NO_ANSWER_LOGGED);
}

#[tokio::test]
async fn unreachable_knowledge_base_apologises_without_touching_state() {
    let harness = harness();
    login(&harness).await;
    let before = harness.engine.handle_message(CONVERSATION, "2").await.unwrap().state;

    let reply = harness.engine.handle_message(CONVERSATION, "quiero hablar con alguien").await.unwrap();
    assert_eq!(reply.messages(), vec![messages::KNOWLEDGE_UNAVAILABLE.to_string()]);
    assert_eq!(reply.state, before);

    wait_for_submissions(&harness.sink, 1).await;
    let logged = harness.sink.submissions_of(SubmissionKind::QnaLog);
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0]["consulta"], "quiero hablar con alguien");
    assert_eq!(logged[0]["sede"], "Faena Norte");
    assert_eq!(logged[0]["respuesta"], messages::KNOWLEDGE_FAILURE_LOGGED);
}

#[tokio::test]
async fn empty_input_on_a_menu_reprompts_without_asking_the_knowledge_base() {
    let harness = harness();
    login(&harness).await;

    let reply = harness.engine.handle_message(CONVERSATION, "   ").await.unwrap();
    let replies = reply.messages();
    assert_eq!(replies[0], messages::EMPTY_MENU_INPUT);
    assert!(replies[1].starts_with("Menú principal:"));
}

#[tokio::test]
async fn returning_employee_is_welcomed_back_on_the_main_menu() {
    let harness = harness();
    login(&harness).await;
    harness.engine.handle_message(CONVERSATION, "7").await.unwrap();
    harness.engine.handle_message(CONVERSATION, "2").await.unwrap();

    let start = harness.engine.handle_conversation_start(CONVERSATION).await.unwrap();
    let replies = start.messages();
    assert_eq!(replies[0], messages::welcome_back("Camila Rojas"));
    assert!(replies[1].starts_with("Menú principal:"));
    assert_eq!(start.state.awaiting_free_text, AwaitingFreeText::None);
    assert_eq!(start.state.current_menu_id, MenuId::Main);
}

#[tokio::test]
async fn unauthenticated_feature_requests_stay_on_the_auth_menu() {
    let harness = harness();

    for text in ["1", "volver", "menu", "beneficios"] {
        let reply = harness.engine.handle_message(CONVERSATION, text).await.unwrap();
        assert!(!reply.state.is_authenticated);
        assert_eq!(reply.state.current_menu_id, MenuId::Auth);
        assert!(reply.state.menu_stack.is_empty());
    }
}
