//! User-facing texts. The bot speaks Spanish to employees.

use crate::domain::menu::CaptureKind;

pub const GREETING: &str = "Bienvenido a MinerBot Global Asistente.";
pub const IDENTIFIER_PROMPT: &str =
    "Para acceder, por favor, ingresa tu **Email Corporativo** o tu **RUT**.";
pub const PASSWORD_PROMPT: &str = "Usuario encontrado. Por favor, ingresa tu contraseña.";
pub const NO_CREDENTIAL_CONFIGURED: &str = "Tu usuario está registrado pero no tiene una contraseña configurada. Por favor, contacta a soporte.";
pub const EMPLOYEE_NOT_FOUND: &str =
    "Lo siento, no pude encontrar un empleado activo con ese Email o RUT.";
pub const LOOKUP_FAILED: &str = "Hubo un problema al verificar tu usuario. Intenta más tarde.";
pub const VERIFICATION_FAILED: &str =
    "Hubo un problema al verificar tu contraseña. Por favor, intenta ingresarla nuevamente.";
pub const WRONG_PASSWORD: &str =
    "Contraseña incorrecta. Por favor, inicia el proceso de nuevo ingresando tu RUT o Email.";
pub const EMPTY_PASSWORD: &str = "No se recibió texto. Por favor, ingresa tu contraseña.";
pub const EMPTY_IDENTIFIER: &str =
    "No se recibió texto. Por favor, ingresa tu Email Corporativo o tu RUT.";

pub const LOGIN_REQUIRED_FOR_FEATURE: &str =
    "Por favor, inicia sesión para acceder a esta funcionalidad.";
pub const LOGIN_REQUIRED_TO_CONTINUE: &str = "Por favor, inicia sesión para continuar.";
pub const LOGIN_REQUIRED_FOR_MAIN: &str =
    "Por favor, inicia sesión para acceder al menú principal.";

pub const NO_DETAIL_PLACEHOLDER: &str =
    "Aún no tengo información detallada sobre esta opción. Por favor, consulta con tu Gestor de RRHH.";
pub const EMPTY_MENU_INPUT: &str =
    "No se recibió texto. Por favor, escribe el número o el nombre de una opción.";
pub const CAPTURE_NOT_UNDERSTOOD: &str =
    "No entendí tu respuesta. Por favor, ingresa el texto solicitado o escribe \"volver\" para cancelar.";

pub const KNOWLEDGE_NO_MATCH: &str = "No pude encontrar una opción de menú ni una respuesta en mi base de conocimientos para tu consulta. Por favor, intenta reformular tu pregunta o escribe \"menu\" para ver las opciones principales.";
pub const KNOWLEDGE_UNAVAILABLE: &str = "Lo siento, en este momento no puedo consultar mi base de conocimientos. Por favor, intenta más tarde o escribe \"menu\" para ver las opciones principales.";
/// Logged as the answer when the knowledge base has nothing to say.
pub const KNOWLEDGE_NO_ANSWER_LOGGED: &str = "No encontré una respuesta en la base de conocimientos.";
pub const KNOWLEDGE_FAILURE_LOGGED: &str =
    "Lo siento, hubo un problema al consultar mi base de conocimientos en este momento.";

pub const COURSE_NOT_RECOGNIZED: &str = "Opción de curso no reconocida. Por favor, seleccione un número válido o escriba \"volver\" para cancelar.";

pub fn welcome_back(name: &str) -> String {
    format!("¡Bienvenido de nuevo, {name}! ¿En qué le puedo asistir?")
}

pub fn login_succeeded(first_name: &str) -> String {
    format!("¡Bienvenido, {first_name}! Has iniciado sesión correctamente.")
}

pub fn locked_out(remaining_secs: i64) -> String {
    format!("Demasiados intentos fallidos. Por favor, espera {remaining_secs} segundos.")
}

pub fn capture_cancelled(kind: CaptureKind) -> &'static str {
    match kind {
        CaptureKind::UserQuery => {
            "Envío de consulta cancelado. Volviendo al menú de Consultas Generales."
        }
        CaptureKind::CourseSelection => {
            "Solicitud de curso cancelada. Volviendo al menú de Crecimiento y Desarrollo."
        }
        CaptureKind::AnonymousComplaint => {
            "Envío de denuncia cancelado. Volviendo al menú de Procedimiento para Denuncias."
        }
    }
}

pub fn capture_empty(kind: CaptureKind) -> &'static str {
    match kind {
        CaptureKind::UserQuery => {
            "No se recibió texto. Por favor, escribe tu consulta o \"volver\" para cancelar."
        }
        CaptureKind::CourseSelection => COURSE_NOT_RECOGNIZED,
        CaptureKind::AnonymousComplaint => {
            "No se recibió texto. Por favor, escribe tu denuncia o \"volver\" para cancelar."
        }
    }
}

pub fn submission_succeeded(kind: CaptureKind, course: Option<&str>) -> String {
    match kind {
        CaptureKind::UserQuery => "Su consulta ha sido enviada al equipo de soporte. Le contactaremos a la brevedad posible.".to_string(),
        CaptureKind::CourseSelection => format!(
            "Su solicitud para el curso \"{}\" ha sido enviada al área de Talento y Desarrollo. Le contactarán pronto.",
            course.unwrap_or_default()
        ),
        CaptureKind::AnonymousComplaint => "Su denuncia anónima ha sido enviada con éxito. Agradecemos su contribución para mantener un ambiente de integridad.".to_string(),
    }
}

pub fn submission_failed(kind: CaptureKind) -> &'static str {
    match kind {
        CaptureKind::UserQuery => "Hubo un problema al enviar su consulta. Por favor, intente de nuevo más tarde o contacte directamente a RRHH.",
        CaptureKind::CourseSelection => "Hubo un problema al enviar su solicitud de curso. Por favor, intente de nuevo más tarde.",
        CaptureKind::AnonymousComplaint => "Hubo un problema al enviar su denuncia. Por favor, intente de nuevo más tarde o utilice otro canal de reporte.",
    }
}
