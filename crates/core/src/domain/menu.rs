use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const RETURN_LABEL: &str = "Volver";
pub const RETURN_TOKENS: [&str; 2] = ["volver", "back"];
pub const MENU_FOOTER: &str = "\nPor favor, escribe el número o el nombre de la opción.";

/// Minimum input length for the partial-label fallback.
const PARTIAL_MATCH_MIN_CHARS: usize = 3;

pub const COURSE_CATALOG: [&str; 5] = [
    "Capacitación en Liderazgo Avanzado",
    "Gestión de Proyectos Mineros",
    "Seguridad Operacional y Normativas HSE",
    "Tecnologías de Data Analytics para Minería",
    "Comunicación Efectiva en Equipos Multifuncionales",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MenuId {
    Auth,
    Main,
    Vacaciones,
    Beneficios,
    SaludSeguros,
    BienestarConciliacion,
    CulturaValores,
    CrecimientoDesarrollo,
    ConsultasGenerales,
    TiposPermisosLegales,
    TiposSegurosSalud,
    ProgramasInternos,
    ApoyoFamiliar,
    ProcedimientoDenuncias,
    ProgramasCapacitacionInterna,
}

impl MenuId {
    pub const ALL: [MenuId; 15] = [
        MenuId::Auth,
        MenuId::Main,
        MenuId::Vacaciones,
        MenuId::Beneficios,
        MenuId::SaludSeguros,
        MenuId::BienestarConciliacion,
        MenuId::CulturaValores,
        MenuId::CrecimientoDesarrollo,
        MenuId::ConsultasGenerales,
        MenuId::TiposPermisosLegales,
        MenuId::TiposSegurosSalud,
        MenuId::ProgramasInternos,
        MenuId::ApoyoFamiliar,
        MenuId::ProcedimientoDenuncias,
        MenuId::ProgramasCapacitacionInterna,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Main => "main",
            Self::Vacaciones => "vacaciones",
            Self::Beneficios => "beneficios",
            Self::SaludSeguros => "saludSeguros",
            Self::BienestarConciliacion => "bienestarConciliacion",
            Self::CulturaValores => "culturaValores",
            Self::CrecimientoDesarrollo => "crecimientoDesarrollo",
            Self::ConsultasGenerales => "consultasGenerales",
            Self::TiposPermisosLegales => "tiposPermisosLegales",
            Self::TiposSegurosSalud => "tiposSegurosSalud",
            Self::ProgramasInternos => "programasInternos",
            Self::ApoyoFamiliar => "apoyoFamiliar",
            Self::ProcedimientoDenuncias => "procedimientoDenuncias",
            Self::ProgramasCapacitacionInterna => "programasCapacitacionInterna",
        }
    }

    pub fn definition(self) -> &'static MenuDefinition {
        match self {
            Self::Auth => &AUTH,
            Self::Main => &MAIN,
            Self::Vacaciones => &VACACIONES,
            Self::Beneficios => &BENEFICIOS,
            Self::SaludSeguros => &SALUD_SEGUROS,
            Self::BienestarConciliacion => &BIENESTAR_CONCILIACION,
            Self::CulturaValores => &CULTURA_VALORES,
            Self::CrecimientoDesarrollo => &CRECIMIENTO_DESARROLLO,
            Self::ConsultasGenerales => &CONSULTAS_GENERALES,
            Self::TiposPermisosLegales => &TIPOS_PERMISOS_LEGALES,
            Self::TiposSegurosSalud => &TIPOS_SEGUROS_SALUD,
            Self::ProgramasInternos => &PROGRAMAS_INTERNOS,
            Self::ApoyoFamiliar => &APOYO_FAMILIAR,
            Self::ProcedimientoDenuncias => &PROCEDIMIENTO_DENUNCIAS,
            Self::ProgramasCapacitacionInterna => &PROGRAMAS_CAPACITACION_INTERNA,
        }
    }
}

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MenuId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| DomainError::UnknownMenu(value.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureKind {
    UserQuery,
    CourseSelection,
    AnonymousComplaint,
}

impl CaptureKind {
    /// Menu that starts this capture and is re-rendered when it ends.
    pub fn owner(self) -> MenuId {
        match self {
            Self::UserQuery => MenuId::ConsultasGenerales,
            Self::CourseSelection => MenuId::CrecimientoDesarrollo,
            Self::AnonymousComplaint => MenuId::ProcedimientoDenuncias,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionAction {
    ShowContent,
    Navigate(MenuId),
    StartCapture(CaptureKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuOption {
    pub label: &'static str,
    pub content_key: Option<&'static str>,
    pub action: OptionAction,
}

impl MenuOption {
    fn matches_partially(&self) -> bool {
        !matches!(self.action, OptionAction::ShowContent)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Option(&'static MenuOption),
    Return,
}

#[derive(Debug, PartialEq, Eq)]
pub struct MenuDefinition {
    pub id: MenuId,
    pub title: &'static str,
    pub options: &'static [MenuOption],
    pub has_return_option: bool,
}

impl MenuDefinition {
    pub fn slot_count(&self) -> usize {
        self.options.len() + usize::from(self.has_return_option)
    }

    pub fn select_by_number(&self, number: i64) -> Option<Selection> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        if let Some(option) = self.options.get(index) {
            return Some(Selection::Option(option));
        }
        (self.has_return_option && index == self.options.len()).then_some(Selection::Return)
    }

    /// Matches lowercased input: exact label, then partial label for navigation and
    /// capture options, then the return token.
    pub fn select_by_text(&self, lowered: &str) -> Option<Selection> {
        if lowered.is_empty() {
            return None;
        }

        if let Some(option) =
            self.options.iter().find(|option| option.label.to_lowercase() == lowered)
        {
            return Some(Selection::Option(option));
        }

        if let Some(option) = self.partial_match(lowered) {
            return Some(Selection::Option(option));
        }

        if self.has_return_option && contains_return_token(lowered) {
            return Some(Selection::Return);
        }

        None
    }

    fn partial_match(&self, lowered: &str) -> Option<&'static MenuOption> {
        let candidates = self.options.iter().filter(|option| option.matches_partially());

        let contained = candidates
            .clone()
            .filter(|option| lowered.contains(&option.label.to_lowercase()))
            .max_by_key(|option| option.label.chars().count());
        if contained.is_some() {
            return contained;
        }

        if lowered.chars().count() < PARTIAL_MATCH_MIN_CHARS {
            return None;
        }

        let mut containing =
            candidates.filter(|option| option.label.to_lowercase().contains(lowered));
        match (containing.next(), containing.next()) {
            (Some(option), None) => Some(option),
            _ => None,
        }
    }

    pub fn capture_option(&self, kind: CaptureKind) -> Option<&'static MenuOption> {
        self.options.iter().find(|option| option.action == OptionAction::StartCapture(kind))
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.slot_count() + 2);
        lines.push(format!("{}:", self.title));
        for (index, option) in self.options.iter().enumerate() {
            lines.push(format!("{}. {}", index + 1, option.label));
        }
        if self.has_return_option {
            lines.push(format!("{}. {}", self.options.len() + 1, RETURN_LABEL));
        }
        lines.push(MENU_FOOTER.to_string());
        lines.join("\n")
    }
}

pub fn contains_return_token(lowered: &str) -> bool {
    RETURN_TOKENS.iter().any(|token| lowered.contains(token))
}

pub fn render_course_catalog() -> String {
    let mut lines = vec!["Por favor, selecciona el número del curso que deseas solicitar:".to_string()];
    for (index, course) in COURSE_CATALOG.iter().enumerate() {
        lines.push(format!("{}. {}", index + 1, course));
    }
    lines.push(format!("\nTambién puedes escribir \"{RETURN_LABEL}\" para cancelar."));
    lines.join("\n")
}

/// Resolves a course by catalogue number or by (partial) name.
pub fn find_course(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim();
    if let Ok(number) = trimmed.parse::<usize>() {
        return number.checked_sub(1).and_then(|index| COURSE_CATALOG.get(index)).copied();
    }

    let lowered = trimmed.to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    if let Some(course) = COURSE_CATALOG.iter().find(|course| course.to_lowercase() == lowered) {
        return Some(course);
    }
    if lowered.chars().count() < PARTIAL_MATCH_MIN_CHARS {
        return None;
    }
    COURSE_CATALOG.iter().find(|course| course.to_lowercase().contains(&lowered)).copied()
}

const fn content(label: &'static str, key: &'static str) -> MenuOption {
    MenuOption { label, content_key: Some(key), action: OptionAction::ShowContent }
}

const fn navigate(label: &'static str, target: MenuId) -> MenuOption {
    MenuOption { label, content_key: None, action: OptionAction::Navigate(target) }
}

const fn capture(label: &'static str, prompt_key: &'static str, kind: CaptureKind) -> MenuOption {
    MenuOption { label, content_key: Some(prompt_key), action: OptionAction::StartCapture(kind) }
}

static AUTH: MenuDefinition =
    MenuDefinition { id: MenuId::Auth, title: "Autenticación", options: &[], has_return_option: false };

static MAIN: MenuDefinition = MenuDefinition {
    id: MenuId::Main,
    title: "Menú principal",
    options: &[
        navigate("Vacaciones, Licencias y Permisos", MenuId::Vacaciones),
        navigate("Beneficios Económicos", MenuId::Beneficios),
        navigate("Salud y Seguros", MenuId::SaludSeguros),
        navigate("Bienestar y Conciliación", MenuId::BienestarConciliacion),
        navigate("Cultura y Valores", MenuId::CulturaValores),
        navigate("Crecimiento y Desarrollo", MenuId::CrecimientoDesarrollo),
        navigate("Consultas Generales y Otros", MenuId::ConsultasGenerales),
    ],
    has_return_option: false,
};

static VACACIONES: MenuDefinition = MenuDefinition {
    id: MenuId::Vacaciones,
    title: "Vacaciones, Licencias y Permisos",
    options: &[
        content("Solicitar vacaciones", "solicitar vacaciones"),
        content("Consultar saldo de vacaciones", "consultar saldo de vacaciones"),
        content("Procedimiento de licencia médica", "procedimiento de licencia médica"),
        navigate("Tipos de Permisos Legales", MenuId::TiposPermisosLegales),
    ],
    has_return_option: true,
};

static BENEFICIOS: MenuDefinition = MenuDefinition {
    id: MenuId::Beneficios,
    title: "Beneficios Económicos",
    options: &[
        content("Bonos de desempeño", "bonos de desempeño"),
        content("Asignación de escolaridad", "asignación de escolaridad"),
        content("Aguinaldos y gratificaciones", "aguinaldos y gratificaciones"),
        content("Viáticos y reembolsos", "viáticos y reembolsos"),
        content("Descuentos corporativos", "descuentos corporativos"),
    ],
    has_return_option: true,
};

static SALUD_SEGUROS: MenuDefinition = MenuDefinition {
    id: MenuId::SaludSeguros,
    title: "Salud y Seguros",
    options: &[
        content(
            "Procedimiento de reembolso médico/dental",
            "procedimiento de reembolso médico/dental",
        ),
        content("Beneficios de salud mental", "beneficios de salud mental"),
        content(
            "Seguro de vida y cobertura en accidentes laborales",
            "seguro de vida y cobertura en accidentes laborales",
        ),
        navigate("Tipos de Seguros de Salud", MenuId::TiposSegurosSalud),
    ],
    has_return_option: true,
};

static BIENESTAR_CONCILIACION: MenuDefinition = MenuDefinition {
    id: MenuId::BienestarConciliacion,
    title: "Bienestar y Conciliación",
    options: &[
        content(
            "Programas de bienestar físico y psicológico",
            "programas de bienestar físico y psicológico",
        ),
        content("Iniciativas de conciliación vida-trabajo", "iniciativas de conciliación vida-trabajo"),
        navigate("Programas Internos", MenuId::ProgramasInternos),
        navigate("Apoyo Familiar", MenuId::ApoyoFamiliar),
    ],
    has_return_option: true,
};

static CULTURA_VALORES: MenuDefinition = MenuDefinition {
    id: MenuId::CulturaValores,
    title: "Cultura y Valores",
    options: &[
        content("Código de ética y conducta", "código de ética y conducta"),
        content(
            "Valores corporativos y compromisos de diversidad",
            "valores corporativos y compromisos de diversidad",
        ),
        content("Canales de reporte confidencial", "canales de reporte confidencial"),
        navigate("Procedimiento para Denuncias", MenuId::ProcedimientoDenuncias),
    ],
    has_return_option: true,
};

static CRECIMIENTO_DESARROLLO: MenuDefinition = MenuDefinition {
    id: MenuId::CrecimientoDesarrollo,
    title: "Crecimiento y Desarrollo",
    options: &[
        content("Programa de trainees o becas de estudio", "programa de trainees o becas de estudio"),
        content(
            "Evaluación de desempeño y retroalimentación",
            "evaluación de desempeño y retroalimentación",
        ),
        content("Planes de carrera y movilidad interna", "planes de carrera y movilidad interna"),
        navigate("Programas de Capacitación Interna", MenuId::ProgramasCapacitacionInterna),
        capture("Solicitar Curso", "solicitar curso", CaptureKind::CourseSelection),
    ],
    has_return_option: true,
};

static CONSULTAS_GENERALES: MenuDefinition = MenuDefinition {
    id: MenuId::ConsultasGenerales,
    title: "Consultas Generales y Otros",
    options: &[
        content("Información general de la empresa", "información general de la empresa"),
        capture("No encontré lo que buscaba", "no encontré lo que buscaba", CaptureKind::UserQuery),
    ],
    has_return_option: true,
};

static TIPOS_PERMISOS_LEGALES: MenuDefinition = MenuDefinition {
    id: MenuId::TiposPermisosLegales,
    title: "Tipos de Permisos Legales",
    options: &[
        content("Permiso por Matrimonio", "permiso por matrimonio"),
        content("Permiso por Fallecimiento", "permiso por fallecimiento"),
        content("Permiso por Estudios", "permiso por estudios"),
        content("Otros Permisos Legales", "otros permisos legales"),
    ],
    has_return_option: true,
};

static TIPOS_SEGUROS_SALUD: MenuDefinition = MenuDefinition {
    id: MenuId::TiposSegurosSalud,
    title: "Tipos de Seguros de Salud",
    options: &[
        content("Seguro Médico", "seguro médico"),
        content("Seguro Dental", "seguro dental"),
        content("Seguro Catastrófico", "seguro catastrófico"),
    ],
    has_return_option: true,
};

static PROGRAMAS_INTERNOS: MenuDefinition = MenuDefinition {
    id: MenuId::ProgramasInternos,
    title: "Programas Internos",
    options: &[
        content("ViveTarapacá", "vivetarapacá"),
        content("Voluntariado Corporativo", "voluntariado corporativo"),
        content("Club Deportivo", "club deportivo"),
    ],
    has_return_option: true,
};

static APOYO_FAMILIAR: MenuDefinition = MenuDefinition {
    id: MenuId::ApoyoFamiliar,
    title: "Apoyo Familiar",
    options: &[
        content("Apoyo de Guardería", "apoyo de guardería"),
        content("Becas de Estudio para Hijos", "becas de estudio para hijos"),
        content(
            "Días Administrativos por Cuidado Familiar",
            "días administrativos por cuidado familiar",
        ),
    ],
    has_return_option: true,
};

static PROCEDIMIENTO_DENUNCIAS: MenuDefinition = MenuDefinition {
    id: MenuId::ProcedimientoDenuncias,
    title: "Procedimiento para Denuncias",
    options: &[
        content("Denuncia por Acoso", "denuncia por acoso"),
        content("Denuncia por Discriminación", "denuncia por discriminación"),
        content("Reporte de Conflicto de Interés", "reporte de conflicto de interés"),
        capture(
            "Realizar Denuncia Anónima",
            "realizar denuncia anónima",
            CaptureKind::AnonymousComplaint,
        ),
    ],
    has_return_option: true,
};

static PROGRAMAS_CAPACITACION_INTERNA: MenuDefinition = MenuDefinition {
    id: MenuId::ProgramasCapacitacionInterna,
    title: "Programas de Capacitación Interna",
    options: &[
        content(
            "Capacitación DCL (Desarrollo de Competencias de Liderazgo)",
            "capacitación dcl (desarrollo de competencias de liderazgo)",
        ),
        content(
            "Capacitación en SSO (Seguridad y Salud Ocupacional)",
            "capacitación en sso (seguridad y salud ocupacional)",
        ),
        content("Cursos Técnicos Específicos", "cursos técnicos específicos"),
    ],
    has_return_option: true,
};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{
        find_course, CaptureKind, MenuId, OptionAction, Selection, COURSE_CATALOG, RETURN_LABEL,
    };

    #[test]
    fn every_definition_is_keyed_by_its_own_id() {
        for id in MenuId::ALL {
            assert_eq!(id.definition().id, id, "definition for {id} has wrong id");
            assert_eq!(id.as_str().parse::<MenuId>(), Ok(id));
        }
    }

    #[test]
    fn labels_are_unique_within_each_menu() {
        for id in MenuId::ALL {
            let mut seen = HashSet::new();
            for option in id.definition().options {
                assert!(seen.insert(option.label.to_lowercase()), "duplicate label in {id}");
            }
        }
    }

    #[test]
    fn only_main_and_auth_lack_a_return_option() {
        for id in MenuId::ALL {
            let expected = !matches!(id, MenuId::Main | MenuId::Auth);
            assert_eq!(id.definition().has_return_option, expected, "{id}");
        }
    }

    #[test]
    fn every_capture_is_started_from_its_owner_menu() {
        for kind in
            [CaptureKind::UserQuery, CaptureKind::CourseSelection, CaptureKind::AnonymousComplaint]
        {
            assert!(kind.owner().definition().capture_option(kind).is_some(), "{kind:?}");
        }
    }

    #[test]
    fn menu_id_uses_camel_case_on_the_wire() {
        let encoded = serde_json::to_string(&MenuId::ProgramasCapacitacionInterna)
            .expect("menu id serializes");
        assert_eq!(encoded, "\"programasCapacitacionInterna\"");
    }

    #[test]
    fn numeric_selection_covers_options_and_return_slot() {
        let vacaciones = MenuId::Vacaciones.definition();
        assert!(matches!(
            vacaciones.select_by_number(4),
            Some(Selection::Option(option))
                if option.action == OptionAction::Navigate(MenuId::TiposPermisosLegales)
        ));
        assert_eq!(vacaciones.select_by_number(5), Some(Selection::Return));
        assert_eq!(vacaciones.select_by_number(6), None);
        assert_eq!(vacaciones.select_by_number(0), None);
        assert_eq!(vacaciones.select_by_number(-1), None);

        assert_eq!(MenuId::Main.definition().select_by_number(8), None);
    }

    #[test]
    fn text_selection_prefers_exact_label() {
        let main = MenuId::Main.definition();
        let selected = main.select_by_text("salud y seguros");
        assert!(matches!(
            selected,
            Some(Selection::Option(option)) if option.action == OptionAction::Navigate(MenuId::SaludSeguros)
        ));
    }

    #[test]
    fn partial_match_is_limited_to_navigation_and_capture_options() {
        let vacaciones = MenuId::Vacaciones.definition();
        assert!(matches!(
            vacaciones.select_by_text("quiero ver tipos de permisos legales"),
            Some(Selection::Option(option)) if option.label == "Tipos de Permisos Legales"
        ));
        assert_eq!(vacaciones.select_by_text("saldo"), None);

        let main = MenuId::Main.definition();
        assert!(matches!(
            main.select_by_text("vacaciones"),
            Some(Selection::Option(option)) if option.action == OptionAction::Navigate(MenuId::Vacaciones)
        ));
        assert_eq!(main.select_by_text("y"), None);
    }

    #[test]
    fn ambiguous_partial_input_is_not_matched() {
        assert_eq!(MenuId::Main.definition().select_by_text("ien"), None);

        let bienestar = MenuId::BienestarConciliacion.definition();
        assert!(matches!(
            bienestar.select_by_text("program"),
            Some(Selection::Option(option)) if option.label == "Programas Internos"
        ));
    }

    #[test]
    fn return_token_matches_by_substring_only_when_menu_has_return() {
        let beneficios = MenuId::Beneficios.definition();
        assert_eq!(beneficios.select_by_text("quiero volver"), Some(Selection::Return));
        assert_eq!(beneficios.select_by_text("back"), Some(Selection::Return));
        assert_eq!(MenuId::Main.definition().select_by_text("volver"), None);
    }

    #[test]
    fn rendering_lists_options_then_return_slot_and_footer() {
        let rendered = MenuId::ConsultasGenerales.definition().render();
        let expected = format!(
            "Consultas Generales y Otros:\n1. Información general de la empresa\n2. No encontré lo que buscaba\n3. {RETURN_LABEL}\n\nPor favor, escribe el número o el nombre de la opción."
        );
        assert_eq!(rendered, expected);

        let main = MenuId::Main.definition().render();
        assert!(main.starts_with("Menú principal:\n1. Vacaciones, Licencias y Permisos"));
        assert!(!main.contains(RETURN_LABEL));
    }

    #[test]
    fn courses_resolve_by_number_or_name() {
        assert_eq!(find_course("2"), Some(COURSE_CATALOG[1]));
        assert_eq!(find_course("9"), None);
        assert_eq!(find_course("0"), None);
        assert_eq!(find_course("data analytics"), Some(COURSE_CATALOG[3]));
        assert_eq!(find_course("xyz"), None);
        assert_eq!(find_course(""), None);
    }
}
