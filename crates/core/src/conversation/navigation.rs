use crate::conversation::messages;
use crate::conversation::state::ConversationState;
use crate::conversation::turn::{Effect, Effects};
use crate::domain::content::ContentResolver;
use crate::domain::menu::{render_course_catalog, CaptureKind, MenuId};

/// Owns every transition of `current_menu_id` and `menu_stack`.
pub struct Navigator<'a> {
    content: &'a dyn ContentResolver,
}

impl<'a> Navigator<'a> {
    pub fn new(content: &'a dyn ContentResolver) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &'a dyn ContentResolver {
        self.content
    }

    /// Text shown for a menu in the current state: the capture prompt while the
    /// menu owns an active capture, otherwise its option list.
    pub fn render(&self, state: &ConversationState, menu: MenuId) -> String {
        match menu {
            MenuId::Auth if state.pending_auth.is_some() => messages::PASSWORD_PROMPT.to_string(),
            MenuId::Auth => messages::IDENTIFIER_PROMPT.to_string(),
            MenuId::Main if !state.is_authenticated => {
                messages::LOGIN_REQUIRED_FOR_MAIN.to_string()
            }
            _ => match state.awaiting_free_text.kind() {
                Some(kind) if kind.owner() == menu => self.capture_prompt(state, kind),
                _ => menu.definition().render(),
            },
        }
    }

    pub fn capture_prompt(&self, state: &ConversationState, kind: CaptureKind) -> String {
        if kind == CaptureKind::CourseSelection {
            return render_course_catalog();
        }

        kind.owner()
            .definition()
            .capture_option(kind)
            .and_then(|option| option.content_key)
            .and_then(|key| self.content.resolve(key, state.site_id()))
            .map(str::to_string)
            .unwrap_or_else(|| messages::CAPTURE_NOT_UNDERSTOOD.to_string())
    }

    pub fn show_current(&self, state: &ConversationState, effects: &mut Effects) {
        effects.reply(self.render(state, state.current_menu_id));
    }

    pub fn navigate_to(&self, state: &mut ConversationState, target: MenuId) -> Effects {
        let mut effects = Effects::new();
        if !state.is_authenticated && target != MenuId::Auth {
            self.require_login(state, messages::LOGIN_REQUIRED_FOR_FEATURE, &mut effects);
            return effects;
        }

        state.reset_awaiting_states();
        let from = state.current_menu_id;
        if from != target {
            state.menu_stack.push(from);
        }
        state.current_menu_id = target;
        state.is_showing_content = false;

        effects.push(Effect::Navigated { from, to: target });
        self.show_current(state, &mut effects);
        effects
    }

    pub fn go_back(&self, state: &mut ConversationState) -> Effects {
        let mut effects = Effects::new();
        if !state.is_authenticated && state.menu_stack.is_empty() {
            self.require_login(state, messages::LOGIN_REQUIRED_TO_CONTINUE, &mut effects);
            return effects;
        }

        state.reset_awaiting_states();
        state.is_showing_content = false;
        match state.menu_stack.pop() {
            Some(previous) => {
                state.current_menu_id = previous;
                effects.push(Effect::WentBack { to: previous });
            }
            None => {
                let home = if state.is_authenticated { MenuId::Main } else { MenuId::Auth };
                state.current_menu_id = home;
                effects.push(Effect::WentHome { to: home });
            }
        }

        self.show_current(state, &mut effects);
        effects
    }

    /// Global "menu" command.
    pub fn go_home(&self, state: &mut ConversationState) -> Effects {
        let mut effects = Effects::new();
        state.reset_awaiting_states();
        state.menu_stack.clear();

        if !state.is_authenticated {
            self.require_login(state, messages::LOGIN_REQUIRED_FOR_MAIN, &mut effects);
            return effects;
        }

        state.current_menu_id = MenuId::Main;
        state.is_showing_content = false;
        effects.push(Effect::WentHome { to: MenuId::Main });
        self.show_current(state, &mut effects);
        effects
    }

    /// Lands a freshly authenticated conversation on the main menu with an empty stack.
    pub fn enter_main(&self, state: &mut ConversationState) -> Effects {
        state.reset_awaiting_states();
        state.menu_stack.clear();
        state.current_menu_id = MenuId::Main;
        state.is_showing_content = false;

        let mut effects = Effects::new();
        effects.push(Effect::WentHome { to: MenuId::Main });
        self.show_current(state, &mut effects);
        effects
    }

    fn require_login(&self, state: &ConversationState, message: &str, effects: &mut Effects) {
        effects.reply(message);
        effects.push(Effect::AuthenticationRequired);
        effects.reply(self.render(state, MenuId::Auth));
    }
}
