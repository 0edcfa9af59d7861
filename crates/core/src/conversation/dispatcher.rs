use async_trait::async_trait;

use crate::conversation::messages;
use crate::conversation::navigation::Navigator;
use crate::conversation::state::ConversationState;
use crate::conversation::turn::{DispatchResult, Effect, Effects, TurnContext};
use crate::domain::menu::{contains_return_token, MenuDefinition, MenuId, OptionAction, Selection};

/// Inbound text after trimming, with the lowercase form and integer reading used for matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInput<'t> {
    pub trimmed: &'t str,
    pub lowered: String,
    pub number: Option<i64>,
}

impl<'t> UserInput<'t> {
    pub fn parse(raw: &'t str) -> Self {
        let trimmed = raw.trim();
        Self { trimmed, lowered: trimmed.to_lowercase(), number: trimmed.parse::<i64>().ok() }
    }

    pub fn is_empty(&self) -> bool {
        self.trimmed.is_empty()
    }
}

#[async_trait]
pub trait MenuHandler: Send + Sync {
    fn menu_id(&self) -> MenuId;

    fn show(&self, state: &ConversationState) -> String;

    async fn handle_input(
        &self,
        ctx: &TurnContext,
        raw_text: &str,
        state: &mut ConversationState,
    ) -> DispatchResult;
}

/// Table-driven handler shared by every option menu.
pub struct OptionMenu<'a> {
    definition: &'static MenuDefinition,
    navigator: &'a Navigator<'a>,
}

impl<'a> OptionMenu<'a> {
    pub fn new(menu: MenuId, navigator: &'a Navigator<'a>) -> Self {
        Self { definition: menu.definition(), navigator }
    }

    pub fn dispatch(&self, input: &UserInput<'_>, state: &mut ConversationState) -> DispatchResult {
        if state.is_showing_content && contains_return_token(&input.lowered) {
            state.is_showing_content = false;
            let mut effects = Effects::new();
            effects.reply(self.show(state));
            return DispatchResult::Handled(effects);
        }

        let selection = match input.number {
            Some(number) => self.definition.select_by_number(number),
            None => self.definition.select_by_text(&input.lowered),
        };

        match selection {
            Some(selection) => DispatchResult::Handled(self.apply(selection, state)),
            None => DispatchResult::Unhandled,
        }
    }

    fn apply(&self, selection: Selection, state: &mut ConversationState) -> Effects {
        let option = match selection {
            Selection::Return => return self.navigator.go_back(state),
            Selection::Option(option) => option,
        };

        match option.action {
            OptionAction::Navigate(target) => self.navigator.navigate_to(state, target),
            OptionAction::StartCapture(kind) => {
                state.start_capture(kind);
                state.is_showing_content = false;
                let mut effects = Effects::new();
                effects.push(Effect::CaptureStarted(kind));
                effects.reply(self.navigator.capture_prompt(state, kind));
                effects
            }
            OptionAction::ShowContent => {
                let text = option
                    .content_key
                    .and_then(|key| self.navigator.content().resolve(key, state.site_id()))
                    .unwrap_or(messages::NO_DETAIL_PLACEHOLDER);
                state.is_showing_content = true;
                let mut effects = Effects::new();
                effects.push(Effect::ShowedContent { label: option.label });
                effects.reply(text);
                effects
            }
        }
    }
}

#[async_trait]
impl<'a> MenuHandler for OptionMenu<'a> {
    fn menu_id(&self) -> MenuId {
        self.definition.id
    }

    fn show(&self, state: &ConversationState) -> String {
        self.navigator.render(state, self.definition.id)
    }

    async fn handle_input(
        &self,
        _ctx: &TurnContext,
        raw_text: &str,
        state: &mut ConversationState,
    ) -> DispatchResult {
        self.dispatch(&UserInput::parse(raw_text), state)
    }
}
