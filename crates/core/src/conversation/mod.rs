//! The conversation state machine: per-turn dispatch over the menu table, the
//! navigation stack, modal free-text capture and the login flow.

pub mod auth;
pub mod capture;
pub mod dispatcher;
pub mod engine;
pub mod messages;
pub mod navigation;
pub mod state;
pub mod turn;

pub use auth::{AuthMenu, LockoutPolicy};
pub use capture::{capture_payload, CaptureHandler};
pub use dispatcher::{MenuHandler, OptionMenu, UserInput};
pub use engine::{Collaborators, ConversationEngine, EngineSettings, TurnReply};
pub use navigation::Navigator;
pub use state::{default_state, AuthStep, AwaitingFreeText, ConversationId, ConversationState};
pub use turn::{DispatchResult, Effect, Effects, TurnContext};
