pub mod content;
pub mod employee;
pub mod menu;

pub use content::{ContentEntry, ContentResolver, ContentTable};
pub use employee::{EmployeeId, EmployeeProfile, EmployeeRecord};
pub use menu::{CaptureKind, MenuDefinition, MenuId, MenuOption, OptionAction, Selection};
