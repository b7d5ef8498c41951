//! # Stack Events
//!
//! Consumption of stack change notifications and reporting of terminal stack
//! states back to the workflow engine.

pub mod classifier;
pub mod notification;
pub mod output;
pub mod reporter;
pub mod stack_error;

pub use classifier::{classify, EventType};
pub use notification::StackNotification;
pub use output::{create_output, project_outputs};
pub use reporter::{CompletionOutcome, CompletionReporter, ManualCompletion, NotificationOutcome};
pub use stack_error::{resolve_from_events, StackError, StackErrorResolver};
