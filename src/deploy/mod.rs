//! # Stack Deployment
//!
//! Turns one workflow-step invocation into at most one backend mutation.
//!
//! ## Strategies
//!
//! - **Callback**: the mutation carries the orchestrator's notification
//!   channel; completion is reported later by the
//!   [`CompletionReporter`](crate::events::CompletionReporter) when the stack's
//!   final notification arrives.
//! - **Polling**: used across region/account boundaries, or to delete a stack
//!   with no channel attached. Every invocation inspects the backend, reports
//!   `IsExecuting` while the operation runs, and reports completion itself.
//!
//! Neither strategy blocks: each invocation runs to completion and returns a
//! [`DeployOutcome`].

pub mod callback;
pub mod error_handler;
pub mod handler;
pub mod polling;
pub mod selector;

use crate::events::CompletionOutcome;
use crate::workflow::FailureCode;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use callback::CallbackDeployer;
pub use error_handler::DeployErrorHandler;
pub use handler::StackDeployHandler;
pub use polling::PollingDeployer;
pub use selector::StrategySelector;

/// How completion of a stack operation is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStrategy {
    Callback,
    Polling,
}

impl fmt::Display for DeliveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStrategy::Callback => write!(f, "callback"),
            DeliveryStrategy::Polling => write!(f, "polling"),
        }
    }
}

/// Result of one deploy invocation
#[derive(Debug, Clone, PartialEq)]
pub enum DeployOutcome {
    /// Mutation issued; the step waits for the stack's final notification
    AwaitingNotification { stack_id: Option<String> },
    /// `IsExecuting` reported; the engine re-invokes the step later
    InProgress,
    /// Terminal state reported to the workflow engine
    Completed(CompletionOutcome),
    /// Failure reported to the workflow engine
    Failed { code: FailureCode, message: String },
}

impl DeployOutcome {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, DeployOutcome::InProgress)
    }
}
