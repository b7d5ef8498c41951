//! # Workflow Engine Callbacks
//!
//! The engine pauses a step and hands out a resumption token; the reconciler
//! later calls back with success or failure. Failure codes are matched by the
//! pipeline's own retry policy, so their strings are stable.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes reported with `report-failure`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCode {
    /// Still running; the engine should re-invoke the step later
    IsExecuting,
    RollBackCompleteState,
    ValidationError,
    AccessDenied,
    UnknownError,
    StackContention,
    /// Outputs could not be assembled
    OutputUnavailable,
    /// Backend failure status of the stack, passed through
    StackStatus(String),
    /// Backend error code, passed through
    Backend(String),
}

impl FailureCode {
    pub fn as_str(&self) -> &str {
        match self {
            FailureCode::IsExecuting => "IsExecuting",
            FailureCode::RollBackCompleteState => "RollBackCompleteState",
            FailureCode::ValidationError => "ValidationError",
            FailureCode::AccessDenied => "AccessDenied",
            FailureCode::UnknownError => "UnknownError",
            FailureCode::StackContention => "StackContention",
            FailureCode::OutputUnavailable => "unknown",
            FailureCode::StackStatus(status) => status,
            FailureCode::Backend(code) => code,
        }
    }

    /// True for the code asking the engine to retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureCode::IsExecuting)
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback primitives of the workflow engine
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Resume the paused step with a JSON payload
    async fn report_success(&self, token: &str, payload: serde_json::Value) -> Result<()>;

    /// Fail the paused step
    async fn report_failure(&self, token: &str, message: &str, code: &FailureCode) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes_have_stable_strings() {
        assert_eq!(FailureCode::IsExecuting.as_str(), "IsExecuting");
        assert_eq!(FailureCode::RollBackCompleteState.as_str(), "RollBackCompleteState");
        assert_eq!(FailureCode::OutputUnavailable.as_str(), "unknown");
        assert_eq!(FailureCode::StackStatus("UPDATE_FAILED".into()).as_str(), "UPDATE_FAILED");
        assert_eq!(FailureCode::Backend("Throttling".into()).to_string(), "Throttling");
    }

    #[test]
    fn test_only_is_executing_is_retryable() {
        assert!(FailureCode::IsExecuting.is_retryable());
        assert!(!FailureCode::StackContention.is_retryable());
        assert!(!FailureCode::UnknownError.is_retryable());
    }
}
