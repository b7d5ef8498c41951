//! Execution identity and the client request token derived from it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ARN of a running workflow execution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionArn(String);

impl ExecutionArn {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Execution id: everything after the last `:`
    pub fn execution_id(&self) -> &str {
        match self.0.rfind(':') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }
}

impl fmt::Display for ExecutionArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Idempotency token attached to every backend mutation.
///
/// The execution id forms the prefix; a millisecond timestamp makes each
/// invocation's token distinct. Execution identity is a prefix match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientRequestToken(String);

impl ClientRequestToken {
    pub fn create(execution_arn: &ExecutionArn) -> Self {
        Self(format!(
            "{}{}",
            execution_arn.execution_id(),
            Utc::now().timestamp_millis()
        ))
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn belongs_to(&self, execution_arn: &ExecutionArn) -> bool {
        is_same_execution(Some(&self.0), execution_arn)
    }
}

impl fmt::Display for ClientRequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a token observed on the backend was issued by `execution_arn`.
/// An absent token never matches.
pub fn is_same_execution(observed: Option<&str>, execution_arn: &ExecutionArn) -> bool {
    observed.is_some_and(|token| token.starts_with(execution_arn.execution_id()))
}
