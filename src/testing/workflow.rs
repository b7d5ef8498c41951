//! Workflow engine double recording every callback.

use crate::error::{ReconcilerError, Result};
use crate::workflow::{FailureCode, WorkflowEngine};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowReport {
    Success {
        token: String,
        payload: Value,
    },
    Failure {
        token: String,
        message: String,
        code: FailureCode,
    },
}

impl WorkflowReport {
    pub fn token(&self) -> &str {
        match self {
            WorkflowReport::Success { token, .. } | WorkflowReport::Failure { token, .. } => token,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingWorkflowEngine {
    reports: Mutex<Vec<WorkflowReport>>,
    reject_next: Mutex<Option<String>>,
}

impl RecordingWorkflowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<WorkflowReport> {
        self.reports.lock().clone()
    }

    pub fn successes(&self) -> Vec<(String, Value)> {
        self.reports
            .lock()
            .iter()
            .filter_map(|report| match report {
                WorkflowReport::Success { token, payload } => {
                    Some((token.clone(), payload.clone()))
                }
                WorkflowReport::Failure { .. } => None,
            })
            .collect()
    }

    /// `(token, message, code)` triples in report order
    pub fn failures(&self) -> Vec<(String, String, FailureCode)> {
        self.reports
            .lock()
            .iter()
            .filter_map(|report| match report {
                WorkflowReport::Failure {
                    token,
                    message,
                    code,
                } => Some((token.clone(), message.clone(), code.clone())),
                WorkflowReport::Success { .. } => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<WorkflowReport> {
        self.reports.lock().last().cloned()
    }

    /// Make the next callback fail, as an expired resumption token would
    pub fn reject_next(&self, message: impl Into<String>) {
        *self.reject_next.lock() = Some(message.into());
    }

    fn check_rejection(&self) -> Result<()> {
        match self.reject_next.lock().take() {
            Some(message) => Err(ReconcilerError::Workflow(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkflowEngine for RecordingWorkflowEngine {
    async fn report_success(&self, token: &str, payload: Value) -> Result<()> {
        self.check_rejection()?;
        self.reports.lock().push(WorkflowReport::Success {
            token: token.to_string(),
            payload,
        });
        Ok(())
    }

    async fn report_failure(&self, token: &str, message: &str, code: &FailureCode) -> Result<()> {
        self.check_rejection()?;
        self.reports.lock().push(WorkflowReport::Failure {
            token: token.to_string(),
            message: message.to_string(),
            code: code.clone(),
        });
        Ok(())
    }
}
