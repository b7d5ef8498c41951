//! Execution error log.
//!
//! Deployment-level error history shown to operators: resource failures per
//! stack and one line per failed step.

use crate::error::Result;
use crate::models::{DistributionContext, StackKey};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub const CLOUDFORMATION_ERROR_TYPE: &str = "CloudFormation";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackErrorEntry {
    pub resource_name: String,
    pub resource_status: String,
    pub error_type: String,
    pub error: String,
    pub step_name: String,
    pub stack_name: String,
    pub region: String,
}

#[async_trait]
pub trait ExecutionErrorLog: Send + Sync {
    async fn add_stack_error(
        &self,
        distribution: &DistributionContext,
        stack_key: &StackKey,
        entry: StackErrorEntry,
    ) -> Result<()>;

    async fn add_execution_error(
        &self,
        distribution: &DistributionContext,
        message: &str,
    ) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryExecutionErrorLog {
    stack_errors: Mutex<Vec<(String, StackErrorEntry)>>,
    execution_errors: Mutex<Vec<(String, String)>>,
}

impl InMemoryExecutionErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(stack key, entry)` pairs in insertion order
    pub fn stack_errors(&self) -> Vec<(String, StackErrorEntry)> {
        self.stack_errors.lock().clone()
    }

    /// `(object identifier, message)` pairs in insertion order
    pub fn execution_errors(&self) -> Vec<(String, String)> {
        self.execution_errors.lock().clone()
    }
}

#[async_trait]
impl ExecutionErrorLog for InMemoryExecutionErrorLog {
    async fn add_stack_error(
        &self,
        _distribution: &DistributionContext,
        stack_key: &StackKey,
        entry: StackErrorEntry,
    ) -> Result<()> {
        self.stack_errors.lock().push((stack_key.to_string(), entry));
        Ok(())
    }

    async fn add_execution_error(
        &self,
        distribution: &DistributionContext,
        message: &str,
    ) -> Result<()> {
        self.execution_errors
            .lock()
            .push((distribution.object_identifier.clone(), message.to_string()));
        Ok(())
    }
}
