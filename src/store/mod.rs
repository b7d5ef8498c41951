//! # Coordination Store
//!
//! Durable per-stack record bridging the mutating invocation and the later
//! completion report. One record per [`StackKey`]; every write replaces the
//! whole record and the latest write wins. Conflicts between executions are
//! settled by client request token comparison, never by the store.

pub mod error_log;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use crate::error::Result;
use crate::models::{
    DesiredState, DistributionContext, ExecutionArn, StackKey, StackOperationContext,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error_log::{ExecutionErrorLog, InMemoryExecutionErrorLog, StackErrorEntry};
pub use memory::InMemoryCoordinationStore;
#[cfg(feature = "postgres")]
pub use postgres::PgCoordinationStore;

/// Resource-level failure recorded against a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceError {
    pub resource_name: String,
    pub resource_status: String,
    pub error: String,
}

/// The current desired operation for one stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRecord {
    pub stack_name: String,
    /// Token of the mutation this record describes
    pub client_request_token: String,
    /// Pending workflow resumption token; absent on the polling path
    pub resumption_token: Option<String>,
    pub desired_state: DesiredState,
    pub stack_id: Option<String>,
    pub execution_arn: ExecutionArn,
    pub step_name: String,
    pub output_path: Option<String>,
    pub template: String,
    pub region: String,
    pub distribution: DistributionContext,
    #[serde(default)]
    pub errors: Vec<ResourceError>,
    pub updated_at: DateTime<Utc>,
}

impl StackRecord {
    pub fn from_context(context: &StackOperationContext, key: &StackKey) -> Self {
        let configuration = context.configuration();
        Self {
            stack_name: configuration.stack_name.clone(),
            client_request_token: context.client_request_token().to_string(),
            resumption_token: None,
            desired_state: configuration.desired_state,
            stack_id: None,
            execution_arn: context.execution().execution_arn.clone(),
            step_name: context.execution().step_name.clone(),
            output_path: configuration.output_path.clone(),
            template: configuration.template.clone(),
            region: key.region.clone(),
            distribution: context.distribution().clone(),
            errors: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_stack_id(mut self, stack_id: impl Into<String>) -> Self {
        self.stack_id = Some(stack_id.into());
        self
    }

    pub fn with_resumption_token(mut self, token: impl Into<String>) -> Self {
        self.resumption_token = Some(token.into());
        self
    }

    /// Whether this record was written by `execution_arn`
    pub fn is_owned_by(&self, execution_arn: &ExecutionArn) -> bool {
        &self.execution_arn == execution_arn
    }
}

/// Last-writer-wins key-value store for [`StackRecord`]s
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Overwrite the record for `key`
    async fn put(&self, key: &StackKey, record: StackRecord) -> Result<()>;

    async fn get(&self, key: &StackKey) -> Result<Option<StackRecord>>;

    /// Remove the record; removing an absent record is not an error
    async fn delete(&self, key: &StackKey) -> Result<()>;
}

/// Plain SQL identifier usable as a store table name
pub(crate) fn is_sql_identifier(name: &str) -> bool {
    name.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorIdentity;
    use crate::models::{ExecutionMetadata, StackConfiguration};

    #[test]
    fn test_record_snapshot_from_context() {
        let orchestrator = OrchestratorIdentity::new("eu-west-1", "111111111111");
        let arn = ExecutionArn::new("arn:aws:states:eu-west-1:111111111111:execution:plan:run-1");
        let context = StackOperationContext::new(
            StackConfiguration::new("network", "https://bucket/network.yaml")
                .with_desired_state(DesiredState::Deleted)
                .with_output_path("net"),
            DistributionContext::new("platform", "dist-1", "prod", "obj-1"),
            ExecutionMetadata::new(arn.clone(), "sfn-token", "DeleteNetwork"),
        );
        let key = StackKey::for_configuration(context.configuration(), &orchestrator);

        let record = StackRecord::from_context(&context, &key)
            .with_stack_id("stack/network/1")
            .with_resumption_token("sfn-token");

        assert_eq!(record.client_request_token, context.client_request_token().as_str());
        assert_eq!(record.desired_state, DesiredState::Deleted);
        assert_eq!(record.output_path.as_deref(), Some("net"));
        assert_eq!(record.region, "eu-west-1");
        assert!(record.is_owned_by(&arn));
        assert!(!record.is_owned_by(&ExecutionArn::new("other")));

        let json = serde_json::to_value(&record).unwrap();
        let back: StackRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_sql_identifier_validation() {
        assert!(is_sql_identifier("reconciler_stack_records"));
        assert!(is_sql_identifier("_records2"));
        assert!(!is_sql_identifier("2records"));
        assert!(!is_sql_identifier("records; DROP TABLE users"));
        assert!(!is_sql_identifier(""));
    }
}
