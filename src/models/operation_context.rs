//! # Stack Operation Context
//!
//! Wraps a [`StackConfiguration`] with the identity of the pipeline execution
//! that asked for it. Built once per invocation and never mutated.

use super::stack_configuration::StackConfiguration;
use super::token::{ClientRequestToken, ExecutionArn};
use serde::{Deserialize, Serialize};

/// Identity of the distribution being deployed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionContext {
    pub distribution_name: String,
    pub distribution_id: String,
    pub environment: String,
    pub object_identifier: String,
}

impl DistributionContext {
    pub fn new(
        distribution_name: impl Into<String>,
        distribution_id: impl Into<String>,
        environment: impl Into<String>,
        object_identifier: impl Into<String>,
    ) -> Self {
        Self {
            distribution_name: distribution_name.into(),
            distribution_id: distribution_id.into(),
            environment: environment.into(),
            object_identifier: object_identifier.into(),
        }
    }
}

/// Workflow execution metadata for the paused step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub execution_arn: ExecutionArn,
    /// Token the workflow engine expects back in report-success/report-failure
    pub resumption_token: String,
    pub step_name: String,
}

impl ExecutionMetadata {
    pub fn new(
        execution_arn: ExecutionArn,
        resumption_token: impl Into<String>,
        step_name: impl Into<String>,
    ) -> Self {
        Self {
            execution_arn,
            resumption_token: resumption_token.into(),
            step_name: step_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackOperationContext {
    configuration: StackConfiguration,
    distribution: DistributionContext,
    execution: ExecutionMetadata,
    client_request_token: ClientRequestToken,
}

impl StackOperationContext {
    pub fn new(
        configuration: StackConfiguration,
        distribution: DistributionContext,
        execution: ExecutionMetadata,
    ) -> Self {
        let client_request_token = ClientRequestToken::create(&execution.execution_arn);
        Self {
            configuration,
            distribution,
            execution,
            client_request_token,
        }
    }

    pub fn with_client_request_token(mut self, token: ClientRequestToken) -> Self {
        self.client_request_token = token;
        self
    }

    pub fn configuration(&self) -> &StackConfiguration {
        &self.configuration
    }

    pub fn distribution(&self) -> &DistributionContext {
        &self.distribution
    }

    pub fn execution(&self) -> &ExecutionMetadata {
        &self.execution
    }

    pub fn client_request_token(&self) -> &ClientRequestToken {
        &self.client_request_token
    }

    pub fn stack_name(&self) -> &str {
        &self.configuration.stack_name
    }

    pub fn resumption_token(&self) -> &str {
        &self.execution.resumption_token
    }
}
