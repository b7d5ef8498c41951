//! Shared harness for the reconciler integration tests.

#![allow(dead_code)]

pub mod strategies;

use stack_reconciler::config::{OrchestratorIdentity, ReconcilerConfig};
use stack_reconciler::deploy::StackDeployHandler;
use stack_reconciler::events::{CompletionReporter, StackNotification};
use stack_reconciler::models::{
    DistributionContext, ExecutionArn, ExecutionMetadata, StackConfiguration, StackKey,
    StackOperationContext,
};
use stack_reconciler::store::{
    CoordinationStore, InMemoryCoordinationStore, InMemoryExecutionErrorLog, StackRecord,
};
use stack_reconciler::testing::{InMemoryBackend, RecordingWorkflowEngine};
use std::sync::Arc;

pub const REGION: &str = "eu-west-1";
pub const ACCOUNT: &str = "111111111111";
pub const CHANNEL: &str = "arn:aws:sns:eu-west-1:111111111111:deploy-events";

pub struct Harness {
    pub backend: Arc<InMemoryBackend>,
    pub store: Arc<InMemoryCoordinationStore>,
    pub workflow: Arc<RecordingWorkflowEngine>,
    pub error_log: Arc<InMemoryExecutionErrorLog>,
    pub config: ReconcilerConfig,
    pub handler: StackDeployHandler,
}

impl Harness {
    pub fn new() -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Arc::new(InMemoryCoordinationStore::new());
        let workflow = Arc::new(RecordingWorkflowEngine::new());
        let error_log = Arc::new(InMemoryExecutionErrorLog::new());
        let config = ReconcilerConfig::new(OrchestratorIdentity::new(REGION, ACCOUNT), CHANNEL);
        let handler = StackDeployHandler::new(
            backend.clone(),
            store.clone(),
            workflow.clone(),
            error_log.clone(),
            &config,
        );
        Self {
            backend,
            store,
            workflow,
            error_log,
            config,
            handler,
        }
    }

    pub fn reporter(&self) -> &Arc<CompletionReporter> {
        self.handler.reporter()
    }

    pub fn orchestrator(&self) -> &OrchestratorIdentity {
        &self.config.orchestrator
    }

    pub fn key_for(&self, context: &StackOperationContext) -> StackKey {
        StackKey::for_configuration(context.configuration(), self.orchestrator())
    }

    pub async fn record_for(&self, context: &StackOperationContext) -> Option<StackRecord> {
        self.store.get(&self.key_for(context)).await.unwrap()
    }
}

/// Invocation of `configuration` by execution `execution_id`.
///
/// Execution ids used together in one test must not be prefixes of each other.
pub fn invocation(configuration: StackConfiguration, execution_id: &str) -> StackOperationContext {
    let step_name = format!("Deploy-{}", configuration.stack_name);
    StackOperationContext::new(
        configuration,
        DistributionContext::new("platform", "dist-1", "prod", "obj-1"),
        ExecutionMetadata::new(
            ExecutionArn::new(format!(
                "arn:aws:states:{REGION}:{ACCOUNT}:execution:deployment-plan:{execution_id}"
            )),
            resumption_token(execution_id),
            step_name,
        ),
    )
}

pub fn resumption_token(execution_id: &str) -> String {
    format!("sfn-token-{execution_id}")
}

/// Nested resource notification carrying the stack's latest token
pub fn resource_notification(
    backend: &InMemoryBackend,
    stack_name: &str,
    logical_id: &str,
    status: &str,
    reason: Option<&str>,
) -> StackNotification {
    let token = backend.last_token(stack_name).unwrap();
    backend.push_event(
        stack_name,
        logical_id,
        "AWS::EC2::VPC",
        status,
        reason,
        Some(&token),
    );
    StackNotification {
        stack_name: stack_name.to_string(),
        logical_resource_id: logical_id.to_string(),
        resource_type: "AWS::EC2::VPC".to_string(),
        resource_status: status.to_string(),
        resource_status_reason: reason.map(str::to_string),
        client_request_token: token,
        stack_id: backend.stack_id(stack_name),
    }
}
