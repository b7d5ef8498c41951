//! # Completion Reporter
//!
//! Resumes paused workflow steps once their stack reaches a terminal state.
//! Two entry points share the same reporting rules:
//!
//! - [`respond_to_notification`](CompletionReporter::respond_to_notification)
//!   for pushed stack events (callback strategy), guarded by the client request
//!   token stored with the stack's record.
//! - [`respond_to_manual_completion`](CompletionReporter::respond_to_manual_completion)
//!   for terminal states observed directly (polling strategy, no-op updates).

use super::classifier::{classify, EventType};
use super::notification::StackNotification;
use super::output::create_output;
use super::stack_error::StackErrorResolver;
use crate::backend::{ProvisioningBackend, StackLocation};
use crate::config::OrchestratorIdentity;
use crate::constants::status_groups;
use crate::error::Result;
use crate::models::{DesiredState, DistributionContext, StackKey, StackOperationContext};
use crate::store::error_log::CLOUDFORMATION_ERROR_TYPE;
use crate::store::{
    CoordinationStore, ExecutionErrorLog, ResourceError, StackErrorEntry, StackRecord,
};
use crate::workflow::{FailureCode, WorkflowEngine};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// What was reported to the workflow engine for a terminal stack state
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Succeeded { payload: Value },
    Failed { code: FailureCode, message: String },
    /// No resumption token was held; nothing to resume
    NotReported,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationOutcome {
    Ignored(String),
    ResourceFailureRecorded,
    Completed(CompletionOutcome),
}

/// A terminal stack status to report, with everything needed to reach the
/// stack and the paused step
#[derive(Debug, Clone, PartialEq)]
pub struct ManualCompletion {
    pub stack_key: StackKey,
    pub location: StackLocation,
    pub stack_name: String,
    pub resource_status: String,
    pub stack_id: Option<String>,
    pub resumption_token: Option<String>,
    pub step_name: String,
    pub output_path: Option<String>,
    pub desired_state: DesiredState,
    pub distribution: DistributionContext,
}

impl ManualCompletion {
    pub fn from_context(
        context: &StackOperationContext,
        stack_key: StackKey,
        resource_status: impl Into<String>,
        stack_id: Option<String>,
    ) -> Self {
        let configuration = context.configuration();
        Self {
            stack_key,
            location: StackLocation::of(configuration),
            stack_name: configuration.stack_name.clone(),
            resource_status: resource_status.into(),
            stack_id,
            resumption_token: Some(context.resumption_token().to_string()),
            step_name: context.execution().step_name.clone(),
            output_path: configuration.output_path.clone(),
            desired_state: configuration.desired_state,
            distribution: context.distribution().clone(),
        }
    }

    /// Completion described by a stored record; notified stacks are always local
    pub fn from_record(
        stack_key: StackKey,
        record: &StackRecord,
        resource_status: impl Into<String>,
    ) -> Self {
        Self {
            stack_key,
            location: StackLocation::local(),
            stack_name: record.stack_name.clone(),
            resource_status: resource_status.into(),
            stack_id: record.stack_id.clone(),
            resumption_token: record.resumption_token.clone(),
            step_name: record.step_name.clone(),
            output_path: record.output_path.clone(),
            desired_state: record.desired_state,
            distribution: record.distribution.clone(),
        }
    }

    fn stack_identifier(&self) -> &str {
        self.stack_id.as_deref().unwrap_or(&self.stack_name)
    }
}

pub struct CompletionReporter {
    backend: Arc<dyn ProvisioningBackend>,
    store: Arc<dyn CoordinationStore>,
    workflow: Arc<dyn WorkflowEngine>,
    error_log: Arc<dyn ExecutionErrorLog>,
    resolver: StackErrorResolver,
    orchestrator: OrchestratorIdentity,
}

impl std::fmt::Debug for CompletionReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionReporter")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl CompletionReporter {
    pub fn new(
        backend: Arc<dyn ProvisioningBackend>,
        store: Arc<dyn CoordinationStore>,
        workflow: Arc<dyn WorkflowEngine>,
        error_log: Arc<dyn ExecutionErrorLog>,
        orchestrator: OrchestratorIdentity,
    ) -> Self {
        Self {
            resolver: StackErrorResolver::new(backend.clone()),
            backend,
            store,
            workflow,
            error_log,
            orchestrator,
        }
    }

    /// Handle one pushed stack event.
    ///
    /// Events whose token differs from the stored record's belong to an older
    /// or foreign operation and are ignored, so redelivered or late events
    /// never resume the wrong step.
    #[instrument(skip_all, fields(
        stack_name = %notification.stack_name,
        logical_resource_id = %notification.logical_resource_id,
        resource_status = %notification.resource_status
    ))]
    pub async fn respond_to_notification(
        &self,
        notification: StackNotification,
    ) -> Result<NotificationOutcome> {
        let event_type = classify(&notification);
        if matches!(event_type, EventType::ResourceUpdate | EventType::StackInProgress) {
            debug!(%event_type, "Not responding to status");
            return Ok(NotificationOutcome::Ignored(format!(
                "not responding to {event_type} event"
            )));
        }

        let key = StackKey::for_local_stack(&notification.stack_name, &self.orchestrator);
        let Some(record) = self.store.get(&key).await? else {
            warn!(
                %event_type,
                "No record found for stack, most likely it failed before the step registered it"
            );
            return Ok(NotificationOutcome::Ignored("no record for stack".to_string()));
        };

        if record.client_request_token != notification.client_request_token {
            info!(
                expected = %record.client_request_token,
                received = %notification.client_request_token,
                "Client request token does not match the stored record, ignoring event"
            );
            return Ok(NotificationOutcome::Ignored("stale client request token".to_string()));
        }

        if let (Some(received), Some(stored)) = (&notification.stack_id, &record.stack_id) {
            if received != stored {
                info!(
                    %received,
                    %stored,
                    "Stack id differs from the stored record, ignoring event"
                );
                return Ok(NotificationOutcome::Ignored("stack id mismatch".to_string()));
            }
        }

        info!(%event_type, "Responding to stack event");
        let outcome = match event_type {
            EventType::ResourceFailed => {
                self.record_resource_error(&key, record, &notification).await?;
                return Ok(NotificationOutcome::ResourceFailureRecorded);
            }
            EventType::StackFailed => {
                let record = self
                    .record_resource_error(&key, record, &notification)
                    .await?;
                let status = &notification.resource_status;
                let completion = ManualCompletion::from_record(key.clone(), &record, status);
                self.report_stack_failure(&completion).await?
            }
            EventType::StackUpdated => {
                let status = &notification.resource_status;
                let completion = ManualCompletion::from_record(key.clone(), &record, status);
                self.report_output(&completion).await?
            }
            EventType::StackDeleted => {
                let status = &notification.resource_status;
                let completion = ManualCompletion::from_record(key.clone(), &record, status);
                info!(desired_state = %record.desired_state, "Stack deleted");
                if record.desired_state.is_deleted() {
                    self.report_output(&completion).await?
                } else {
                    self.report_stack_failure(&completion).await?
                }
            }
            EventType::ResourceUpdate | EventType::StackInProgress => {
                return Ok(NotificationOutcome::Ignored(format!(
                    "not responding to {event_type} event"
                )));
            }
        };

        self.store.delete(&key).await?;
        Ok(NotificationOutcome::Completed(outcome))
    }

    /// Report a terminal status observed without a notification.
    ///
    /// Never fails on backend trouble: any error is reported to the step as
    /// an `unknown` failure instead.
    #[instrument(
        skip_all,
        fields(
            stack_name = %completion.stack_name,
            resource_status = %completion.resource_status
        )
    )]
    pub async fn respond_to_manual_completion(
        &self,
        completion: ManualCompletion,
    ) -> Result<CompletionOutcome> {
        match self.complete_manually(&completion).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(error = %e, "There was an error when reporting the stack status");
                let Some(token) = completion.resumption_token.as_deref() else {
                    return Ok(CompletionOutcome::NotReported);
                };
                let code = FailureCode::OutputUnavailable;
                let message = e.to_string();
                self.workflow.report_failure(token, &message, &code).await?;
                Ok(CompletionOutcome::Failed { code, message })
            }
        }
    }

    async fn complete_manually(&self, completion: &ManualCompletion) -> Result<CompletionOutcome> {
        let status = completion.resource_status.as_str();

        if status_groups::is_updated(status) {
            info!("Stack operation finished, reporting success");
            return self.report_output(completion).await;
        }

        if status_groups::is_deleted(status) {
            let outcome = if completion.desired_state.is_deleted() {
                self.report_output(completion).await?
            } else {
                self.report_stack_failure(completion).await?
            };
            info!("Stack deleted, cleaning up record");
            self.store.delete(&completion.stack_key).await?;
            return Ok(outcome);
        }

        info!("Stack operation failed, reporting failure");
        self.report_stack_failure(completion).await
    }

    async fn report_output(&self, completion: &ManualCompletion) -> Result<CompletionOutcome> {
        let Some(token) = completion.resumption_token.as_deref() else {
            debug!("No resumption token held, nothing to report");
            return Ok(CompletionOutcome::NotReported);
        };

        let output = create_output(
            self.backend.as_ref(),
            &completion.location,
            completion.stack_identifier(),
            completion.output_path.as_deref(),
            completion.desired_state,
        )
        .await;

        match output {
            Ok(payload) => {
                self.workflow.report_success(token, payload.clone()).await?;
                Ok(CompletionOutcome::Succeeded { payload })
            }
            Err(e) => {
                error!(error = %e, "There was an error when creating the step output");
                let code = FailureCode::OutputUnavailable;
                let message = e.to_string();
                self.workflow.report_failure(token, &message, &code).await?;
                Ok(CompletionOutcome::Failed { code, message })
            }
        }
    }

    async fn report_stack_failure(
        &self,
        completion: &ManualCompletion,
    ) -> Result<CompletionOutcome> {
        let stack_error = self
            .resolver
            .resolve(
                &completion.location,
                &completion.stack_name,
                completion.stack_id.as_deref(),
            )
            .await?;

        self.error_log
            .add_execution_error(
                &completion.distribution,
                &format!(
                    "Step: {} failed with error: {}",
                    completion.step_name, stack_error.message
                ),
            )
            .await?;

        let Some(token) = completion.resumption_token.as_deref() else {
            return Ok(CompletionOutcome::NotReported);
        };
        let code = FailureCode::StackStatus(stack_error.error_status);
        self.workflow
            .report_failure(token, &stack_error.message, &code)
            .await?;
        Ok(CompletionOutcome::Failed {
            code,
            message: stack_error.message,
        })
    }

    /// Append the event's failure reason to the record and the execution error log
    async fn record_resource_error(
        &self,
        key: &StackKey,
        mut record: StackRecord,
        notification: &StackNotification,
    ) -> Result<StackRecord> {
        let Some(reason) = notification.resource_status_reason.clone() else {
            return Ok(record);
        };

        record.errors.push(ResourceError {
            resource_name: notification.logical_resource_id.clone(),
            resource_status: notification.resource_status.clone(),
            error: reason.clone(),
        });
        record.updated_at = Utc::now();
        self.store.put(key, record.clone()).await?;

        let entry = StackErrorEntry {
            resource_name: notification.logical_resource_id.clone(),
            resource_status: notification.resource_status.clone(),
            error_type: CLOUDFORMATION_ERROR_TYPE.to_string(),
            error: reason,
            step_name: record.step_name.clone(),
            stack_name: record.stack_name.clone(),
            region: record.region.clone(),
        };
        self.error_log
            .add_stack_error(&record.distribution, key, entry)
            .await?;
        Ok(record)
    }
}
