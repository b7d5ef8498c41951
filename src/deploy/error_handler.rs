//! Reactions to classified backend errors shared by both deployers.

use super::DeployOutcome;
use crate::backend::StackFacade;
use crate::classifier::ErrorClassifier;
use crate::constants::error_codes;
use crate::error::{BackendError, ReconcilerError, Result};
use crate::events::{CompletionReporter, ManualCompletion};
use crate::models::{StackKey, StackOperationContext};
use crate::store::{CoordinationStore, StackRecord};
use crate::workflow::{FailureCode, WorkflowEngine};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct DeployErrorHandler {
    facade: Arc<StackFacade>,
    store: Arc<dyn CoordinationStore>,
    workflow: Arc<dyn WorkflowEngine>,
    reporter: Arc<CompletionReporter>,
}

impl std::fmt::Debug for DeployErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployErrorHandler").finish_non_exhaustive()
    }
}

impl DeployErrorHandler {
    pub fn new(
        facade: Arc<StackFacade>,
        store: Arc<dyn CoordinationStore>,
        workflow: Arc<dyn WorkflowEngine>,
        reporter: Arc<CompletionReporter>,
    ) -> Self {
        Self {
            facade,
            store,
            workflow,
            reporter,
        }
    }

    /// Nothing to apply: record the request and complete the step right away
    pub async fn handle_no_updates(
        &self,
        context: &StackOperationContext,
        key: &StackKey,
        resource_status: &str,
    ) -> Result<DeployOutcome> {
        info!(
            stack_name = %context.stack_name(),
            resource_status,
            "No updates are to be performed"
        );
        self.store
            .put(key, StackRecord::from_context(context, key))
            .await?;
        self.complete_without_mutation(context, key, resource_status).await
    }

    /// Report a terminal status for a stack no mutation was issued for
    pub async fn complete_without_mutation(
        &self,
        context: &StackOperationContext,
        key: &StackKey,
        resource_status: &str,
    ) -> Result<DeployOutcome> {
        let completion =
            ManualCompletion::from_context(context, key.clone(), resource_status, None);
        let outcome = self.reporter.respond_to_manual_completion(completion).await?;
        Ok(DeployOutcome::Completed(outcome))
    }

    /// A stack in `ROLLBACK_COMPLETE` cannot be updated: delete it so the
    /// next attempt creates it cleanly, and fail this one
    pub async fn handle_rollback_complete(
        &self,
        context: &StackOperationContext,
    ) -> Result<DeployOutcome> {
        warn!(
            stack_name = %context.stack_name(),
            "Stack is in ROLLBACK_COMPLETE state, deleting it"
        );
        self.facade.delete_stack(context).await?;

        let message = "Stack is in ROLLBACK_COMPLETE state, will delete stack".to_string();
        let code = FailureCode::RollBackCompleteState;
        self.workflow
            .report_failure(context.resumption_token(), &message, &code)
            .await?;
        Ok(DeployOutcome::Failed { code, message })
    }

    pub async fn handle_validation_error(
        &self,
        context: &StackOperationContext,
        backend_error: &BackendError,
    ) -> Result<DeployOutcome> {
        let message =
            ErrorClassifier::validation_message(backend_error, &context.configuration().template);
        error!(stack_name = %context.stack_name(), error = %backend_error, "{message}");
        self.workflow
            .report_failure(context.resumption_token(), &message, &FailureCode::ValidationError)
            .await?;
        Err(ReconcilerError::Validation(message))
    }

    pub async fn handle_access_denied(
        &self,
        context: &StackOperationContext,
        backend_error: &BackendError,
    ) -> Result<DeployOutcome> {
        let message = format!(
            "Could not update stack, access denied. Original error message: {}",
            backend_error.message
        );
        error!(stack_name = %context.stack_name(), error = %backend_error, "Access denied");
        self.workflow
            .report_failure(context.resumption_token(), &message, &FailureCode::AccessDenied)
            .await?;
        Err(ReconcilerError::AccessDenied(message))
    }

    /// Unclassified failure: surfaced verbatim
    pub async fn handle_unknown_error(
        &self,
        context: &StackOperationContext,
        backend_error: BackendError,
    ) -> Result<DeployOutcome> {
        error!(
            stack_name = %context.stack_name(),
            code = %backend_error.code,
            message = %backend_error.message,
            "An error occurred when deploying the stack"
        );
        let message = format!(
            "An error occurred when deploying the stack, error: {}",
            backend_error.message
        );
        self.workflow
            .report_failure(context.resumption_token(), &message, &FailureCode::UnknownError)
            .await?;
        Err(ReconcilerError::Backend(backend_error))
    }

    /// A create rejected by the backend is reported with the backend's own code.
    /// An existing stack without the orchestrator's resource tag is reported as access denied.
    pub async fn handle_create_failure(
        &self,
        context: &StackOperationContext,
        backend_error: BackendError,
    ) -> Result<DeployOutcome> {
        let (code, message) = if backend_error.code == error_codes::ALREADY_EXISTS {
            (
                FailureCode::AccessDenied,
                format!(
                    "Attini can not update stack with name={}. without the tag \"AttiniResourceType: cloudformation-stack\"",
                    context.stack_name()
                ),
            )
        } else {
            (
                FailureCode::Backend(backend_error.code.clone()),
                backend_error.message.clone(),
            )
        };

        info!(
            stack_name = %context.stack_name(),
            error = %backend_error,
            "Failed to create stack"
        );
        self.workflow
            .report_failure(context.resumption_token(), &message, &code)
            .await?;
        Ok(DeployOutcome::Failed { code, message })
    }

    /// Tell the engine the operation is still running
    pub async fn report_in_progress(
        &self,
        context: &StackOperationContext,
    ) -> Result<DeployOutcome> {
        self.workflow
            .report_failure(context.resumption_token(), "Is in progress", &FailureCode::IsExecuting)
            .await?;
        Ok(DeployOutcome::InProgress)
    }

    pub fn workflow(&self) -> &Arc<dyn WorkflowEngine> {
        &self.workflow
    }

    pub fn reporter(&self) -> &Arc<CompletionReporter> {
        &self.reporter
    }
}
