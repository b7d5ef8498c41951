//! Polling deployer.
//!
//! Re-invoked on every workflow retry. Each invocation reads the stack's
//! latest stack-level event and decides from its client request token:
//!
//! | Observed token          | Backend state | Action                                  |
//! |-------------------------|---------------|-----------------------------------------|
//! | this execution's prefix | in progress   | report `IsExecuting`                    |
//! | this execution's prefix | terminal      | report completion                       |
//! | other, record not ours  | any           | mutate, write record, report `IsExecuting` |
//! | other, record ours      | any           | contention, fail                        |
//!
//! A missing stack is created (or, when deletion is desired, reported done).

use super::{DeliveryStrategy, DeployErrorHandler, DeployOutcome};
use crate::backend::StackFacade;
use crate::classifier::{BackendErrorKind, ErrorClassifier};
use crate::config::OrchestratorIdentity;
use crate::constants::status_groups::DELETED_STATUS;
use crate::error::{BackendError, ReconcilerError, Result};
use crate::events::ManualCompletion;
use crate::models::{is_same_execution, StackKey, StackOperationContext};
use crate::store::{CoordinationStore, StackRecord};
use crate::workflow::FailureCode;
use std::sync::Arc;
use tracing::{error, info};

pub struct PollingDeployer {
    facade: Arc<StackFacade>,
    store: Arc<dyn CoordinationStore>,
    errors: Arc<DeployErrorHandler>,
    orchestrator: OrchestratorIdentity,
}

impl std::fmt::Debug for PollingDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingDeployer")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl PollingDeployer {
    pub fn new(
        facade: Arc<StackFacade>,
        store: Arc<dyn CoordinationStore>,
        errors: Arc<DeployErrorHandler>,
        orchestrator: OrchestratorIdentity,
    ) -> Self {
        Self {
            facade,
            store,
            errors,
            orchestrator,
        }
    }

    pub async fn deploy(&self, context: &StackOperationContext) -> Result<DeployOutcome> {
        let key = StackKey::for_configuration(context.configuration(), &self.orchestrator);

        match self.poll(context, &key).await {
            Err(ReconcilerError::Backend(backend_error)) => {
                info!(
                    stack_name = %context.stack_name(),
                    error = %backend_error,
                    "Backend rejected polling step"
                );
                self.handle_backend_error(context, &key, backend_error).await
            }
            other => other,
        }
    }

    async fn poll(&self, context: &StackOperationContext, key: &StackKey) -> Result<DeployOutcome> {
        let execution_arn = &context.execution().execution_arn;

        let Some(status) = self.facade.stack_status(context).await? else {
            let message = format!(
                "The stack {} exists but there are no events for the stack",
                context.stack_name()
            );
            error!(stack_name = %context.stack_name(), "{message}");
            self.errors
                .workflow()
                .report_failure(context.resumption_token(), &message, &FailureCode::UnknownError)
                .await?;
            return Err(ReconcilerError::InvalidState(message));
        };

        let same_execution =
            is_same_execution(status.client_request_token.as_deref(), execution_arn);

        if same_execution && status.is_in_progress() {
            info!(
                stack_name = %context.stack_name(),
                status = %status.status,
                "Stack is being updated, will retry"
            );
            return self.errors.report_in_progress(context).await;
        }

        if same_execution {
            info!(
                stack_name = %context.stack_name(),
                status = %status.status,
                "Stack is done updating, reporting completion"
            );
            let completion = ManualCompletion::from_context(
                context,
                key.clone(),
                status.status.clone(),
                Some(status.stack_id.clone()),
            );
            let outcome = self
                .errors
                .reporter()
                .respond_to_manual_completion(completion)
                .await?;
            return Ok(DeployOutcome::Completed(outcome));
        }

        let record_is_ours = self
            .store
            .get(key)
            .await?
            .is_some_and(|record| record.is_owned_by(execution_arn));

        if record_is_ours {
            return self.report_contention(context, status.client_request_token).await;
        }

        if context.configuration().desired_state.is_deleted() {
            info!(stack_name = %context.stack_name(), "New request for stack deletion received");
            self.facade.delete_stack(context).await?;
            self.store
                .put(key, StackRecord::from_context(context, key))
                .await?;
            return self.errors.report_in_progress(context).await;
        }

        info!(stack_name = %context.stack_name(), "New request for stack update received");
        self.store
            .put(key, StackRecord::from_context(context, key))
            .await?;
        let stack_id = self
            .facade
            .update_stack(context, DeliveryStrategy::Polling)
            .await?;
        self.store
            .put(key, StackRecord::from_context(context, key).with_stack_id(stack_id))
            .await?;
        self.errors.report_in_progress(context).await
    }

    /// Our execution owns the record yet the backend shows a foreign token:
    /// another account or region is racing the same stack name.
    async fn report_contention(
        &self,
        context: &StackOperationContext,
        observed_token: Option<String>,
    ) -> Result<DeployOutcome> {
        let observed_token = observed_token.unwrap_or_default();
        error!(
            stack_name = %context.stack_name(),
            client_request_token = %context.client_request_token(),
            observed_token = %observed_token,
            "The stack is being updated by another account/region"
        );
        let contention = ReconcilerError::StackContention {
            stack_name: context.stack_name().to_string(),
            observed_token,
        };
        self.errors
            .workflow()
            .report_failure(
                context.resumption_token(),
                &contention.to_string(),
                &FailureCode::StackContention,
            )
            .await?;
        Err(contention)
    }

    async fn handle_backend_error(
        &self,
        context: &StackOperationContext,
        key: &StackKey,
        backend_error: BackendError,
    ) -> Result<DeployOutcome> {
        match ErrorClassifier::classify(&backend_error) {
            BackendErrorKind::NoStackExists
                if context.configuration().desired_state.is_deleted() =>
            {
                info!(
                    stack_name = %context.stack_name(),
                    "No stack found so no delete required"
                );
                self.errors
                    .complete_without_mutation(context, key, DELETED_STATUS)
                    .await
            }
            BackendErrorKind::NoStackExists => {
                info!(stack_name = %context.stack_name(), "No stack found, creating it");
                match self
                    .facade
                    .create_stack(context, DeliveryStrategy::Polling)
                    .await
                {
                    Ok(stack_id) => {
                        let record =
                            StackRecord::from_context(context, key).with_stack_id(stack_id);
                        self.store.put(key, record).await?;
                        self.errors.report_in_progress(context).await
                    }
                    Err(create_error) => {
                        self.errors
                            .handle_create_failure(context, create_error)
                            .await
                    }
                }
            }
            BackendErrorKind::RollbackComplete => {
                self.errors.handle_rollback_complete(context).await
            }
            BackendErrorKind::ValidationError => {
                self.errors.handle_validation_error(context, &backend_error).await
            }
            BackendErrorKind::NoUpdateToPerform => {
                self.errors.handle_no_updates(context, key, "UPDATE_COMPLETE").await
            }
            BackendErrorKind::AccessDenied => {
                self.errors.handle_access_denied(context, &backend_error).await
            }
            BackendErrorKind::UnknownError => {
                self.errors.handle_unknown_error(context, backend_error).await
            }
        }
    }
}
