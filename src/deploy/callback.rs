//! Callback deployer.
//!
//! Issues one mutation with the notification channel attached and stores the
//! workflow resumption token; the step stays paused until the stack's final
//! notification is reported.

use super::{DeliveryStrategy, DeployErrorHandler, DeployOutcome};
use crate::backend::StackFacade;
use crate::classifier::{BackendErrorKind, ErrorClassifier};
use crate::config::OrchestratorIdentity;
use crate::error::{BackendError, Result};
use crate::models::{StackKey, StackOperationContext};
use crate::store::{CoordinationStore, StackRecord};
use std::sync::Arc;
use tracing::info;

pub struct CallbackDeployer {
    facade: Arc<StackFacade>,
    store: Arc<dyn CoordinationStore>,
    errors: Arc<DeployErrorHandler>,
    orchestrator: OrchestratorIdentity,
}

impl std::fmt::Debug for CallbackDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackDeployer")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl CallbackDeployer {
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
        info!(
            stack_name = %context.stack_name(),
            client_request_token = %context.client_request_token(),
            desired_state = %context.configuration().desired_state,
            "Deploying stack using callback strategy"
        );

        if context.configuration().desired_state.is_deleted() {
            self.delete(context, &key).await
        } else {
            self.update(context, &key).await
        }
    }

    async fn delete(
        &self,
        context: &StackOperationContext,
        key: &StackKey,
    ) -> Result<DeployOutcome> {
        match self.facade.delete_stack(context).await {
            Ok(()) => {
                let record = StackRecord::from_context(context, key)
                    .with_resumption_token(context.resumption_token());
                self.store.put(key, record).await?;
                Ok(DeployOutcome::AwaitingNotification { stack_id: None })
            }
            Err(error)
                if ErrorClassifier::classify(&error) == BackendErrorKind::ValidationError =>
            {
                self.errors.handle_validation_error(context, &error).await
            }
            Err(error) => self.errors.handle_unknown_error(context, error).await,
        }
    }

    async fn update(
        &self,
        context: &StackOperationContext,
        key: &StackKey,
    ) -> Result<DeployOutcome> {
        match self
            .facade
            .update_stack(context, DeliveryStrategy::Callback)
            .await
        {
            Ok(stack_id) => self.save_pending(context, key, stack_id).await,
            Err(error) => self.handle_update_error(context, key, error).await,
        }
    }

    async fn handle_update_error(
        &self,
        context: &StackOperationContext,
        key: &StackKey,
        error: BackendError,
    ) -> Result<DeployOutcome> {
        let kind = ErrorClassifier::classify(&error);
        info!(
            stack_name = %context.stack_name(),
            error_kind = %kind,
            error = %error,
            "Update rejected"
        );

        match kind {
            BackendErrorKind::NoUpdateToPerform => {
                self.errors.handle_no_updates(context, key, "UPDATE_COMPLETE").await
            }
            BackendErrorKind::RollbackComplete => {
                self.errors.handle_rollback_complete(context).await
            }
            BackendErrorKind::NoStackExists => {
                info!(
                    stack_name = %context.stack_name(),
                    "Could not update stack, trying to create it"
                );
                self.create(context, key).await
            }
            BackendErrorKind::ValidationError => {
                self.errors.handle_validation_error(context, &error).await
            }
            BackendErrorKind::AccessDenied => {
                self.errors.handle_access_denied(context, &error).await
            }
            BackendErrorKind::UnknownError => {
                self.errors.handle_unknown_error(context, error).await
            }
        }
    }

    async fn create(
        &self,
        context: &StackOperationContext,
        key: &StackKey,
    ) -> Result<DeployOutcome> {
        match self
            .facade
            .create_stack(context, DeliveryStrategy::Callback)
            .await
        {
            Ok(stack_id) => {
                info!(stack_name = %context.stack_name(), stack_id = %stack_id, "Created stack");
                self.save_pending(context, key, stack_id).await
            }
            Err(error) => self.errors.handle_create_failure(context, error).await,
        }
    }

    async fn save_pending(
        &self,
        context: &StackOperationContext,
        key: &StackKey,
        stack_id: String,
    ) -> Result<DeployOutcome> {
        let record = StackRecord::from_context(context, key)
            .with_stack_id(stack_id.clone())
            .with_resumption_token(context.resumption_token());
        self.store.put(key, record).await?;
        Ok(DeployOutcome::AwaitingNotification {
            stack_id: Some(stack_id),
        })
    }
}
