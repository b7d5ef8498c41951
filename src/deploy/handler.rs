//! Entry point for one deploy-stack workflow step.

use super::{
    CallbackDeployer, DeliveryStrategy, DeployErrorHandler, DeployOutcome, PollingDeployer,
    StrategySelector,
};
use crate::backend::{ProvisioningBackend, StackFacade};
use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::events::CompletionReporter;
use crate::models::StackOperationContext;
use crate::store::{CoordinationStore, ExecutionErrorLog};
use crate::workflow::WorkflowEngine;
use std::sync::Arc;
use tracing::{info, instrument};

/// Selects a strategy and dispatches to the matching deployer
#[derive(Debug)]
pub struct StackDeployHandler {
    selector: StrategySelector,
    callback: CallbackDeployer,
    polling: PollingDeployer,
    reporter: Arc<CompletionReporter>,
}

impl StackDeployHandler {
    pub fn new(
        backend: Arc<dyn ProvisioningBackend>,
        store: Arc<dyn CoordinationStore>,
        workflow: Arc<dyn WorkflowEngine>,
        error_log: Arc<dyn ExecutionErrorLog>,
        config: &ReconcilerConfig,
    ) -> Self {
        let orchestrator = config.orchestrator.clone();
        let facade = Arc::new(StackFacade::new(backend.clone(), config));
        let reporter = Arc::new(CompletionReporter::new(
            backend,
            store.clone(),
            workflow.clone(),
            error_log,
            orchestrator.clone(),
        ));
        let errors = Arc::new(DeployErrorHandler::new(
            facade.clone(),
            store.clone(),
            workflow,
            reporter.clone(),
        ));

        Self {
            selector: StrategySelector::new(facade.clone(), orchestrator.clone()),
            callback: CallbackDeployer::new(
                facade.clone(),
                store.clone(),
                errors.clone(),
                orchestrator.clone(),
            ),
            polling: PollingDeployer::new(facade, store, errors, orchestrator),
            reporter,
        }
    }

    #[instrument(
        skip_all,
        fields(stack_name = %context.stack_name(), step = %context.execution().step_name)
    )]
    pub async fn deploy(&self, context: &StackOperationContext) -> Result<DeployOutcome> {
        let strategy = self.selector.select(context).await?;
        let outcome = match strategy {
            DeliveryStrategy::Callback => self.callback.deploy(context).await,
            DeliveryStrategy::Polling => self.polling.deploy(context).await,
        }?;
        info!(strategy = %strategy, outcome = ?outcome, "Deploy step finished");
        Ok(outcome)
    }

    /// Reporter consuming the notifications produced by callback deployments
    pub fn reporter(&self) -> &Arc<CompletionReporter> {
        &self.reporter
    }
}
