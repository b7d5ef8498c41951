//! Strategy selection between the callback and polling paths.

use super::DeliveryStrategy;
use crate::backend::StackFacade;
use crate::config::OrchestratorIdentity;
use crate::error::Result;
use crate::models::StackOperationContext;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct StrategySelector {
    facade: Arc<StackFacade>,
    orchestrator: OrchestratorIdentity,
}

impl StrategySelector {
    pub fn new(facade: Arc<StackFacade>, orchestrator: OrchestratorIdentity) -> Self {
        Self {
            facade,
            orchestrator,
        }
    }

    /// Pick the delivery strategy for `context`.
    ///
    /// Remote stacks are always polled. A delete of a stack that never had the
    /// notification channel attached is polled too, since no usable
    /// notification would ever arrive. Only that case touches the backend.
    pub async fn select(&self, context: &StackOperationContext) -> Result<DeliveryStrategy> {
        let configuration = context.configuration();

        if configuration.is_remote(&self.orchestrator) {
            info!(
                stack_name = %configuration.stack_name,
                region = %configuration.resolved_region(&self.orchestrator),
                account_id = %configuration.resolved_account(&self.orchestrator),
                strategy = %DeliveryStrategy::Polling,
                "Cross region/account deployment"
            );
            return Ok(DeliveryStrategy::Polling);
        }

        if configuration.desired_state.is_deleted()
            && !self.facade.has_notification_channel(context).await?
        {
            info!(
                stack_name = %configuration.stack_name,
                strategy = %DeliveryStrategy::Polling,
                "Delete of a stack without notification channel"
            );
            return Ok(DeliveryStrategy::Polling);
        }

        info!(
            stack_name = %configuration.stack_name,
            strategy = %DeliveryStrategy::Callback,
            "Same account/region deployment"
        );
        Ok(DeliveryStrategy::Callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcilerConfig;
    use crate::models::{
        DesiredState, DistributionContext, ExecutionArn, ExecutionMetadata, StackConfiguration,
    };
    use crate::testing::InMemoryBackend;

    const CHANNEL: &str = "arn:aws:sns:eu-west-1:111111111111:deploy-events";

    fn selector(backend: Arc<InMemoryBackend>) -> StrategySelector {
        let orchestrator = OrchestratorIdentity::new("eu-west-1", "111111111111");
        let config = ReconcilerConfig::new(orchestrator.clone(), CHANNEL);
        StrategySelector::new(Arc::new(StackFacade::new(backend, &config)), orchestrator)
    }

    fn context(configuration: StackConfiguration) -> StackOperationContext {
        StackOperationContext::new(
            configuration,
            DistributionContext::new("platform", "dist-1", "prod", "obj-1"),
            ExecutionMetadata::new(ExecutionArn::new("exec:run-1"), "sfn", "Step"),
        )
    }

    #[tokio::test]
    async fn test_local_present_stack_uses_callback() {
        let backend = Arc::new(InMemoryBackend::new());
        let strategy = selector(backend.clone())
            .select(&context(StackConfiguration::new("app", "t")))
            .await
            .unwrap();
        assert_eq!(strategy, DeliveryStrategy::Callback);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remote_account_uses_polling() {
        let backend = Arc::new(InMemoryBackend::new());
        let config = StackConfiguration::new("app", "t")
            .with_execution_role("arn:aws:iam::222222222222:role/deploy");
        let strategy = selector(backend).select(&context(config)).await.unwrap();
        assert_eq!(strategy, DeliveryStrategy::Polling);
    }

    #[tokio::test]
    async fn test_delete_without_channel_uses_polling() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_stack("app", "CREATE_COMPLETE", None);
        let config = StackConfiguration::new("app", "t").with_desired_state(DesiredState::Deleted);
        let strategy = selector(backend).select(&context(config)).await.unwrap();
        assert_eq!(strategy, DeliveryStrategy::Polling);
    }

    #[tokio::test]
    async fn test_delete_with_channel_uses_callback() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_stack("app", "CREATE_COMPLETE", None);
        backend.attach_notification_channel("app", CHANNEL);
        let config = StackConfiguration::new("app", "t").with_desired_state(DesiredState::Deleted);
        let strategy = selector(backend).select(&context(config)).await.unwrap();
        assert_eq!(strategy, DeliveryStrategy::Callback);
    }
}
