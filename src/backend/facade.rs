//! # Stack Facade
//!
//! Builds backend requests from a [`StackOperationContext`]: client request
//! token, roles, capabilities, merged tags, and the notification channel on the
//! callback path.
//!
//! Parameters are resolved before every create or update: fallback values
//! give way to what the deployed stack already carries, and parameters the
//! template does not declare are dropped.

use super::{
    BackendResult, CreateStackRequest, DeleteStackRequest, ProvisioningBackend, StackLocation,
    StackState, StackStatus, Tag, UpdateStackRequest,
};
use crate::classifier::{BackendErrorKind, ErrorClassifier};
use crate::config::ReconcilerConfig;
use crate::constants::{status_groups, tags};
use crate::deploy::DeliveryStrategy;
use crate::models::{StackConfiguration, StackOperationContext};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct StackFacade {
    backend: Arc<dyn ProvisioningBackend>,
    notification_channel_arn: String,
    environment_tag_key: String,
    default_capabilities: Vec<String>,
}

impl std::fmt::Debug for StackFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackFacade")
            .field("notification_channel_arn", &self.notification_channel_arn)
            .field("environment_tag_key", &self.environment_tag_key)
            .finish()
    }
}

impl StackFacade {
    pub fn new(backend: Arc<dyn ProvisioningBackend>, config: &ReconcilerConfig) -> Self {
        Self {
            backend,
            notification_channel_arn: config.notification_channel_arn.clone(),
            environment_tag_key: config.environment_tag_key.clone(),
            default_capabilities: config.capabilities.clone(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn ProvisioningBackend> {
        &self.backend
    }

    pub async fn create_stack(
        &self,
        context: &StackOperationContext,
        strategy: DeliveryStrategy,
    ) -> BackendResult<String> {
        let configuration = context.configuration();
        info!(
            stack_name = %configuration.stack_name,
            strategy = %strategy,
            client_request_token = %context.client_request_token(),
            "Creating stack"
        );

        let location = StackLocation::of(configuration);
        let parameters = self
            .resolve_parameters(configuration, &location, false)
            .await?;

        let request = CreateStackRequest {
            location,
            stack_name: configuration.stack_name.clone(),
            template_url: configuration.template.clone(),
            parameters,
            tags: self.tags(context),
            capabilities: self.capabilities(context),
            client_request_token: context.client_request_token().to_string(),
            role_arn: configuration.stack_role_arn.clone(),
            notification_arns: self.notification_arns(strategy),
            on_failure: configuration.on_failure,
            enable_termination_protection: configuration.termination_protection,
        };
        self.backend.create_stack(request).await
    }

    pub async fn update_stack(
        &self,
        context: &StackOperationContext,
        strategy: DeliveryStrategy,
    ) -> BackendResult<String> {
        let configuration = context.configuration();
        let location = StackLocation::of(configuration);
        info!(
            stack_name = %configuration.stack_name,
            strategy = %strategy,
            client_request_token = %context.client_request_token(),
            "Updating stack"
        );

        let parameters = self
            .resolve_parameters(configuration, &location, true)
            .await?;

        if let Some(enabled) = configuration.termination_protection {
            debug!(
                stack_name = %configuration.stack_name,
                enabled,
                "Updating termination protection"
            );
            self.backend
                .update_termination_protection(&location, &configuration.stack_name, enabled)
                .await?;
        }

        let request = UpdateStackRequest {
            location,
            stack_name: configuration.stack_name.clone(),
            template_url: configuration.template.clone(),
            parameters,
            tags: self.tags(context),
            capabilities: self.capabilities(context),
            client_request_token: context.client_request_token().to_string(),
            role_arn: configuration.stack_role_arn.clone(),
            notification_arns: self.notification_arns(strategy),
        };
        self.backend.update_stack(request).await
    }

    /// Delete the stack. A stack that is already gone is not an error.
    pub async fn delete_stack(&self, context: &StackOperationContext) -> BackendResult<()> {
        let configuration = context.configuration();
        let request = DeleteStackRequest {
            location: StackLocation::of(configuration),
            stack_name: configuration.stack_name.clone(),
            client_request_token: context.client_request_token().to_string(),
            role_arn: configuration.stack_role_arn.clone(),
        };

        match self.backend.delete_stack(request).await {
            Ok(()) => {
                info!(stack_name = %configuration.stack_name, "Stack delete issued");
                Ok(())
            }
            Err(error) if ErrorClassifier::is_already_deleted(&error) => {
                info!(stack_name = %configuration.stack_name, "Stack is already deleted");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Status of the latest stack-level event, `None` when the stack has no such event
    pub async fn stack_status(
        &self,
        context: &StackOperationContext,
    ) -> BackendResult<Option<StackStatus>> {
        let configuration = context.configuration();
        let events = self
            .backend
            .describe_stack_events(&StackLocation::of(configuration), &configuration.stack_name)
            .await?;

        Ok(events
            .into_iter()
            .find(|event| event.is_stack_level())
            .map(|event| {
                let state = if status_groups::is_in_progress(&event.resource_status) {
                    StackState::InProgress
                } else {
                    StackState::Complete
                };
                StackStatus {
                    client_request_token: event.client_request_token,
                    state,
                    status: event.resource_status,
                    stack_id: event.stack_id,
                }
            }))
    }

    /// Whether the deployed stack already publishes to the orchestrator's channel.
    /// An absent stack has no channel.
    pub async fn has_notification_channel(
        &self,
        context: &StackOperationContext,
    ) -> BackendResult<bool> {
        let configuration = context.configuration();
        match self
            .backend
            .describe_stack(&StackLocation::of(configuration), &configuration.stack_name)
            .await
        {
            Ok(description) => Ok(description
                .notification_arns
                .iter()
                .any(|arn| arn == &self.notification_channel_arn)),
            Err(error) if ErrorClassifier::classify(&error) == BackendErrorKind::NoStackExists => {
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Backend parameters for a create or update. With `merge_deployed` the
    /// fallback values are replaced by the deployed stack's current values.
    async fn resolve_parameters(
        &self,
        configuration: &StackConfiguration,
        location: &StackLocation,
        merge_deployed: bool,
    ) -> BackendResult<Vec<(String, String)>> {
        let mut parameters = configuration.parameters.clone();
        if parameters.is_empty() {
            return Ok(Vec::new());
        }

        if merge_deployed {
            match self
                .backend
                .describe_stack(location, &configuration.stack_name)
                .await
            {
                Ok(description) => parameters.merge(&description.parameters),
                Err(error)
                    if ErrorClassifier::classify(&error) == BackendErrorKind::NoStackExists => {}
                Err(error) => return Err(error),
            }
        }

        let declared = self
            .backend
            .template_parameters(location, &configuration.template)
            .await?;
        parameters.retain_declared(&declared);
        Ok(parameters.to_backend_parameters())
    }

    fn notification_arns(&self, strategy: DeliveryStrategy) -> Vec<String> {
        match strategy {
            DeliveryStrategy::Callback => vec![self.notification_channel_arn.clone()],
            DeliveryStrategy::Polling => Vec::new(),
        }
    }

    fn capabilities(&self, context: &StackOperationContext) -> Vec<String> {
        context
            .configuration()
            .capabilities
            .clone()
            .unwrap_or_else(|| self.default_capabilities.clone())
    }

    /// Configuration tags followed by the orchestrator's own tags
    fn tags(&self, context: &StackOperationContext) -> Vec<Tag> {
        let distribution = context.distribution();
        let mut merged: BTreeMap<&str, &str> = context
            .configuration()
            .tags
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        merged.insert(tags::DISTRIBUTION_NAME, distribution.distribution_name.as_str());
        merged.insert(self.environment_tag_key.as_str(), distribution.environment.as_str());
        merged.insert(tags::RESOURCE_TYPE, tags::RESOURCE_TYPE_VALUE);

        merged.into_iter().map(|(k, v)| Tag::new(k, v)).collect()
    }
}
