//! # Provisioning Backend
//!
//! The seam to the infrastructure provisioning API. Implementations map these
//! calls onto the real backend client for the account and region named by a
//! [`StackLocation`]; credential and role plumbing stays on their side.
//!
//! Every call returns the backend's raw [`BackendError`] so callers can run it
//! through the [`ErrorClassifier`](crate::classifier::ErrorClassifier).

pub mod facade;

use crate::error::BackendError;
use crate::models::{OnFailure, StackConfiguration};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use facade::StackFacade;

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Which backend client to use: target region and the role to reach the account
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackLocation {
    pub region: Option<String>,
    pub execution_role_arn: Option<String>,
}

impl StackLocation {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn of(configuration: &StackConfiguration) -> Self {
        Self {
            region: configuration.region.clone(),
            execution_role_arn: configuration.execution_role_arn.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStackRequest {
    pub location: StackLocation,
    pub stack_name: String,
    pub template_url: String,
    pub parameters: Vec<(String, String)>,
    pub tags: Vec<Tag>,
    pub capabilities: Vec<String>,
    pub client_request_token: String,
    pub role_arn: Option<String>,
    pub notification_arns: Vec<String>,
    pub on_failure: Option<OnFailure>,
    pub enable_termination_protection: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStackRequest {
    pub location: StackLocation,
    pub stack_name: String,
    pub template_url: String,
    pub parameters: Vec<(String, String)>,
    pub tags: Vec<Tag>,
    pub capabilities: Vec<String>,
    pub client_request_token: String,
    pub role_arn: Option<String>,
    pub notification_arns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteStackRequest {
    pub location: StackLocation,
    pub stack_name: String,
    pub client_request_token: String,
    pub role_arn: Option<String>,
}

/// One entry of a stack's event history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub stack_name: String,
    pub stack_id: String,
    pub logical_resource_id: String,
    pub resource_type: String,
    pub resource_status: String,
    pub resource_status_reason: Option<String>,
    pub client_request_token: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StackEvent {
    /// True for events about the stack itself rather than one of its resources
    pub fn is_stack_level(&self) -> bool {
        self.logical_resource_id == self.stack_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
    pub stack_id: String,
    pub stack_name: String,
    pub stack_status: String,
    pub notification_arns: Vec<String>,
    pub outputs: BTreeMap<String, String>,
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackState {
    InProgress,
    Complete,
}

/// State of the most recent stack-level event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackStatus {
    pub client_request_token: Option<String>,
    pub state: StackState,
    /// Raw backend status, e.g. `UPDATE_COMPLETE`
    pub status: String,
    pub stack_id: String,
}

impl StackStatus {
    pub fn is_in_progress(&self) -> bool {
        self.state == StackState::InProgress
    }
}

/// Provisioning backend operations used by the reconciler
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Returns the backend stack id
    async fn create_stack(&self, request: CreateStackRequest) -> BackendResult<String>;

    /// Returns the backend stack id
    async fn update_stack(&self, request: UpdateStackRequest) -> BackendResult<String>;

    async fn delete_stack(&self, request: DeleteStackRequest) -> BackendResult<()>;

    async fn update_termination_protection(
        &self,
        location: &StackLocation,
        stack_name: &str,
        enabled: bool,
    ) -> BackendResult<()>;

    /// Full event history, most recent first. `stack` is a name or stack id.
    async fn describe_stack_events(
        &self,
        location: &StackLocation,
        stack: &str,
    ) -> BackendResult<Vec<StackEvent>>;

    /// Fails with a "does not exist" error when the stack is absent
    async fn describe_stack(
        &self,
        location: &StackLocation,
        stack: &str,
    ) -> BackendResult<StackDescription>;

    /// Parameter keys declared by the template at `template_url`
    async fn template_parameters(
        &self,
        location: &StackLocation,
        template_url: &str,
    ) -> BackendResult<BTreeSet<String>>;
}
