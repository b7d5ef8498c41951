//! In-memory provisioning backend.
//!
//! Keeps per-stack status, event history, outputs, parameters and notification
//! channels, records every mutating call, and can be told to fail the next call
//! of a kind. Templates declare their parameters through
//! [`InMemoryBackend::declare_template`].

use crate::backend::{
    BackendResult, CreateStackRequest, DeleteStackRequest, ProvisioningBackend, StackDescription,
    StackEvent, StackLocation, UpdateStackRequest,
};
use crate::constants::{error_codes, status_groups::DELETED_STATUS, STACK_RESOURCE_TYPE};
use crate::error::BackendError;
use crate::events::StackNotification;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Calls made against the backend, in order
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Create(CreateStackRequest),
    Update(UpdateStackRequest),
    Delete(DeleteStackRequest),
    UpdateTerminationProtection { stack_name: String, enabled: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Operation {
    Create,
    Update,
    Delete,
    DescribeEvents,
    DescribeStack,
    TemplateSummary,
}

#[derive(Debug, Clone)]
struct FakeStack {
    stack_id: String,
    status: String,
    notification_arns: Vec<String>,
    outputs: BTreeMap<String, String>,
    parameters: BTreeMap<String, String>,
    termination_protection: bool,
    last_token: Option<String>,
    /// Oldest first
    events: Vec<StackEvent>,
}

#[derive(Debug)]
pub struct InMemoryBackend {
    stacks: Mutex<HashMap<String, FakeStack>>,
    templates: Mutex<HashMap<String, BTreeSet<String>>>,
    calls: Mutex<Vec<BackendCall>>,
    failures: Mutex<HashMap<Operation, BackendError>>,
    sequence: Mutex<i64>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(stack: &str) -> BackendError {
    BackendError::new(
        error_codes::VALIDATION_ERROR,
        format!("Stack with id {stack} does not exist"),
    )
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            stacks: Mutex::new(HashMap::new()),
            templates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            sequence: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Put a stack in place with a single stack-level event
    pub fn seed_stack(&self, stack_name: &str, status: &str, token: Option<&str>) {
        let stack_id = self.next_stack_id(stack_name);
        self.stacks.lock().insert(
            stack_name.to_string(),
            FakeStack {
                stack_id,
                status: status.to_string(),
                notification_arns: Vec::new(),
                outputs: BTreeMap::new(),
                parameters: BTreeMap::new(),
                termination_protection: false,
                last_token: token.map(str::to_string),
                events: Vec::new(),
            },
        );
        self.push_event(stack_name, stack_name, STACK_RESOURCE_TYPE, status, None, token);
    }

    /// Append an event; a stack-level event also moves the stack's status
    pub fn push_event(
        &self,
        stack_name: &str,
        logical_resource_id: &str,
        resource_type: &str,
        status: &str,
        reason: Option<&str>,
        token: Option<&str>,
    ) {
        let timestamp = self.tick();
        let mut stacks = self.stacks.lock();
        let Some(stack) = stacks.get_mut(stack_name) else {
            return;
        };
        if logical_resource_id == stack_name {
            stack.status = status.to_string();
        }
        stack.events.push(StackEvent {
            stack_name: stack_name.to_string(),
            stack_id: stack.stack_id.clone(),
            logical_resource_id: logical_resource_id.to_string(),
            resource_type: resource_type.to_string(),
            resource_status: status.to_string(),
            resource_status_reason: reason.map(str::to_string),
            client_request_token: token.map(str::to_string),
            timestamp,
        });
    }

    /// Finish the stack's latest operation with `status` and return the
    /// stack-level notification the channel would deliver
    pub fn finish_operation(&self, stack_name: &str, status: &str) -> Option<StackNotification> {
        let token = self.last_token(stack_name)?;
        self.push_event(
            stack_name,
            stack_name,
            STACK_RESOURCE_TYPE,
            status,
            None,
            Some(&token),
        );
        Some(StackNotification {
            stack_name: stack_name.to_string(),
            logical_resource_id: stack_name.to_string(),
            resource_type: STACK_RESOURCE_TYPE.to_string(),
            resource_status: status.to_string(),
            resource_status_reason: None,
            client_request_token: token,
            stack_id: self.stack_id(stack_name),
        })
    }

    pub fn fail_next_create(&self, error: BackendError) {
        self.failures.lock().insert(Operation::Create, error);
    }

    pub fn fail_next_update(&self, error: BackendError) {
        self.failures.lock().insert(Operation::Update, error);
    }

    pub fn fail_next_delete(&self, error: BackendError) {
        self.failures.lock().insert(Operation::Delete, error);
    }

    pub fn fail_next_describe_events(&self, error: BackendError) {
        self.failures.lock().insert(Operation::DescribeEvents, error);
    }

    pub fn fail_next_describe_stack(&self, error: BackendError) {
        self.failures.lock().insert(Operation::DescribeStack, error);
    }

    pub fn fail_next_template_summary(&self, error: BackendError) {
        self.failures.lock().insert(Operation::TemplateSummary, error);
    }

    /// Register the parameter keys a template declares
    pub fn declare_template(&self, template_url: &str, parameters: &[&str]) {
        self.templates.lock().insert(
            template_url.to_string(),
            parameters.iter().map(|p| p.to_string()).collect(),
        );
    }

    /// Parameter values the deployed stack currently carries
    pub fn set_parameters(&self, stack_name: &str, parameters: &[(&str, &str)]) {
        if let Some(stack) = self.stacks.lock().get_mut(stack_name) {
            stack.parameters = parameters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        }
    }

    pub fn attach_notification_channel(&self, stack_name: &str, arn: &str) {
        if let Some(stack) = self.stacks.lock().get_mut(stack_name) {
            stack.notification_arns.push(arn.to_string());
        }
    }

    pub fn set_outputs(&self, stack_name: &str, outputs: &[(&str, &str)]) {
        if let Some(stack) = self.stacks.lock().get_mut(stack_name) {
            stack.outputs = outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        }
    }

    pub fn status(&self, stack_name: &str) -> Option<String> {
        self.stacks.lock().get(stack_name).map(|s| s.status.clone())
    }

    pub fn stack_id(&self, stack_name: &str) -> Option<String> {
        self.stacks.lock().get(stack_name).map(|s| s.stack_id.clone())
    }

    /// Token of the latest mutation issued against the stack
    pub fn last_token(&self, stack_name: &str) -> Option<String> {
        self.stacks
            .lock()
            .get(stack_name)
            .and_then(|s| s.last_token.clone())
    }

    pub fn termination_protection(&self, stack_name: &str) -> Option<bool> {
        self.stacks
            .lock()
            .get(stack_name)
            .map(|s| s.termination_protection)
    }

    fn tick(&self) -> DateTime<Utc> {
        let sequence = self.next_sequence();
        DateTime::from_timestamp(1_700_000_000 + sequence, 0).unwrap_or_default()
    }

    fn next_sequence(&self) -> i64 {
        let mut sequence = self.sequence.lock();
        *sequence += 1;
        *sequence
    }

    fn next_stack_id(&self, stack_name: &str) -> String {
        let id = self.next_sequence();
        format!("arn:aws:cloudformation:eu-west-1:111111111111:stack/{stack_name}/{id}")
    }

    fn take_failure(&self, operation: Operation) -> BackendResult<()> {
        match self.failures.lock().remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// A stack whose last status is `DELETE_COMPLETE` no longer resolves by name
    fn is_live(&self, stack_name: &str) -> bool {
        self.stacks
            .lock()
            .get(stack_name)
            .is_some_and(|s| s.status != DELETED_STATUS)
    }
}

#[async_trait]
impl ProvisioningBackend for InMemoryBackend {
    async fn create_stack(&self, request: CreateStackRequest) -> BackendResult<String> {
        self.calls.lock().push(BackendCall::Create(request.clone()));
        self.take_failure(Operation::Create)?;

        if self.is_live(&request.stack_name) {
            return Err(BackendError::new(
                error_codes::ALREADY_EXISTS,
                format!("Stack [{}] already exists", request.stack_name),
            ));
        }

        let stack_id = self.next_stack_id(&request.stack_name);
        self.stacks.lock().insert(
            request.stack_name.clone(),
            FakeStack {
                stack_id: stack_id.clone(),
                status: "CREATE_IN_PROGRESS".to_string(),
                notification_arns: request.notification_arns.clone(),
                outputs: BTreeMap::new(),
                parameters: request.parameters.iter().cloned().collect(),
                termination_protection: request.enable_termination_protection.unwrap_or(false),
                last_token: Some(request.client_request_token.clone()),
                events: Vec::new(),
            },
        );
        self.push_event(
            &request.stack_name,
            &request.stack_name,
            STACK_RESOURCE_TYPE,
            "CREATE_IN_PROGRESS",
            Some("User Initiated"),
            Some(&request.client_request_token),
        );
        Ok(stack_id)
    }

    async fn update_stack(&self, request: UpdateStackRequest) -> BackendResult<String> {
        self.calls.lock().push(BackendCall::Update(request.clone()));
        self.take_failure(Operation::Update)?;

        if !self.is_live(&request.stack_name) {
            return Err(missing(&request.stack_name));
        }

        let stack_id = {
            let mut stacks = self.stacks.lock();
            let Some(stack) = stacks.get_mut(&request.stack_name) else {
                return Err(missing(&request.stack_name));
            };
            if !request.notification_arns.is_empty() {
                stack.notification_arns = request.notification_arns.clone();
            }
            stack.parameters = request.parameters.iter().cloned().collect();
            stack.last_token = Some(request.client_request_token.clone());
            stack.stack_id.clone()
        };
        self.push_event(
            &request.stack_name,
            &request.stack_name,
            STACK_RESOURCE_TYPE,
            "UPDATE_IN_PROGRESS",
            Some("User Initiated"),
            Some(&request.client_request_token),
        );
        Ok(stack_id)
    }

    async fn delete_stack(&self, request: DeleteStackRequest) -> BackendResult<()> {
        self.calls.lock().push(BackendCall::Delete(request.clone()));
        self.take_failure(Operation::Delete)?;

        if !self.is_live(&request.stack_name) {
            return Ok(());
        }

        if let Some(stack) = self.stacks.lock().get_mut(&request.stack_name) {
            stack.last_token = Some(request.client_request_token.clone());
        }
        self.push_event(
            &request.stack_name,
            &request.stack_name,
            STACK_RESOURCE_TYPE,
            "DELETE_IN_PROGRESS",
            Some("User Initiated"),
            Some(&request.client_request_token),
        );
        Ok(())
    }

    async fn update_termination_protection(
        &self,
        _location: &StackLocation,
        stack_name: &str,
        enabled: bool,
    ) -> BackendResult<()> {
        self.calls.lock().push(BackendCall::UpdateTerminationProtection {
            stack_name: stack_name.to_string(),
            enabled,
        });
        if !self.is_live(stack_name) {
            return Err(missing(stack_name));
        }
        if let Some(stack) = self.stacks.lock().get_mut(stack_name) {
            stack.termination_protection = enabled;
        }
        Ok(())
    }

    async fn describe_stack_events(
        &self,
        _location: &StackLocation,
        stack: &str,
    ) -> BackendResult<Vec<StackEvent>> {
        self.take_failure(Operation::DescribeEvents)?;
        let stacks = self.stacks.lock();
        let found = stacks
            .get(stack)
            .filter(|s| s.status != DELETED_STATUS)
            .or_else(|| stacks.values().find(|s| s.stack_id == stack));
        match found {
            Some(s) => Ok(s.events.iter().rev().cloned().collect()),
            None => Err(missing(stack)),
        }
    }

    async fn describe_stack(
        &self,
        _location: &StackLocation,
        stack: &str,
    ) -> BackendResult<StackDescription> {
        self.take_failure(Operation::DescribeStack)?;
        let stacks = self.stacks.lock();
        let found = stacks
            .iter()
            .find(|(name, s)| name.as_str() == stack && s.status != DELETED_STATUS)
            .or_else(|| stacks.iter().find(|(_, s)| s.stack_id == stack));
        match found {
            Some((name, s)) => Ok(StackDescription {
                stack_id: s.stack_id.clone(),
                stack_name: name.clone(),
                stack_status: s.status.clone(),
                notification_arns: s.notification_arns.clone(),
                outputs: s.outputs.clone(),
                parameters: s.parameters.clone(),
            }),
            None => Err(missing(stack)),
        }
    }

    async fn template_parameters(
        &self,
        _location: &StackLocation,
        template_url: &str,
    ) -> BackendResult<BTreeSet<String>> {
        self.take_failure(Operation::TemplateSummary)?;
        self.templates.lock().get(template_url).cloned().ok_or_else(|| {
            BackendError::new(
                error_codes::VALIDATION_ERROR,
                format!("Template format error: no template found at {template_url}"),
            )
        })
    }
}
