//! # Stack Error Resolution
//!
//! A stack-level failure notification only says *that* the stack failed. The
//! root cause is found in the event history of the latest operation: the
//! earliest `CREATE_FAILED`/`UPDATE_FAILED` event, else the earliest rollback
//! start.

use crate::backend::{ProvisioningBackend, StackEvent, StackLocation};
use crate::constants::STACK_RESOURCE_TYPE;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const DEFAULT_ERROR_MESSAGE: &str =
    "could not resolve error, check cloudformation logs for more info";
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackError {
    pub message: String,
    pub resource_id: String,
    /// Backend status of the failing event, reported as the failure code
    pub error_status: String,
}

impl Default for StackError {
    fn default() -> Self {
        Self {
            message: DEFAULT_ERROR_MESSAGE.to_string(),
            resource_id: UNKNOWN.to_string(),
            error_status: UNKNOWN.to_string(),
        }
    }
}

impl StackError {
    fn from_event(event: &StackEvent) -> Self {
        Self {
            message: event
                .resource_status_reason
                .clone()
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            resource_id: event.logical_resource_id.clone(),
            error_status: event.resource_status.clone(),
        }
    }
}

pub struct StackErrorResolver {
    backend: Arc<dyn ProvisioningBackend>,
}

impl std::fmt::Debug for StackErrorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackErrorResolver").finish_non_exhaustive()
    }
}

impl StackErrorResolver {
    pub fn new(backend: Arc<dyn ProvisioningBackend>) -> Self {
        Self { backend }
    }

    pub async fn resolve(
        &self,
        location: &StackLocation,
        stack_name: &str,
        stack_id: Option<&str>,
    ) -> Result<StackError> {
        let events = self
            .backend
            .describe_stack_events(location, stack_id.unwrap_or(stack_name))
            .await?;
        Ok(resolve_from_events(&events, stack_name))
    }
}

/// Root cause among `events` for the latest operation on `stack_name`
pub fn resolve_from_events(events: &[StackEvent], stack_name: &str) -> StackError {
    let operation_start = events
        .iter()
        .filter(|e| e.resource_type == STACK_RESOURCE_TYPE)
        .filter(|e| e.logical_resource_id == stack_name)
        .filter(|e| e.resource_status == "UPDATE_IN_PROGRESS")
        .map(|e| e.timestamp)
        .max();

    let relevant: Vec<&StackEvent> = match operation_start {
        Some(start) => {
            info!(stack_name, since = %start, "Filtering away events before operation start");
            events.iter().filter(|e| e.timestamp >= start).collect()
        }
        None => events.iter().collect(),
    };

    let earliest = |statuses: &[&str]| {
        relevant
            .iter()
            .filter(|e| statuses.contains(&e.resource_status.as_str()))
            .min_by_key(|e| e.timestamp)
            .map(|e| StackError::from_event(e))
    };

    earliest(&["UPDATE_FAILED", "CREATE_FAILED"])
        .or_else(|| earliest(&["UPDATE_ROLLBACK_IN_PROGRESS", "ROLLBACK_IN_PROGRESS"]))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    const VPC: &str = "AWS::EC2::VPC";

    /// Event `seconds` after a fixed start time
    fn event(
        logical_id: &str,
        resource_type: &str,
        status: &str,
        reason: &str,
        seconds: i64,
    ) -> StackEvent {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        StackEvent {
            stack_name: "network".to_string(),
            stack_id: "stack/network/1".to_string(),
            logical_resource_id: logical_id.to_string(),
            resource_type: resource_type.to_string(),
            resource_status: status.to_string(),
            resource_status_reason: Some(reason.to_string()),
            client_request_token: None,
            timestamp: start + Duration::seconds(seconds),
        }
    }

    #[test]
    fn test_earliest_failure_of_latest_operation_wins() {
        let stack = STACK_RESOURCE_TYPE;
        let events = vec![
            event("network", stack, "UPDATE_ROLLBACK_IN_PROGRESS", "rollback", 40),
            event("Subnet", "AWS::EC2::Subnet", "UPDATE_FAILED", "cancelled", 30),
            event("Vpc", VPC, "UPDATE_FAILED", "cidr conflict", 20),
            event("network", stack, "UPDATE_IN_PROGRESS", "user initiated", 10),
            event("Old", VPC, "CREATE_FAILED", "previous run", 0),
        ];

        let error = resolve_from_events(&events, "network");
        assert_eq!(error.message, "cidr conflict");
        assert_eq!(error.resource_id, "Vpc");
        assert_eq!(error.error_status, "UPDATE_FAILED");
    }

    #[test]
    fn test_rollback_start_used_when_no_resource_failed() {
        let stack = STACK_RESOURCE_TYPE;
        let events = vec![
            event("network", stack, "ROLLBACK_IN_PROGRESS", "role invalid", 5),
            event("network", stack, "CREATE_IN_PROGRESS", "user initiated", 0),
        ];

        let error = resolve_from_events(&events, "network");
        assert_eq!(error.message, "role invalid");
        assert_eq!(error.error_status, "ROLLBACK_IN_PROGRESS");
    }

    #[test]
    fn test_default_error_when_nothing_matches() {
        let events = vec![event("network", STACK_RESOURCE_TYPE, "DELETE_COMPLETE", "", 0)];
        let error = resolve_from_events(&events, "network");
        assert_eq!(error, StackError::default());
        assert_eq!(error.error_status, "Unknown");
    }
}
