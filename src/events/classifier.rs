//! Classification of stack change notifications.

use super::notification::StackNotification;
use crate::constants::{status_groups, STACK_RESOURCE_TYPE};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Resource-level progress; ignored
    ResourceUpdate,
    /// Nested resource failed; recorded, step not completed
    ResourceFailed,
    StackUpdated,
    StackFailed,
    StackDeleted,
    /// Stack-level but not final; ignored
    StackInProgress,
}

impl EventType {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            EventType::StackUpdated | EventType::StackFailed | EventType::StackDeleted
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::ResourceUpdate => "RESOURCE_UPDATE",
            EventType::ResourceFailed => "RESOURCE_FAILED",
            EventType::StackUpdated => "STACK_UPDATED",
            EventType::StackFailed => "STACK_FAILED",
            EventType::StackDeleted => "STACK_DELETED",
            EventType::StackInProgress => "STACK_IN_PROGRESS",
        };
        f.write_str(name)
    }
}

/// First match wins.
pub fn classify(notification: &StackNotification) -> EventType {
    let is_stack_type = notification.resource_type.contains(STACK_RESOURCE_TYPE);
    let is_current = notification.is_current_stack();
    let status = notification.resource_status.as_str();
    let failed = status_groups::is_failed(status);

    if !is_stack_type && !failed {
        return EventType::ResourceUpdate;
    }
    if !is_current && !failed {
        return EventType::ResourceUpdate;
    }
    if !is_current {
        return EventType::ResourceFailed;
    }
    if status_groups::is_updated(status) {
        return EventType::StackUpdated;
    }
    if failed {
        return EventType::StackFailed;
    }
    if status_groups::is_deleted(status) {
        return EventType::StackDeleted;
    }
    EventType::StackInProgress
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(logical_id: &str, resource_type: &str, status: &str) -> StackNotification {
        StackNotification {
            stack_name: "network".to_string(),
            logical_resource_id: logical_id.to_string(),
            resource_type: resource_type.to_string(),
            resource_status: status.to_string(),
            resource_status_reason: None,
            client_request_token: "run-1".to_string(),
            stack_id: None,
        }
    }

    #[test]
    fn test_resource_progress_is_ignored() {
        assert_eq!(
            classify(&notification("Vpc", "AWS::EC2::VPC", "CREATE_IN_PROGRESS")),
            EventType::ResourceUpdate
        );
        assert_eq!(
            classify(&notification("Nested", "AWS::CloudFormation::Stack", "UPDATE_COMPLETE")),
            EventType::ResourceUpdate
        );
    }

    #[test]
    fn test_nested_failure_is_resource_failed() {
        assert_eq!(
            classify(&notification("Vpc", "AWS::EC2::VPC", "CREATE_FAILED")),
            EventType::ResourceFailed
        );
        assert_eq!(
            classify(&notification("Nested", "AWS::CloudFormation::Stack", "UPDATE_FAILED")),
            EventType::ResourceFailed
        );
    }

    const STACK_TYPE: &str = "AWS::CloudFormation::Stack";

    #[test]
    fn test_stack_level_outcomes() {
        let stack_event = |status| classify(&notification("network", STACK_TYPE, status));
        assert_eq!(stack_event("CREATE_COMPLETE"), EventType::StackUpdated);
        assert_eq!(stack_event("UPDATE_COMPLETE"), EventType::StackUpdated);
        assert_eq!(stack_event("ROLLBACK_COMPLETE"), EventType::StackFailed);
        assert_eq!(stack_event("UPDATE_ROLLBACK_COMPLETE"), EventType::StackFailed);
        assert_eq!(stack_event("DELETE_COMPLETE"), EventType::StackDeleted);
        assert_eq!(
            stack_event("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            EventType::StackInProgress
        );
    }

    #[test]
    fn test_only_stack_outcomes_are_final() {
        assert!(EventType::StackDeleted.is_final());
        assert!(!EventType::ResourceFailed.is_final());
        assert!(!EventType::StackInProgress.is_final());
    }
}
