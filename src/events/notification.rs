//! Inbound stack change notifications.

use crate::error::{ReconcilerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One resource-level change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackNotification {
    pub stack_name: String,
    pub logical_resource_id: String,
    pub resource_type: String,
    pub resource_status: String,
    #[serde(default)]
    pub resource_status_reason: Option<String>,
    pub client_request_token: String,
    #[serde(default)]
    pub stack_id: Option<String>,
}

impl StackNotification {
    /// Parse the backend's `Key='Value'` newline separated message text
    pub fn from_sns_message(message: &str) -> Result<Self> {
        let fields: HashMap<&str, String> = message
            .split("'\n")
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), value.replace('\'', "")))
            .collect();

        let required = |name: &str| -> Result<String> {
            fields.get(name).cloned().ok_or_else(|| {
                ReconcilerError::Validation(format!("Notification is missing field {name}"))
            })
        };

        Ok(Self {
            stack_name: required("StackName")?,
            logical_resource_id: required("LogicalResourceId")?,
            resource_type: required("ResourceType")?,
            resource_status: required("ResourceStatus")?,
            resource_status_reason: fields
                .get("ResourceStatusReason")
                .filter(|reason| !reason.is_empty())
                .cloned(),
            client_request_token: required("ClientRequestToken")?,
            stack_id: fields.get("StackId").cloned(),
        })
    }

    /// True when the notification concerns the stack itself
    pub fn is_current_stack(&self) -> bool {
        self.stack_name == self.logical_resource_id
    }
}
