//! # Backend Constants
//!
//! Status names, tag keys, and resource types defined by the provisioning
//! backend. These strings are part of the backend's contract and are matched
//! verbatim.

/// Resource type carried by stack-level change notifications
pub const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Capabilities granted to every stack operation unless the configuration narrows them
pub const DEFAULT_CAPABILITIES: &[&str] = &[
    "CAPABILITY_AUTO_EXPAND",
    "CAPABILITY_NAMED_IAM",
    "CAPABILITY_IAM",
];

/// Tags attached to every stack issued by the orchestrator
pub mod tags {
    pub const DISTRIBUTION_NAME: &str = "AttiniDistributionName";
    pub const RESOURCE_TYPE: &str = "AttiniResourceType";
    pub const RESOURCE_TYPE_VALUE: &str = "cloudformation-stack";
    pub const DEFAULT_ENVIRONMENT_TAG_KEY: &str = "AttiniEnvironmentName";
}

/// Backend error codes inspected outside the classifier
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "ValidationError";
    pub const ACCESS_DENIED: &str = "AccessDenied";
    pub const ALREADY_EXISTS: &str = "AlreadyExistsException";
}

pub mod status_groups {
    /// Stack statuses meaning the backend is still working on the stack
    pub const IN_PROGRESS_STATUSES: &[&str] = &[
        "CREATE_IN_PROGRESS",
        "ROLLBACK_IN_PROGRESS",
        "DELETE_IN_PROGRESS",
        "UPDATE_IN_PROGRESS",
        "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
        "UPDATE_ROLLBACK_IN_PROGRESS",
        "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS",
        "REVIEW_IN_PROGRESS",
        "IMPORT_IN_PROGRESS",
        "IMPORT_ROLLBACK_IN_PROGRESS",
        "IMPORT_ROLLBACK_FAILED",
    ];

    /// Statuses reported to the workflow as a failed step
    pub const FAILED_STATUSES: &[&str] = &[
        "CREATE_FAILED",
        "UPDATE_FAILED",
        "ROLLBACK_FAILED",
        "ROLLBACK_COMPLETE",
        "DELETE_FAILED",
        "UPDATE_ROLLBACK_FAILED",
        "UPDATE_ROLLBACK_COMPLETE",
    ];

    /// Statuses reported to the workflow as a successful step
    pub const UPDATED_STATUSES: &[&str] = &["UPDATE_COMPLETE", "CREATE_COMPLETE"];

    pub const DELETED_STATUS: &str = "DELETE_COMPLETE";

    /// Stack-level statuses marking the start of an operation
    pub const OPERATION_START_STATUSES: &[&str] =
        &["CREATE_IN_PROGRESS", "UPDATE_IN_PROGRESS", "DELETE_IN_PROGRESS"];

    pub fn is_in_progress(status: &str) -> bool {
        IN_PROGRESS_STATUSES.contains(&status)
    }

    pub fn is_failed(status: &str) -> bool {
        FAILED_STATUSES.contains(&status)
    }

    pub fn is_updated(status: &str) -> bool {
        UPDATED_STATUSES.contains(&status)
    }

    pub fn is_deleted(status: &str) -> bool {
        status == DELETED_STATUS
    }
}
