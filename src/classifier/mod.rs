//! # Backend Error Classification
//!
//! Maps raw provisioning backend failures to the outcome the deployers act on.
//! Classification is purely textual and the matched fragments are the
//! backend's own wording, so they live here and nowhere else.
//!
//! ## Order
//!
//! First match wins:
//!
//! 1. message ends with the rollback-complete suffix → [`BackendErrorKind::RollbackComplete`]
//! 2. message is exactly the no-update text → [`BackendErrorKind::NoUpdateToPerform`]
//! 3. message contains `does not exist` → [`BackendErrorKind::NoStackExists`]
//! 4. code is `ValidationError` → [`BackendErrorKind::ValidationError`]
//! 5. code is `AccessDenied` → [`BackendErrorKind::AccessDenied`]
//! 6. anything else → [`BackendErrorKind::UnknownError`]

use crate::constants::error_codes;
use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use std::fmt;

const ROLLBACK_COMPLETE_SUFFIX: &str = "is in ROLLBACK_COMPLETE state and can not be updated.";
const NO_UPDATES_MESSAGE: &str = "No updates are to be performed.";
const STACK_MISSING_FRAGMENT: &str = "does not exist";
const TEMPLATE_ACCESS_DENIED_FRAGMENT: &str = "S3 error: Access Denied";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendErrorKind {
    RollbackComplete,
    NoUpdateToPerform,
    NoStackExists,
    ValidationError,
    AccessDenied,
    UnknownError,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendErrorKind::RollbackComplete => "ROLLBACK_COMPLETE",
            BackendErrorKind::NoUpdateToPerform => "NO_UPDATE_TO_PERFORM",
            BackendErrorKind::NoStackExists => "NO_STACK_EXISTS",
            BackendErrorKind::ValidationError => "VALIDATION_ERROR",
            BackendErrorKind::AccessDenied => "ACCESS_DENIED",
            BackendErrorKind::UnknownError => "UNKNOWN_ERROR",
        };
        f.write_str(name)
    }
}

/// Stateless classifier for backend errors
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(error: &BackendError) -> BackendErrorKind {
        let message = error.message.as_str();

        if message.ends_with(ROLLBACK_COMPLETE_SUFFIX) {
            BackendErrorKind::RollbackComplete
        } else if message == NO_UPDATES_MESSAGE {
            BackendErrorKind::NoUpdateToPerform
        } else if message.contains(STACK_MISSING_FRAGMENT) {
            BackendErrorKind::NoStackExists
        } else if error.code == error_codes::VALIDATION_ERROR {
            BackendErrorKind::ValidationError
        } else if error.code == error_codes::ACCESS_DENIED {
            BackendErrorKind::AccessDenied
        } else {
            BackendErrorKind::UnknownError
        }
    }

    /// Operator-facing message for a validation failure.
    ///
    /// An unreachable template object is the common cause, so it gets a
    /// message pointing at the path or permissions.
    pub fn validation_message(error: &BackendError, template: &str) -> String {
        if error.message.contains(TEMPLATE_ACCESS_DENIED_FRAGMENT) {
            format!(
                "Could not get the template file from S3, this is most likely due to that that the specified template does not exist in S3 or that attini does not have access to S3, specified template = {template}"
            )
        } else {
            format!("A validation error occurred, message = {}", error.message)
        }
    }

    /// A validation error on delete that is not about termination protection
    /// means the stack is already gone.
    pub fn is_already_deleted(error: &BackendError) -> bool {
        error.code == error_codes::VALIDATION_ERROR
            && !error.message.contains("TerminationProtection")
    }
}
