#![allow(clippy::doc_markdown)] // Allow technical terms like CloudFormation, PostgreSQL in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Stack Reconciler
//!
//! Drives infrastructure stacks toward a desired state on behalf of a paused
//! workflow step, and resumes the step once the stack settles.
//!
//! ## Overview
//!
//! A deployment plan step hands the reconciler a stack configuration and a
//! resumption token. The reconciler issues at most one backend mutation per
//! invocation, remembers what it asked for in a coordination store, and
//! reports success (with the stack's outputs) or failure back to the workflow
//! engine when the stack reaches a terminal state.
//!
//! ## Module Organization
//!
//! - [`deploy`] - Strategy selection and the callback/polling deployers
//! - [`events`] - Notification handling and completion reporting
//! - [`backend`] - Provisioning backend seam and request building
//! - [`classifier`] - Backend error classification
//! - [`store`] - Coordination records and the execution error log
//! - [`workflow`] - Workflow engine callbacks
//! - [`models`] - Stack configuration, operation context, tokens
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`testing`] - In-memory doubles for the external systems
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stack_reconciler::config::{OrchestratorIdentity, ReconcilerConfig};
//! use stack_reconciler::deploy::StackDeployHandler;
//! use stack_reconciler::models::{
//!     DistributionContext, ExecutionArn, ExecutionMetadata, StackConfiguration,
//!     StackOperationContext,
//! };
//! use stack_reconciler::store::{InMemoryCoordinationStore, InMemoryExecutionErrorLog};
//! use stack_reconciler::testing::{InMemoryBackend, RecordingWorkflowEngine};
//! use std::sync::Arc;
//!
//! # async fn example() -> stack_reconciler::Result<()> {
//! let config = ReconcilerConfig::new(
//!     OrchestratorIdentity::new("eu-west-1", "111111111111"),
//!     "arn:aws:sns:eu-west-1:111111111111:deploy-events",
//! );
//! let handler = StackDeployHandler::new(
//!     Arc::new(InMemoryBackend::new()),
//!     Arc::new(InMemoryCoordinationStore::new()),
//!     Arc::new(RecordingWorkflowEngine::new()),
//!     Arc::new(InMemoryExecutionErrorLog::new()),
//!     &config,
//! );
//!
//! let context = StackOperationContext::new(
//!     StackConfiguration::new("network", "https://bucket.s3.amazonaws.com/network.yaml"),
//!     DistributionContext::new("platform", "dist-1", "prod", "obj-1"),
//!     ExecutionMetadata::new(
//!         ExecutionArn::new("arn:aws:states:eu-west-1:111111111111:execution:plan:run-1"),
//!         "resumption-token",
//!         "DeployNetwork",
//!     ),
//! );
//! let outcome = handler.deploy(&context).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod store;
pub mod testing;
pub mod workflow;

pub use backend::{ProvisioningBackend, StackFacade, StackLocation};
pub use classifier::{BackendErrorKind, ErrorClassifier};
pub use config::{ConfigManager, OrchestratorIdentity, ReconcilerConfig};
pub use deploy::{DeliveryStrategy, DeployOutcome, StackDeployHandler};
pub use error::{BackendError, ReconcilerError, Result};
pub use events::{
    CompletionOutcome, CompletionReporter, ManualCompletion, NotificationOutcome,
    StackNotification,
};
pub use logging::init_structured_logging;
pub use models::{
    DesiredState, StackConfiguration, StackKey, StackOperationContext,
};
pub use store::{CoordinationStore, ExecutionErrorLog, StackRecord};
pub use workflow::{FailureCode, WorkflowEngine};
