//! # Test Doubles
//!
//! In-memory stand-ins for the external systems the reconciler talks to.
//! Used by the unit and integration tests and usable by embedders to
//! dry-run a deployment plan.

pub mod backend;
pub mod workflow;

pub use backend::{BackendCall, InMemoryBackend};
pub use workflow::{RecordingWorkflowEngine, WorkflowReport};
