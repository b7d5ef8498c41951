//! # Reconciler Configuration
//!
//! Layered configuration for the reconciliation core: serde defaults, an
//! optional TOML file, then `RECONCILER__*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stack_reconciler::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from_path(Some("config/reconciler.toml".as_ref()))?;
//! let region = &manager.config().orchestrator.region;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use crate::constants::{tags, DEFAULT_CAPABILITIES};
use crate::error::{ReconcilerError, Result};
use crate::store::is_sql_identifier;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcilerConfig {
    /// Account and region the orchestrator itself runs in
    pub orchestrator: OrchestratorIdentity,

    /// Push channel attached to stacks deployed on the callback path
    pub notification_channel_arn: String,

    /// Tag key carrying the environment name on every deployed stack
    #[serde(default = "default_environment_tag_key")]
    pub environment_tag_key: String,

    /// Capabilities granted when a stack configuration does not name its own
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Identity of the orchestrator's own deployment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrchestratorIdentity {
    pub region: String,
    pub account_id: String,
}

impl OrchestratorIdentity {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Explicit filter directive; falls back to an environment-based level
    pub level: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_url: None,
            table_name: default_table_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

fn default_environment_tag_key() -> String {
    tags::DEFAULT_ENVIRONMENT_TAG_KEY.to_string()
}

fn default_capabilities() -> Vec<String> {
    DEFAULT_CAPABILITIES.iter().map(|c| c.to_string()).collect()
}

fn default_table_name() -> String {
    "reconciler_stack_records".to_string()
}

impl ReconcilerConfig {
    pub fn new(
        orchestrator: OrchestratorIdentity,
        notification_channel_arn: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            notification_channel_arn: notification_channel_arn.into(),
            environment_tag_key: default_environment_tag_key(),
            capabilities: default_capabilities(),
            logging: LoggingConfig::default(),
            store: StoreConfig::default(),
        }
    }

    /// Validate values the reconciler cannot work without
    pub fn validate(&self) -> Result<()> {
        if self.orchestrator.region.trim().is_empty() {
            return Err(ReconcilerError::Configuration(
                "orchestrator.region must not be empty".to_string(),
            ));
        }

        let account = &self.orchestrator.account_id;
        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(ReconcilerError::Configuration(format!(
                "orchestrator.account_id must be a 12 digit account id, got '{account}'"
            )));
        }

        if !self.notification_channel_arn.starts_with("arn:") {
            return Err(ReconcilerError::Configuration(format!(
                "notification_channel_arn must be an ARN, got '{}'",
                self.notification_channel_arn
            )));
        }

        if self.environment_tag_key.trim().is_empty() {
            return Err(ReconcilerError::Configuration(
                "environment_tag_key must not be empty".to_string(),
            ));
        }

        self.store.validate()
    }

    /// Load from an optional TOML file and the environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Ok(ConfigManager::load_from_path(path)?.config().clone())
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        if !is_sql_identifier(&self.table_name) {
            return Err(ReconcilerError::Configuration(format!(
                "store.table_name '{}' is not a valid identifier",
                self.table_name
            )));
        }

        if self.backend == StoreBackend::Postgres && self.database_url.is_none() {
            return Err(ReconcilerError::Configuration(
                "store.database_url is required for the postgres backend".to_string(),
            ));
        }

        Ok(())
    }
}
