//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate. Sources are layered
//! in order: serde defaults, an optional TOML file, then environment variables
//! prefixed with `RECONCILER__` (nested keys separated by `__`).

use super::ReconcilerConfig;
use crate::error::{ReconcilerError, Result};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub const ENV_PREFIX: &str = "RECONCILER";
pub const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: ReconcilerConfig,
}

impl ConfigManager {
    /// Load configuration from environment variables only
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_path(None)
    }

    /// Load configuration from an optional TOML file overlaid with environment variables
    pub fn load_from_path(path: Option<&Path>) -> Result<Arc<ConfigManager>> {
        let environment = detect_environment();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ReconcilerError::Configuration(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "Adding configuration file source");
            builder = builder.add_source(
                config::File::from(path.to_path_buf()).format(config::FileFormat::Toml),
            );
        }
        // Values stay strings; account ids may carry leading zeros
        builder = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR));

        let config: ReconcilerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            environment = %environment,
            region = %config.orchestrator.region,
            account_id = %config.orchestrator.account_id,
            store_backend = ?config.store.backend,
            "Configuration loaded successfully"
        );
        debug!(config = %sanitize_config_for_logging(&config), "Effective configuration");

        Ok(Arc::new(ConfigManager { config }))
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Detect the current environment name
pub fn detect_environment() -> String {
    env::var("RECONCILER_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase()
}

/// Configuration as JSON with credentials masked
fn sanitize_config_for_logging(config: &ReconcilerConfig) -> serde_json::Value {
    let mut value = serde_json::json!(config);
    if let Some(url) = value
        .get_mut("store")
        .and_then(|store| store.get_mut("database_url"))
    {
        if url.is_string() {
            *url = serde_json::Value::String("[MASKED]".to_string());
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogFormat, StoreBackend};
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp config");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn test_load_from_toml_file() {
        let file = write_config(
            r#"
notification_channel_arn = "arn:aws:sns:eu-north-1:111122223333:deploy-events"

[orchestrator]
region = "eu-north-1"
account_id = "111122223333"

[logging]
format = "json"

[store]
table_name = "stack_records"
"#,
        );

        let manager = ConfigManager::load_from_path(Some(file.path())).expect("config loads");
        let config = manager.config();
        assert_eq!(config.orchestrator.region, "eu-north-1");
        assert_eq!(config.orchestrator.account_id, "111122223333");
        assert_eq!(config.environment_tag_key, "AttiniEnvironmentName");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.table_name, "stack_records");
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let file = write_config(
            r#"
notification_channel_arn = "deploy-events"

[orchestrator]
region = "eu-north-1"
account_id = "111122223333"
"#,
        );

        let err = ConfigManager::load_from_path(Some(file.path())).unwrap_err();
        assert!(matches!(
            err,
            ReconcilerError::Configuration(msg) if msg.contains("notification_channel_arn")
        ));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = ConfigManager::load_from_path(Some(Path::new("/nonexistent/reconciler.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_sanitize_masks_database_url() {
        let mut config = ReconcilerConfig::new(
            crate::config::OrchestratorIdentity::new("eu-west-1", "123456789012"),
            "arn:aws:sns:eu-west-1:123456789012:events",
        );
        config.store.database_url = Some("postgresql://user:secret@db/reconciler".to_string());

        let sanitized = sanitize_config_for_logging(&config);
        assert_eq!(sanitized["store"]["database_url"], "[MASKED]");
        assert_eq!(sanitized["orchestrator"]["region"], "eu-west-1");
    }
}
