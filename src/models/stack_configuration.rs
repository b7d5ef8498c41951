//! # Stack Configuration
//!
//! Immutable description of one desired stack mutation, resolved upstream from
//! the merged configuration sources of a workflow step.

use crate::config::OrchestratorIdentity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Whether the target stack should end up present or deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesiredState {
    #[default]
    #[serde(alias = "DEPLOYED")]
    Present,
    Deleted,
}

impl DesiredState {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DesiredState::Deleted)
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::Present => write!(f, "PRESENT"),
            DesiredState::Deleted => write!(f, "DELETED"),
        }
    }
}

/// Backend behavior when a create fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnFailure {
    DoNothing,
    Rollback,
    Delete,
}

impl OnFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnFailure::DoNothing => "DO_NOTHING",
            OnFailure::Rollback => "ROLLBACK",
            OnFailure::Delete => "DELETE",
        }
    }
}

/// A single parameter value.
///
/// A `fallback` value is only used when the deployed stack does not already
/// carry a value for the parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub value: String,
    #[serde(default)]
    pub fallback: bool,
}

impl ParameterValue {
    pub fn locked(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            fallback: false,
        }
    }

    pub fn fallback(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParameterValue>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParameterValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace fallback values with the values a later source supplies.
    ///
    /// Locked values are never replaced. Keys the later source introduces are
    /// not added.
    pub fn merge(&mut self, later: &BTreeMap<String, String>) {
        for (key, current) in self.0.iter_mut() {
            if !current.fallback {
                continue;
            }
            if let Some(value) = later.get(key) {
                debug!(parameter = %key, "Replacing fallback parameter value");
                current.value = value.clone();
            }
        }
    }

    /// Drop every parameter the template does not declare
    pub fn retain_declared(&mut self, declared: &BTreeSet<String>) {
        self.0.retain(|key, _| {
            let keep = declared.contains(key);
            if !keep {
                debug!(parameter = %key, "Removing parameter because it is missing in template");
            }
            keep
        });
    }

    /// Flattened `(key, value)` pairs as sent to the backend
    pub fn to_backend_parameters(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }
}

impl FromIterator<(String, ParameterValue)> for Parameters {
    fn from_iter<T: IntoIterator<Item = (String, ParameterValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfiguration {
    pub stack_name: String,
    /// Template location handed to the backend
    pub template: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Role the backend assumes to apply the template
    pub stack_role_arn: Option<String>,
    /// Role used to reach the target account; its ARN names the account
    pub execution_role_arn: Option<String>,
    pub region: Option<String>,
    pub capabilities: Option<Vec<String>>,
    #[serde(default)]
    pub desired_state: DesiredState,
    pub termination_protection: Option<bool>,
    pub on_failure: Option<OnFailure>,
    /// Key the stack outputs are nested under when reported
    pub output_path: Option<String>,
}

impl StackConfiguration {
    pub fn new(stack_name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            template: template.into(),
            parameters: Parameters::new(),
            tags: BTreeMap::new(),
            stack_role_arn: None,
            execution_role_arn: None,
            region: None,
            capabilities: None,
            desired_state: DesiredState::Present,
            termination_protection: None,
            on_failure: None,
            output_path: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_stack_role(mut self, role_arn: impl Into<String>) -> Self {
        self.stack_role_arn = Some(role_arn.into());
        self
    }

    pub fn with_execution_role(mut self, role_arn: impl Into<String>) -> Self {
        self.execution_role_arn = Some(role_arn.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn with_desired_state(mut self, desired_state: DesiredState) -> Self {
        self.desired_state = desired_state;
        self
    }

    pub fn with_termination_protection(mut self, enabled: bool) -> Self {
        self.termination_protection = Some(enabled);
        self
    }

    pub fn with_on_failure(mut self, on_failure: OnFailure) -> Self {
        self.on_failure = Some(on_failure);
        self
    }

    pub fn with_output_path(mut self, output_path: impl Into<String>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    /// Account id embedded in the execution role ARN, if any
    pub fn role_account_id(&self) -> Option<&str> {
        self.execution_role_arn
            .as_deref()
            .and_then(|arn| arn.split(':').nth(4))
            .filter(|account| !account.is_empty())
    }

    pub fn resolved_region<'a>(&'a self, orchestrator: &'a OrchestratorIdentity) -> &'a str {
        self.region.as_deref().unwrap_or(&orchestrator.region)
    }

    pub fn resolved_account<'a>(&'a self, orchestrator: &'a OrchestratorIdentity) -> &'a str {
        self.role_account_id().unwrap_or(&orchestrator.account_id)
    }

    /// True when the stack lives outside the orchestrator's own region or account
    pub fn is_remote(&self, orchestrator: &OrchestratorIdentity) -> bool {
        self.resolved_region(orchestrator) != orchestrator.region
            || self.resolved_account(orchestrator) != orchestrator.account_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> OrchestratorIdentity {
        OrchestratorIdentity::new("eu-west-1", "111111111111")
    }

    #[test]
    fn test_absent_region_and_role_resolve_to_orchestrator() {
        let config = StackConfiguration::new("network", "https://bucket/network.yaml");
        assert_eq!(config.resolved_region(&orchestrator()), "eu-west-1");
        assert_eq!(config.resolved_account(&orchestrator()), "111111111111");
        assert!(!config.is_remote(&orchestrator()));
    }

    #[test]
    fn test_role_arn_determines_account() {
        let config = StackConfiguration::new("network", "t")
            .with_execution_role("arn:aws:iam::222222222222:role/deploy");
        assert_eq!(config.role_account_id(), Some("222222222222"));
        assert!(config.is_remote(&orchestrator()));
    }

    #[test]
    fn test_other_region_is_remote() {
        let config = StackConfiguration::new("network", "t").with_region("us-east-1");
        assert!(config.is_remote(&orchestrator()));

        let same = StackConfiguration::new("network", "t").with_region("eu-west-1");
        assert!(!same.is_remote(&orchestrator()));
    }

    #[test]
    fn test_desired_state_accepts_legacy_name() {
        let state: DesiredState = serde_json::from_str("\"DEPLOYED\"").unwrap();
        assert_eq!(state, DesiredState::Present);
        assert_eq!(serde_json::to_string(&DesiredState::Deleted).unwrap(), "\"DELETED\"");
    }

    #[test]
    fn test_merge_only_replaces_fallback_values() {
        let mut params: Parameters = [
            ("Locked".to_string(), ParameterValue::locked("a")),
            ("Soft".to_string(), ParameterValue::fallback("default")),
            ("Unset".to_string(), ParameterValue::fallback("keep")),
        ]
        .into_iter()
        .collect();

        let existing = BTreeMap::from([
            ("Locked".to_string(), "b".to_string()),
            ("Soft".to_string(), "deployed".to_string()),
            ("Extra".to_string(), "x".to_string()),
        ]);
        params.merge(&existing);

        assert_eq!(params.get("Locked").unwrap().value, "a");
        assert_eq!(params.get("Soft").unwrap().value, "deployed");
        assert_eq!(params.get("Unset").unwrap().value, "keep");
        assert!(params.get("Extra").is_none());
    }

    #[test]
    fn test_retain_declared_drops_unknown_parameters() {
        let mut params: Parameters = [
            ("VpcId".to_string(), ParameterValue::locked("vpc-1")),
            ("Stale".to_string(), ParameterValue::locked("x")),
        ]
        .into_iter()
        .collect();

        params.retain_declared(&BTreeSet::from(["VpcId".to_string()]));
        assert_eq!(params.len(), 1);
        assert_eq!(
            params.to_backend_parameters(),
            vec![("VpcId".to_string(), "vpc-1".to_string())]
        );
    }
}
