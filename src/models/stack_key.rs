//! Coordination store key for one stack.

use super::stack_configuration::StackConfiguration;
use crate::config::OrchestratorIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `(stack name, resolved region, resolved account)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackKey {
    pub stack_name: String,
    pub region: String,
    pub account_id: String,
}

impl StackKey {
    pub fn new(
        stack_name: impl Into<String>,
        region: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            stack_name: stack_name.into(),
            region: region.into(),
            account_id: account_id.into(),
        }
    }

    pub fn for_configuration(
        configuration: &StackConfiguration,
        orchestrator: &OrchestratorIdentity,
    ) -> Self {
        Self::new(
            configuration.stack_name.clone(),
            configuration.resolved_region(orchestrator),
            configuration.resolved_account(orchestrator),
        )
    }

    /// Push notifications only arrive for stacks in the orchestrator's own topology
    pub fn for_local_stack(
        stack_name: impl Into<String>,
        orchestrator: &OrchestratorIdentity,
    ) -> Self {
        Self::new(
            stack_name,
            orchestrator.region.clone(),
            orchestrator.account_id.clone(),
        )
    }
}

impl fmt::Display for StackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.stack_name, self.region, self.account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_uses_resolved_topology() {
        let orchestrator = OrchestratorIdentity::new("eu-west-1", "111111111111");
        let config = StackConfiguration::new("network", "t")
            .with_region("us-east-1")
            .with_execution_role("arn:aws:iam::222222222222:role/deploy");

        let key = StackKey::for_configuration(&config, &orchestrator);
        assert_eq!(key.to_string(), "network/us-east-1/222222222222");

        let local = StackKey::for_local_stack("network", &orchestrator);
        assert_eq!(local.to_string(), "network/eu-west-1/111111111111");
        assert_ne!(key, local);
    }

    #[test]
    fn test_hyphenated_parts_do_not_collide() {
        let a = StackKey::new("app-eu", "west-1", "111111111111");
        let b = StackKey::new("app", "eu-west-1", "111111111111");
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }
}
