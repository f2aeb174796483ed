//! Provisioning engine boundary.
//!
//! The composer never provisions anything itself. A synthesized graph is
//! handed to a [`ProvisioningEngine`] in one blocking call, and whatever the
//! engine returns is passed back to the caller unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hookstack_common::error::Result;
use hookstack_common::types::{DeploymentId, LogicalId};
use serde::{Deserialize, Serialize};

use crate::graph::DeploymentGraph;

/// External pipeline that turns a frozen graph into real resources.
///
/// Implementors own retries and failure semantics; the composer surfaces
/// their result verbatim.
pub trait ProvisioningEngine {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Provisions every resource in `graph`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to provision the graph.
    fn provision(&self, graph: &DeploymentGraph) -> Result<ProvisionReport>;
}

/// Values the provider generated for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOutputs {
    /// Provider identity (ARN or equivalent), when the resource has one.
    pub identity: Option<String>,
    /// Execution role identity, for compute units.
    pub role: Option<String>,
    /// Public address, for endpoints.
    pub url: Option<String>,
}

/// Result of a provisioning run, used only for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionReport {
    /// Identifier of this run.
    pub deployment_id: DeploymentId,
    /// Whether every resource was provisioned.
    pub success: bool,
    /// Stack that was provisioned.
    pub stack: String,
    /// When provisioning finished.
    pub completed_at: DateTime<Utc>,
    /// Generated values keyed by logical resource name.
    pub outputs: BTreeMap<LogicalId, ResourceOutputs>,
}

impl ProvisionReport {
    /// Starts an empty successful report for `stack`.
    #[must_use]
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            deployment_id: DeploymentId::generate(),
            success: true,
            stack: stack.into(),
            completed_at: Utc::now(),
            outputs: BTreeMap::new(),
        }
    }

    /// Returns the URL generated for `resource`, if any.
    #[must_use]
    pub fn url(&self, resource: &str) -> Option<&str> {
        self.outputs
            .get(&LogicalId::new(resource))
            .and_then(|o| o.url.as_deref())
    }

    /// Returns the identity generated for `resource`, if any.
    #[must_use]
    pub fn identity(&self, resource: &str) -> Option<&str> {
        self.outputs
            .get(&LogicalId::new(resource))
            .and_then(|o| o.identity.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_is_empty_and_successful() {
        let report = ProvisionReport::new("stack");
        assert!(report.success);
        assert!(report.outputs.is_empty());
        assert_eq!(report.url("WebhookHandlerUrl"), None);
    }

    #[test]
    fn lookups_read_outputs_by_logical_name() {
        let mut report = ProvisionReport::new("stack");
        let _ = report.outputs.insert(
            LogicalId::new("WebhookHandler"),
            ResourceOutputs {
                identity: Some("arn:aws:lambda:us-west-2:000000000000:function:WebhookHandler".into()),
                ..ResourceOutputs::default()
            },
        );
        let _ = report.outputs.insert(
            LogicalId::new("WebhookHandlerUrl"),
            ResourceOutputs {
                url: Some("https://example.lambda-url.us-west-2.on.aws/".into()),
                ..ResourceOutputs::default()
            },
        );

        assert!(report.identity("WebhookHandler").is_some());
        assert_eq!(report.url("WebhookHandler"), None);
        assert_eq!(
            report.url("WebhookHandlerUrl"),
            Some("https://example.lambda-url.us-west-2.on.aws/")
        );
    }
}
