//! Dry-run provisioning.
//!
//! Performs every local check a real deployment would, writes the
//! synthesized template to `<out_dir>/<stack>.template.json`, and reports
//! the identities and URLs the provider would generate for the configured
//! region and account. Nothing leaves the machine.

use std::fs;
use std::path::{Path, PathBuf};

use hookstack_common::config::HookstackConfig;
use hookstack_common::constants::TEMPLATE_SUFFIX;
use hookstack_common::error::{HookstackError, Result};
use hookstack_compose::engine::ResourceOutputs;
use hookstack_compose::{DeploymentGraph, ProvisionReport, ProvisioningEngine};
use sha2::{Digest, Sha256};

use crate::artifact;

const ENGINE_NAME: &str = "dry-run";

/// Engine that renders the graph to disk instead of calling the provider.
#[derive(Debug, Clone)]
pub struct DryRunEngine {
    out_dir: PathBuf,
    artifact_root: Option<PathBuf>,
    region: String,
    account: String,
}

impl DryRunEngine {
    /// Creates an engine writing to `out_dir` with the default region and
    /// account.
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        let config = HookstackConfig::default();
        Self {
            out_dir: out_dir.into(),
            artifact_root: None,
            region: config.region,
            account: config.account,
        }
    }

    /// Creates an engine from the output directory, region and account in
    /// `config`.
    #[must_use]
    pub fn from_config(config: &HookstackConfig) -> Self {
        Self {
            out_dir: config.out_dir.clone(),
            artifact_root: None,
            region: config.region.clone(),
            account: config.account.clone(),
        }
    }

    /// Resolves relative artifact paths against `root` instead of the
    /// working directory.
    #[must_use]
    pub fn artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_root = Some(root.into());
        self
    }

    /// Sets the region used in generated identities.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the account used in generated identities.
    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    /// Returns the path the template for `stack` is written to.
    #[must_use]
    pub fn template_path(&self, stack: &str) -> PathBuf {
        self.out_dir.join(format!("{stack}{TEMPLATE_SUFFIX}"))
    }

    fn resolve_artifact(&self, artifact: &Path) -> PathBuf {
        match &self.artifact_root {
            Some(root) if artifact.is_relative() => root.join(artifact),
            _ => artifact.to_path_buf(),
        }
    }

    fn function_arn(&self, name: &str) -> String {
        format!(
            "arn:aws:lambda:{}:{}:function:{name}",
            self.region, self.account
        )
    }

    fn role_arn(&self, stack: &str, role: &str) -> String {
        format!("arn:aws:iam::{}:role/{stack}-{role}", self.account)
    }

    fn function_url(&self, stack: &str, endpoint: &str) -> String {
        let digest = Sha256::digest(format!("{}/{stack}/{endpoint}", self.account));
        let hex = format!("{digest:x}");
        format!(
            "https://{}.lambda-url.{}.on.aws/",
            &hex[..32],
            self.region
        )
    }

    fn failure(message: String) -> HookstackError {
        HookstackError::Provisioning {
            engine: ENGINE_NAME.to_string(),
            message,
        }
    }
}

impl ProvisioningEngine for DryRunEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn provision(&self, graph: &DeploymentGraph) -> Result<ProvisionReport> {
        let stack = graph.stack();
        tracing::info!(stack, out_dir = %self.out_dir.display(), "dry-run provisioning started");

        for unit in graph.units() {
            let path = self.resolve_artifact(&unit.artifact);
            let digest = artifact::verify(&path)
                .map_err(|e| Self::failure(format!("artifact for unit \"{}\": {e}", unit.name)))?;
            tracing::info!(unit = %unit.name, %digest, "artifact verified");
        }

        fs::create_dir_all(&self.out_dir).map_err(|e| HookstackError::Io {
            path: self.out_dir.clone(),
            source: e,
        })?;
        let template_path = self.template_path(stack);
        fs::write(&template_path, graph.to_template_json()?).map_err(|e| HookstackError::Io {
            path: template_path.clone(),
            source: e,
        })?;
        tracing::info!(path = %template_path.display(), "template written");

        let mut report = ProvisionReport::new(stack);
        for node in graph.order() {
            tracing::debug!(resource = %node, "provisioned");
        }
        for unit in graph.units() {
            let _ = report.outputs.insert(
                unit.name.clone(),
                ResourceOutputs {
                    identity: Some(self.function_arn(unit.name.as_str())),
                    role: Some(self.role_arn(stack, unit.role.as_str())),
                    url: None,
                },
            );
        }
        for endpoint in graph.endpoints() {
            let _ = report.outputs.insert(
                endpoint.id.clone(),
                ResourceOutputs {
                    identity: Some(self.function_arn(endpoint.unit.as_str())),
                    role: None,
                    url: Some(self.function_url(stack, endpoint.id.as_str())),
                },
            );
        }

        tracing::info!(
            stack,
            deployment_id = %report.deployment_id,
            resources = graph.order().len(),
            "dry-run provisioning complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use hookstack_compose::{AuthMode, ComputeUnitSpec, StackComposer};

    use super::*;

    fn webhook_graph(artifact: &Path) -> std::sync::Arc<DeploymentGraph> {
        let mut composer = StackComposer::new("webhook");
        let secret = composer.resolve_secret("arn:secret:abc").expect("resolve");
        let unit = composer
            .declare(ComputeUnitSpec::new("WebhookHandler", artifact).depends_on(&secret))
            .expect("declare");
        composer.grant(&unit, &secret).expect("grant");
        let _ = composer.bind(&unit, AuthMode::None).expect("bind");
        composer.synthesize().expect("synthesize")
    }

    #[test]
    fn template_path_uses_stack_name() {
        let engine = DryRunEngine::new("out");
        assert_eq!(
            engine.template_path("webhook"),
            PathBuf::from("out/webhook.template.json")
        );
    }

    #[test]
    fn relative_artifacts_resolve_against_root() {
        let engine = DryRunEngine::new("out").artifact_root("/srv/app");
        assert_eq!(
            engine.resolve_artifact(Path::new("dist")),
            PathBuf::from("/srv/app/dist")
        );
        assert_eq!(
            engine.resolve_artifact(Path::new("/opt/dist")),
            PathBuf::from("/opt/dist")
        );
    }

    #[test]
    fn function_url_is_deterministic() {
        let engine = DryRunEngine::new("out").region("eu-west-1");
        let a = engine.function_url("webhook", "WebhookHandlerUrl");
        assert_eq!(a, engine.function_url("webhook", "WebhookHandlerUrl"));
        assert!(a.starts_with("https://"));
        assert!(a.ends_with(".lambda-url.eu-west-1.on.aws/"));
        assert_ne!(a, engine.function_url("other", "WebhookHandlerUrl"));
    }

    #[test]
    fn provision_reports_identities_and_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let artifact = dir.path().join("bootstrap");
        fs::write(&artifact, b"binary").expect("write");
        let graph = webhook_graph(&artifact);

        let engine = DryRunEngine::new(dir.path().join("out")).account("252703795646");
        let report = engine.provision(&graph).expect("provision");

        assert!(report.success);
        assert_eq!(
            report.identity("WebhookHandler"),
            Some("arn:aws:lambda:us-west-2:252703795646:function:WebhookHandler")
        );
        assert!(report.url("WebhookHandlerUrl").is_some());
        assert!(engine.template_path("webhook").exists());
    }

    #[test]
    fn missing_artifact_fails_before_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let graph = webhook_graph(&dir.path().join("missing"));

        let engine = DryRunEngine::new(dir.path().join("out"));
        let err = engine.provision(&graph).unwrap_err();
        assert!(matches!(
            err,
            HookstackError::Provisioning { engine: ref name, .. } if name == "dry-run"
        ));
        assert!(!engine.template_path("webhook").exists());
    }
}
