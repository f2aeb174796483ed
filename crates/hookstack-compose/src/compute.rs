//! Compute unit declaration.
//!
//! A compute unit is a function packaged from a pre-built artifact. This
//! module only validates its declaration; building the artifact and
//! checking it exists on disk happen outside the composer.

use std::collections::BTreeMap;
use std::path::PathBuf;

use hookstack_common::config::MemoryBounds;
use hookstack_common::constants::{DEFAULT_MEMORY_MB, RESERVED_ENV_KEYS, RESERVED_ENV_PREFIXES};
use hookstack_common::error::{HookstackError, Result};
use hookstack_common::types::LogicalId;
use serde::Serialize;

use crate::grant::PermissionStatement;
use crate::secret::SecretReference;

/// Suffix appended to a unit name to form its role id.
pub(crate) const ROLE_SUFFIX: &str = "ServiceRole";

/// Declaration of a compute unit before it joins a composition.
#[derive(Debug, Clone)]
pub struct ComputeUnitSpec {
    name: LogicalId,
    artifact: PathBuf,
    memory_mb: u32,
    environment: BTreeMap<String, String>,
    secrets: Vec<SecretReference>,
}

impl ComputeUnitSpec {
    /// Creates a spec for the artifact at `artifact` with default memory.
    #[must_use]
    pub fn new(name: impl Into<String>, artifact: impl Into<PathBuf>) -> Self {
        Self {
            name: LogicalId::new(name),
            artifact: artifact.into(),
            memory_mb: DEFAULT_MEMORY_MB,
            environment: BTreeMap::new(),
            secrets: Vec::new(),
        }
    }

    /// Sets the memory limit in MB.
    #[must_use]
    pub const fn memory_mb(mut self, memory_mb: u32) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    /// Sets an environment variable, replacing any earlier value for `key`.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.environment.insert(key.into(), value.into());
        self
    }

    /// Declares that the unit reads `secret` at runtime.
    #[must_use]
    pub fn depends_on(mut self, secret: &SecretReference) -> Self {
        if !self.secrets.contains(secret) {
            self.secrets.push(secret.clone());
        }
        self
    }

    /// Returns the logical name.
    #[must_use]
    pub const fn name(&self) -> &LogicalId {
        &self.name
    }

    /// Returns the secrets this unit depends on, in declaration order.
    #[must_use]
    pub fn secrets(&self) -> &[SecretReference] {
        &self.secrets
    }
}

/// A declared compute unit with its attached policy.
#[derive(Debug, Clone, Serialize)]
pub struct ComputeUnit {
    /// Logical name, unique within the stack.
    pub name: LogicalId,
    /// Path to the pre-built deployable package.
    pub artifact: PathBuf,
    /// Memory limit in MB.
    pub memory_mb: u32,
    /// Environment injected unmodified at runtime.
    pub environment: BTreeMap<String, String>,
    /// Secrets the unit reads.
    pub secrets: Vec<SecretReference>,
    /// Execution role the provider generates for the unit.
    pub role: LogicalId,
    /// Statements attached to the execution role.
    pub policy: Vec<PermissionStatement>,
}

/// Handle to a declared unit, used to attach grants and endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputeUnitHandle {
    pub(crate) index: usize,
    pub(crate) name: LogicalId,
}

impl ComputeUnitHandle {
    /// Returns the logical name of the unit.
    #[must_use]
    pub const fn name(&self) -> &LogicalId {
        &self.name
    }
}

/// Validates `spec` and turns it into a unit with an empty policy.
///
/// # Errors
///
/// Returns [`HookstackError::InvalidArtifact`] for an empty artifact path,
/// [`HookstackError::InvalidResourceLimit`] for memory outside `bounds`, and
/// [`HookstackError::Config`] for a blank name or a bad environment key.
pub fn declare(spec: ComputeUnitSpec, bounds: &MemoryBounds) -> Result<ComputeUnit> {
    if spec.name.as_str().trim().is_empty() {
        return Err(HookstackError::Config {
            message: "compute unit name is empty".into(),
        });
    }
    if spec.artifact.as_os_str().is_empty() {
        return Err(HookstackError::InvalidArtifact {
            unit: spec.name.to_string(),
            message: "artifact path is empty".into(),
        });
    }
    if !bounds.contains(spec.memory_mb) {
        return Err(HookstackError::InvalidResourceLimit {
            unit: spec.name.to_string(),
            memory_mb: spec.memory_mb,
            min: bounds.min_mb,
            max: bounds.max_mb,
        });
    }
    for key in spec.environment.keys() {
        check_env_key(&spec.name, key)?;
    }

    tracing::info!(
        unit = %spec.name,
        artifact = %spec.artifact.display(),
        memory_mb = spec.memory_mb,
        secrets = spec.secrets.len(),
        "compute unit declared"
    );

    Ok(ComputeUnit {
        role: spec.name.child(ROLE_SUFFIX),
        name: spec.name,
        artifact: spec.artifact,
        memory_mb: spec.memory_mb,
        environment: spec.environment,
        secrets: spec.secrets,
        policy: Vec::new(),
    })
}

fn check_env_key(unit: &LogicalId, key: &str) -> Result<()> {
    let mut chars = key.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !well_formed {
        return Err(HookstackError::Config {
            message: format!("compute unit \"{unit}\": invalid environment key \"{key}\""),
        });
    }
    let reserved = RESERVED_ENV_KEYS.contains(&key)
        || RESERVED_ENV_PREFIXES.iter().any(|p| key.starts_with(p));
    if reserved {
        return Err(HookstackError::Config {
            message: format!("compute unit \"{unit}\": environment key \"{key}\" is reserved"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook() -> ComputeUnitSpec {
        ComputeUnitSpec::new("WebhookHandler", "app/lambda_webhook")
    }

    #[test]
    fn declare_copies_spec_fields() {
        let secret = crate::secret::resolve("arn:secret:abc").expect("secret");
        let unit = declare(
            webhook()
                .memory_mb(256)
                .env("RUST_LOG", "webhook_handler=debug")
                .depends_on(&secret),
            &MemoryBounds::default(),
        )
        .expect("should declare");

        assert_eq!(unit.name.as_str(), "WebhookHandler");
        assert_eq!(unit.role.as_str(), "WebhookHandlerServiceRole");
        assert_eq!(unit.memory_mb, 256);
        assert_eq!(
            unit.environment.get("RUST_LOG").map(String::as_str),
            Some("webhook_handler=debug")
        );
        assert_eq!(unit.secrets, vec![secret]);
        assert!(unit.policy.is_empty());
    }

    #[test]
    fn default_memory_is_accepted() {
        let unit = declare(webhook(), &MemoryBounds::default()).expect("should declare");
        assert_eq!(unit.memory_mb, DEFAULT_MEMORY_MB);
    }

    #[test]
    fn memory_bounds_are_inclusive() {
        let bounds = MemoryBounds::default();
        assert!(declare(webhook().memory_mb(128), &bounds).is_ok());
        assert!(declare(webhook().memory_mb(10_240), &bounds).is_ok());
        for bad in [0, 127, 10_241, 100_000] {
            let err = declare(webhook().memory_mb(bad), &bounds).unwrap_err();
            assert!(
                matches!(err, HookstackError::InvalidResourceLimit { memory_mb, .. } if memory_mb == bad),
                "{bad} gave {err}"
            );
        }
    }

    #[test]
    fn empty_artifact_is_rejected() {
        let err = declare(
            ComputeUnitSpec::new("WebhookHandler", ""),
            &MemoryBounds::default(),
        )
        .unwrap_err();
        assert!(matches!(err, HookstackError::InvalidArtifact { .. }));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = declare(ComputeUnitSpec::new(" ", "dist"), &MemoryBounds::default()).unwrap_err();
        assert!(matches!(err, HookstackError::Config { .. }));
    }

    #[test]
    fn later_env_value_wins() {
        let unit = declare(
            webhook().env("RUST_LOG", "info").env("RUST_LOG", "debug"),
            &MemoryBounds::default(),
        )
        .expect("should declare");
        assert_eq!(unit.environment.len(), 1);
        assert_eq!(unit.environment["RUST_LOG"], "debug");
    }

    #[test]
    fn malformed_env_keys_are_rejected() {
        for bad in ["", "1ABC", "WITH-DASH", "_LEADING"] {
            let err = declare(webhook().env(bad, "x"), &MemoryBounds::default()).unwrap_err();
            assert!(err.to_string().contains("invalid environment key"), "got: {err}");
        }
    }

    #[test]
    fn reserved_env_keys_are_rejected() {
        for bad in ["AWS_REGION", "AWS_LAMBDA_FUNCTION_NAME", "LAMBDA_TASK_ROOT"] {
            let err = declare(webhook().env(bad, "x"), &MemoryBounds::default()).unwrap_err();
            assert!(err.to_string().contains("reserved"), "got: {err}");
        }
    }

    #[test]
    fn repeated_dependency_is_recorded_once() {
        let secret = crate::secret::resolve("arn:secret:abc").expect("secret");
        let spec = webhook().depends_on(&secret).depends_on(&secret);
        assert_eq!(spec.secrets().len(), 1);
    }
}
