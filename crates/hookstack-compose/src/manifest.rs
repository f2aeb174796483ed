//! YAML stack manifests.
//!
//! A manifest lists secrets and functions the way a stack definition would
//! declare them, and [`Manifest::compose`] replays it into a
//! [`StackComposer`] in file order. Functions that omit `grants` get the
//! default read grant for each of their secrets; an explicit `grants` list,
//! even an empty one, is used as written.
//!
//! ```yaml
//! stack: CacheOffEcsLambdaStack
//! secrets:
//!   - id: MomentoSecret
//!     arn: arn:aws:secretsmanager:us-west-2:252703795646:secret:moment-webhook-token-brOeW3
//! functions:
//!   - name: WebhookHandler
//!     artifact: app/lambda_webhook
//!     memory_mb: 256
//!     environment:
//!       RUST_LOG: webhook_handler=debug
//!     secrets: [MomentoSecret]
//!     url:
//!       auth: none
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use hookstack_common::config::HookstackConfig;
use hookstack_common::error::{HookstackError, Result};
use serde::Deserialize;

use crate::composer::StackComposer;
use crate::compute::ComputeUnitSpec;
use crate::grant::{Effect, PermissionStatement, ReadGrant};
use crate::invoke::AuthMode;
use crate::secret::SecretReference;

/// A parsed stack manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Stack name.
    pub stack: String,
    /// Secrets referenced by the stack.
    #[serde(default)]
    pub secrets: Vec<SecretDecl>,
    /// Functions in declaration order.
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
}

/// A secret entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretDecl {
    /// Name other entries use to refer to the secret.
    pub id: String,
    /// Stable identifier in the secret store.
    pub arn: String,
}

/// A function entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionDecl {
    /// Logical name.
    pub name: String,
    /// Path to the pre-built artifact.
    pub artifact: PathBuf,
    /// Memory limit in MB.
    pub memory_mb: Option<u32>,
    /// Environment variables.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Ids of secrets the function reads.
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Explicit read grants; derived from `secrets` when absent.
    pub grants: Option<Vec<GrantDecl>>,
    /// Extra statements attached as written.
    #[serde(default)]
    pub policies: Vec<PolicyDecl>,
    /// Invocation endpoint, if any.
    pub url: Option<UrlDecl>,
}

/// A read grant entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantDecl {
    /// Secret id.
    pub secret: String,
    /// Actions, defaulting to the minimal read set.
    pub actions: Option<Vec<String>>,
    /// Wildcard resource pattern covering the secret.
    pub resource: Option<String>,
}

/// A raw policy statement entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDecl {
    /// Allow or deny.
    pub effect: Effect,
    /// Action patterns.
    pub actions: Vec<String>,
    /// Resource patterns.
    pub resources: Vec<String>,
}

/// An invocation endpoint entry.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlDecl {
    /// Caller authentication mode.
    pub auth: AuthMode,
}

/// Parses a manifest from YAML text.
///
/// # Errors
///
/// Returns an error if the text is not a valid manifest.
pub fn parse(content: &str) -> Result<Manifest> {
    Ok(serde_yaml::from_str(content)?)
}

/// Reads and parses a manifest file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(path: &Path) -> Result<Manifest> {
    tracing::info!(path = %path.display(), "loading stack manifest");
    let content = std::fs::read_to_string(path).map_err(|e| HookstackError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse(&content)
}

impl Manifest {
    /// Replays the manifest into a new composer, still in `Building`.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error in file order.
    pub fn compose(&self, config: &HookstackConfig) -> Result<StackComposer> {
        let mut composer = StackComposer::with_config(&self.stack, config);

        let mut secrets: HashMap<&str, SecretReference> = HashMap::new();
        for decl in &self.secrets {
            if secrets.contains_key(decl.id.as_str()) {
                return Err(HookstackError::DuplicateName {
                    kind: "secret",
                    name: decl.id.clone(),
                });
            }
            let _ = secrets.insert(&decl.id, composer.resolve_secret(&decl.arn)?);
        }

        for function in &self.functions {
            let mut spec = ComputeUnitSpec::new(&function.name, function.artifact.clone());
            if let Some(memory_mb) = function.memory_mb {
                spec = spec.memory_mb(memory_mb);
            }
            for (key, value) in &function.environment {
                spec = spec.env(key, value);
            }
            for id in &function.secrets {
                spec = spec.depends_on(lookup_secret(&secrets, id)?);
            }
            let unit = composer.declare(spec)?;

            match &function.grants {
                None => {
                    let mut seen = HashSet::new();
                    for id in function.secrets.iter().filter(|id| seen.insert(id.as_str())) {
                        composer.grant(&unit, lookup_secret(&secrets, id)?)?;
                    }
                }
                Some(grants) => {
                    for decl in grants {
                        let mut grant = ReadGrant::new(lookup_secret(&secrets, &decl.secret)?);
                        if let Some(actions) = &decl.actions {
                            grant = grant.actions(actions.iter().cloned());
                        }
                        if let Some(pattern) = &decl.resource {
                            grant = grant.resource_pattern(pattern);
                        }
                        composer.grant_with(&unit, &grant)?;
                    }
                }
            }

            for policy in &function.policies {
                let statement = match policy.effect {
                    Effect::Allow => PermissionStatement::allow(&policy.actions, &policy.resources),
                    Effect::Deny => PermissionStatement::deny(&policy.actions, &policy.resources),
                };
                composer.attach_policy(&unit, statement)?;
            }

            if let Some(url) = function.url {
                let _ = composer.bind(&unit, url.auth)?;
            }
        }
        Ok(composer)
    }
}

fn lookup_secret<'a>(
    secrets: &'a HashMap<&str, SecretReference>,
    id: &str,
) -> Result<&'a SecretReference> {
    secrets.get(id).ok_or_else(|| HookstackError::NotFound {
        kind: "secret",
        id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use hookstack_common::types::ComposerPhase;

    use super::*;
    use crate::grant::PolicyBreadth;

    const WEBHOOK: &str = r#"
stack: CacheOffEcsLambdaStack
secrets:
  - id: MomentoSecret
    arn: arn:aws:secretsmanager:us-west-2:252703795646:secret:moment-webhook-token-brOeW3
functions:
  - name: WebhookHandler
    artifact: app/lambda_webhook
    memory_mb: 256
    environment:
      RUST_LOG: webhook_handler=debug
    secrets: [MomentoSecret]
    policies:
      - effect: allow
        actions: ["secretsmanager:*"]
        resources: ["*"]
    url:
      auth: none
"#;

    #[test]
    fn parse_webhook_manifest() {
        let manifest = parse(WEBHOOK).expect("should parse");
        assert_eq!(manifest.stack, "CacheOffEcsLambdaStack");
        assert_eq!(manifest.secrets.len(), 1);
        let function = &manifest.functions[0];
        assert_eq!(function.memory_mb, Some(256));
        assert!(function.grants.is_none());
        assert_eq!(function.policies[0].effect, Effect::Allow);
        assert_eq!(function.url.map(|u| u.auth), Some(AuthMode::None));
    }

    #[test]
    fn compose_derives_default_grant() {
        let manifest = parse(WEBHOOK).expect("should parse");
        let mut composer = manifest
            .compose(&HookstackConfig::default())
            .expect("should compose");
        assert_eq!(composer.phase(), ComposerPhase::Building);

        let graph = composer.synthesize().expect("should synthesize");
        let unit = graph.unit("WebhookHandler").expect("unit");
        assert_eq!(unit.policy.len(), 2);
        assert_eq!(graph.findings().len(), 1);
        assert_eq!(graph.findings()[0].breadth, PolicyBreadth::Unrestricted);
        assert!(graph.endpoint_for("WebhookHandler").is_some());
    }

    #[test]
    fn explicit_empty_grants_leave_wiring_incomplete() {
        let manifest = parse(
            r"
stack: s
secrets:
  - id: token
    arn: arn:secret:abc
functions:
  - name: f
    artifact: dist
    secrets: [token]
    grants: []
",
        )
        .expect("should parse");
        let mut composer = manifest
            .compose(&HookstackConfig::default())
            .expect("should compose");
        let err = composer.synthesize().unwrap_err();
        assert!(matches!(err, HookstackError::IncompleteWiring { .. }));
    }

    #[test]
    fn explicit_grant_with_pattern() {
        let manifest = parse(
            r#"
stack: s
secrets:
  - id: token
    arn: arn:secret:abc
functions:
  - name: f
    artifact: dist
    secrets: [token]
    grants:
      - secret: token
        actions: ["secretsmanager:GetSecretValue"]
        resource: "arn:secret:*"
"#,
        )
        .expect("should parse");
        let mut composer = manifest
            .compose(&HookstackConfig::default())
            .expect("should compose");
        let graph = composer.synthesize().expect("should synthesize");
        assert_eq!(graph.findings()[0].breadth, PolicyBreadth::Broadened);
    }

    #[test]
    fn unknown_secret_id_is_reported() {
        let manifest = parse(
            r"
stack: s
functions:
  - name: f
    artifact: dist
    secrets: [missing]
",
        )
        .expect("should parse");
        let err = manifest.compose(&HookstackConfig::default()).unwrap_err();
        assert!(err.to_string().contains("missing"), "got: {err}");
    }

    #[test]
    fn duplicate_secret_ids_are_rejected() {
        let manifest = parse(
            r"
stack: s
secrets:
  - id: token
    arn: arn:secret:abc
  - id: token
    arn: arn:secret:def
",
        )
        .expect("should parse");
        let err = manifest.compose(&HookstackConfig::default()).unwrap_err();
        assert!(matches!(err, HookstackError::DuplicateName { kind: "secret", .. }));
    }

    #[test]
    fn stack_name_with_path_traversal_fails_synthesis() {
        let manifest = parse("stack: ../escaped\n").expect("should parse");
        let mut composer = manifest
            .compose(&HookstackConfig::default())
            .expect("should compose");
        let err = composer.synthesize().unwrap_err();
        assert!(matches!(err, HookstackError::Config { .. }), "got: {err}");
        assert!(err.to_string().contains("../escaped"), "got: {err}");
    }

    #[test]
    fn colliding_function_names_are_rejected() {
        let manifest = parse(
            r"
stack: s
functions:
  - name: A
    artifact: dist
  - name: AUrl
    artifact: dist
",
        )
        .expect("should parse");
        let err = manifest.compose(&HookstackConfig::default()).unwrap_err();
        assert!(matches!(err, HookstackError::DuplicateName { kind: "logical id", .. }));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse("stack: s\nregion: us-east-1\n").unwrap_err();
        assert!(matches!(err, HookstackError::Manifest { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hookstack.yaml");
        std::fs::write(&path, WEBHOOK).expect("write");
        let manifest = load(&path).expect("should load");
        assert_eq!(manifest.functions.len(), 1);
    }
}
