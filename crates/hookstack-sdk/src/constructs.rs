//! Reusable constructs that declare resources on a composer.
//!
//! A construct groups the declarations for one concern behind a small props
//! struct. Constructs never own the composer; they declare into it and keep
//! handles to what they declared.

use std::collections::BTreeMap;
use std::path::PathBuf;

use hookstack_common::constants::DEFAULT_MEMORY_MB;
use hookstack_common::error::Result;
use hookstack_compose::{
    AuthMode, ComputeUnitHandle, ComputeUnitSpec, InvocationEndpoint, PermissionStatement,
    SecretReference, StackComposer,
};

/// An externally managed secret imported by its complete identifier.
#[derive(Debug, Clone)]
pub struct SecretConstruct {
    id: String,
    secret: SecretReference,
}

impl SecretConstruct {
    /// Imports the secret at `arn` into `composer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is malformed or the composer is
    /// already synthesized.
    pub fn from_complete_arn(
        composer: &mut StackComposer,
        id: impl Into<String>,
        arn: &str,
    ) -> Result<Self> {
        let id = id.into();
        let secret = composer.resolve_secret(arn)?;
        tracing::debug!(construct = %id, secret = %secret, "secret imported");
        Ok(Self { id, secret })
    }

    /// Returns the construct id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the imported secret.
    #[must_use]
    pub const fn secret(&self) -> &SecretReference {
        &self.secret
    }
}

/// Properties of a [`WebhookConstruct`].
#[derive(Debug, Clone)]
pub struct WebhookProps {
    /// Secret the handler reads at runtime.
    pub secret: SecretReference,
    /// Logical name of the handler function.
    pub function_name: String,
    /// Path to the pre-built handler package.
    pub manifest_path: PathBuf,
    /// Memory limit in MB.
    pub memory_mb: u32,
    /// Environment variables injected into the handler.
    pub environment: BTreeMap<String, String>,
    /// Caller authentication mode of the URL.
    pub auth_mode: AuthMode,
    /// Also attach `secretsmanager:*` on `*` to the handler's role.
    pub broad_secrets_access: bool,
}

impl WebhookProps {
    /// Creates props for a handler named `WebhookHandler` with the default
    /// memory size, a public URL, and only the scoped read grant.
    #[must_use]
    pub fn new(secret: SecretReference, manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            secret,
            function_name: "WebhookHandler".to_string(),
            manifest_path: manifest_path.into(),
            memory_mb: DEFAULT_MEMORY_MB,
            environment: BTreeMap::new(),
            auth_mode: AuthMode::None,
            broad_secrets_access: false,
        }
    }
}

/// A webhook handler function with a URL and read access to one secret.
#[derive(Debug, Clone)]
pub struct WebhookConstruct {
    id: String,
    function: ComputeUnitHandle,
    url: InvocationEndpoint,
}

impl WebhookConstruct {
    /// Declares the handler, binds its URL, and grants it read access to
    /// `props.secret`.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error from the composer.
    pub fn new(
        composer: &mut StackComposer,
        id: impl Into<String>,
        props: WebhookProps,
    ) -> Result<Self> {
        let id = id.into();
        let spec = props.environment.iter().fold(
            ComputeUnitSpec::new(&props.function_name, props.manifest_path)
                .memory_mb(props.memory_mb),
            |spec, (key, value)| spec.env(key, value),
        );
        let function = composer.declare(spec.depends_on(&props.secret))?;
        let url = composer.bind(&function, props.auth_mode)?;

        if props.broad_secrets_access {
            composer.attach_policy(
                &function,
                PermissionStatement::allow(["secretsmanager:*"], ["*"]),
            )?;
        }
        composer.grant(&function, &props.secret)?;

        tracing::debug!(construct = %id, function = %function.name(), "webhook declared");
        Ok(Self { id, function, url })
    }

    /// Returns the construct id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the handle of the handler function.
    #[must_use]
    pub const fn function(&self) -> &ComputeUnitHandle {
        &self.function
    }

    /// Returns the handler's URL.
    #[must_use]
    pub const fn url(&self) -> &InvocationEndpoint {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use hookstack_common::error::HookstackError;
    use hookstack_compose::PolicyBreadth;

    use super::*;

    const ARN: &str = "arn:aws:secretsmanager:us-west-2:000000000000:secret:token-AbCdEf";

    #[test]
    fn secret_construct_resolves_into_composer() {
        let mut composer = StackComposer::new("stack");
        let construct = SecretConstruct::from_complete_arn(&mut composer, "SecretConstruct", ARN)
            .expect("import");
        assert_eq!(construct.id(), "SecretConstruct");
        assert_eq!(construct.secret().name(), "token-AbCdEf");
    }

    #[test]
    fn secret_construct_rejects_malformed_arn() {
        let mut composer = StackComposer::new("stack");
        let err = SecretConstruct::from_complete_arn(&mut composer, "SecretConstruct", "token")
            .unwrap_err();
        assert!(matches!(err, HookstackError::InvalidReference { .. }));
    }

    #[test]
    fn scoped_webhook_has_no_findings() {
        let mut composer = StackComposer::new("stack");
        let secret = SecretConstruct::from_complete_arn(&mut composer, "SecretConstruct", ARN)
            .expect("import");
        let webhook = WebhookConstruct::new(
            &mut composer,
            "WebhookConstruct",
            WebhookProps::new(secret.secret().clone(), "dist"),
        )
        .expect("construct");
        assert!(webhook.url().is_public());
        assert_eq!(webhook.function().name().as_str(), "WebhookHandler");

        let graph = composer.synthesize().expect("synthesize");
        assert_eq!(graph.statements().count(), 1);
        assert!(graph.findings().is_empty());
    }

    #[test]
    fn broad_access_is_recorded_as_finding() {
        let mut composer = StackComposer::new("stack");
        let secret = SecretConstruct::from_complete_arn(&mut composer, "SecretConstruct", ARN)
            .expect("import");
        let props = WebhookProps {
            broad_secrets_access: true,
            ..WebhookProps::new(secret.secret().clone(), "dist")
        };
        let _ = WebhookConstruct::new(&mut composer, "WebhookConstruct", props).expect("construct");

        let graph = composer.synthesize().expect("synthesize");
        assert_eq!(graph.findings().len(), 1);
        assert_eq!(graph.findings()[0].breadth, PolicyBreadth::Unrestricted);
    }
}
