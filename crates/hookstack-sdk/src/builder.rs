//! Fluent API for assembling a secret → webhook stack.

use std::collections::BTreeMap;
use std::path::PathBuf;

use hookstack_common::config::HookstackConfig;
use hookstack_common::constants::DEFAULT_MEMORY_MB;
use hookstack_common::error::{HookstackError, Result};
use hookstack_compose::{AuthMode, StackComposer};

use crate::constructs::{SecretConstruct, WebhookConstruct, WebhookProps};

/// Stack name of the reference webhook stack.
pub const REFERENCE_STACK: &str = "CacheOffEcsLambdaStack";

/// Secret the reference webhook stack reads its token from.
pub const REFERENCE_SECRET_ARN: &str =
    "arn:aws:secretsmanager:us-west-2:252703795646:secret:moment-webhook-token-brOeW3";

/// Builder for a stack with one secret and one webhook handler.
#[derive(Debug, Clone)]
pub struct WebhookStackBuilder {
    stack: String,
    config: HookstackConfig,
    secret_arn: Option<String>,
    function_name: String,
    artifact: PathBuf,
    memory_mb: u32,
    environment: BTreeMap<String, String>,
    auth_mode: AuthMode,
    broad_secrets_access: bool,
}

impl WebhookStackBuilder {
    /// Creates a builder for `stack` with no secret and a handler named
    /// `WebhookHandler` built from `app/lambda_webhook`.
    #[must_use]
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            config: HookstackConfig::default(),
            secret_arn: None,
            function_name: "WebhookHandler".to_string(),
            artifact: PathBuf::from("app/lambda_webhook"),
            memory_mb: DEFAULT_MEMORY_MB,
            environment: BTreeMap::new(),
            auth_mode: AuthMode::None,
            broad_secrets_access: false,
        }
    }

    /// Creates a builder preloaded with the reference webhook stack: the
    /// token secret, 256 MB, debug logging for the handler crate, a public
    /// URL, and the broad `secretsmanager:*` statement alongside the scoped
    /// read grant.
    #[must_use]
    pub fn reference() -> Self {
        Self::new(REFERENCE_STACK)
            .secret_arn(REFERENCE_SECRET_ARN)
            .memory_mb(256)
            .env("RUST_LOG", "webhook_handler=debug")
            .broad_secrets_access(true)
    }

    /// Uses `config` for memory bounds and the account.
    #[must_use]
    pub fn config(mut self, config: HookstackConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the complete identifier of the secret the handler reads.
    #[must_use]
    pub fn secret_arn(mut self, arn: impl Into<String>) -> Self {
        self.secret_arn = Some(arn.into());
        self
    }

    /// Sets the handler's logical name.
    #[must_use]
    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    /// Sets the path to the pre-built handler package.
    #[must_use]
    pub fn artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact = path.into();
        self
    }

    /// Sets the memory limit in MB.
    #[must_use]
    pub const fn memory_mb(mut self, memory_mb: u32) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.environment.insert(key.into(), value.into());
        self
    }

    /// Sets the URL's caller authentication mode.
    #[must_use]
    pub const fn auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Also attaches `secretsmanager:*` on `*` to the handler's role.
    #[must_use]
    pub const fn broad_secrets_access(mut self, enabled: bool) -> Self {
        self.broad_secrets_access = enabled;
        self
    }

    /// Declares the secret and the webhook on a new composer.
    ///
    /// The returned composer is still building, so callers can add more
    /// resources before synthesizing.
    ///
    /// # Errors
    ///
    /// Returns an error if no secret is set or any declaration fails.
    pub fn build(self) -> Result<StackComposer> {
        let arn = self.secret_arn.ok_or_else(|| HookstackError::Config {
            message: "secret ARN is required".to_string(),
        })?;

        let mut composer = StackComposer::with_config(self.stack, &self.config);
        let secret = SecretConstruct::from_complete_arn(&mut composer, "SecretConstruct", &arn)?;
        let props = WebhookProps {
            function_name: self.function_name,
            memory_mb: self.memory_mb,
            environment: self.environment,
            auth_mode: self.auth_mode,
            broad_secrets_access: self.broad_secrets_access,
            ..WebhookProps::new(secret.secret().clone(), self.artifact)
        };
        let _ = WebhookConstruct::new(&mut composer, "WebhookConstruct", props)?;
        Ok(composer)
    }
}
