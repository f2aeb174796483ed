//! Resolution of externally managed secrets.
//!
//! A secret is only ever referenced by its stable identifier. Nothing here
//! reaches the secret store: whether the secret exists is checked by the
//! provisioning engine, never at composition time.

use std::fmt;
use std::sync::Arc;

use hookstack_common::constants::{ARN_PREFIX, SECRETS_SERVICE};
use hookstack_common::error::{HookstackError, Result};
use serde::{Serialize, Serializer};

/// Reference to a secret owned by the external secret store.
///
/// Clones share the same identifier allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretReference {
    identifier: Arc<str>,
}

impl SecretReference {
    /// Returns the stable identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the final identifier segment, the secret's own name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.identifier
            .rsplit(':')
            .next()
            .unwrap_or(&self.identifier)
    }

    /// Splits a complete secrets-manager ARN into its parts.
    ///
    /// Returns `None` for identifiers that are well-formed but not in the
    /// provider's complete `arn:<partition>:secretsmanager:<region>:<account>:secret:<name>` shape.
    #[must_use]
    pub fn arn(&self) -> Option<SecretArn<'_>> {
        let mut parts = self.identifier.splitn(7, ':');
        let (_, partition, service, region, account, kind, name) = (
            parts.next()?,
            parts.next()?,
            parts.next()?,
            parts.next()?,
            parts.next()?,
            parts.next()?,
            parts.next()?,
        );
        if service != SECRETS_SERVICE || kind != "secret" {
            return None;
        }
        Some(SecretArn {
            partition,
            region,
            account,
            name,
        })
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)
    }
}

impl Serialize for SecretReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.identifier)
    }
}

/// Parts of a complete secrets-manager ARN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretArn<'a> {
    /// Provider partition, e.g. `aws`.
    pub partition: &'a str,
    /// Region the secret lives in.
    pub region: &'a str,
    /// Owning account.
    pub account: &'a str,
    /// Secret name including the provider's random suffix.
    pub name: &'a str,
}

/// Resolves a stable identifier into a [`SecretReference`].
///
/// # Errors
///
/// Returns [`HookstackError::InvalidReference`] if the identifier is not a
/// well-formed ARN-style identifier.
pub fn resolve(identifier: &str) -> Result<SecretReference> {
    check_identifier(identifier)?;
    tracing::debug!(secret = identifier, "secret reference resolved");
    Ok(SecretReference {
        identifier: Arc::from(identifier),
    })
}

fn check_identifier(identifier: &str) -> Result<()> {
    let invalid = |reason: &str| HookstackError::InvalidReference {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };

    if identifier.is_empty() {
        return Err(invalid("identifier is empty"));
    }
    if !identifier.starts_with(ARN_PREFIX) {
        return Err(invalid("identifier must start with \"arn:\""));
    }
    if identifier
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(invalid("identifier contains whitespace or control characters"));
    }
    if identifier.contains(['*', '?']) {
        return Err(invalid("identifier must not contain wildcards"));
    }

    let segments: Vec<&str> = identifier.split(':').collect();
    if segments.len() < 3 {
        return Err(invalid("identifier needs at least three ':'-separated segments"));
    }
    if segments[1].is_empty() {
        return Err(invalid("partition segment is empty"));
    }
    if segments.last().is_none_or(|s| s.is_empty()) {
        return Err(invalid("resource segment is empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE_ARN: &str =
        "arn:aws:secretsmanager:us-west-2:252703795646:secret:moment-webhook-token-brOeW3";

    #[test]
    fn resolve_short_identifier() {
        let secret = resolve("arn:secret:abc").expect("should resolve");
        assert_eq!(secret.identifier(), "arn:secret:abc");
        assert_eq!(secret.name(), "abc");
        assert!(secret.arn().is_none());
    }

    #[test]
    fn resolve_complete_arn_exposes_parts() {
        let secret = resolve(COMPLETE_ARN).expect("should resolve");
        let arn = secret.arn().expect("complete arn");
        assert_eq!(arn.partition, "aws");
        assert_eq!(arn.region, "us-west-2");
        assert_eq!(arn.account, "252703795646");
        assert_eq!(arn.name, "moment-webhook-token-brOeW3");
        assert_eq!(secret.name(), "moment-webhook-token-brOeW3");
    }

    #[test]
    fn non_secret_service_has_no_arn_parts() {
        let secret = resolve("arn:aws:ssm:us-west-2:1:parameter/keys/momento").expect("resolve");
        assert!(secret.arn().is_none());
    }

    #[test]
    fn clones_share_the_identifier() {
        let secret = resolve("arn:secret:abc").expect("should resolve");
        let copy = secret.clone();
        assert!(Arc::ptr_eq(&secret.identifier, &copy.identifier));
    }

    #[test]
    fn serializes_as_plain_string() {
        let secret = resolve("arn:secret:abc").expect("should resolve");
        let json = serde_json::to_string(&secret).expect("serialize");
        assert_eq!(json, "\"arn:secret:abc\"");
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for bad in [
            "",
            "secret:abc",
            "arn:abc",
            "arn::secret:abc",
            "arn:secret:",
            "arn:secret:a b",
            "arn:secret:*",
            "arn:secret:ab?",
        ] {
            let err = resolve(bad).unwrap_err();
            assert!(
                matches!(err, HookstackError::InvalidReference { .. }),
                "{bad:?} gave {err}"
            );
        }
    }
}
