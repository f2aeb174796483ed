//! Permission statements and their derivation from secret dependencies.
//!
//! A [`ReadGrant`] derives the minimal statement a compute unit needs to
//! read one secret. [`attach`] is the raw path for any other statement,
//! including broad ones; those are classified with [`PolicyBreadth`] so the
//! loss of least privilege is visible in the synthesized plan.

use std::collections::BTreeSet;
use std::fmt;

use hookstack_common::constants::DEFAULT_READ_ACTIONS;
use hookstack_common::error::{HookstackError, Result};
use hookstack_common::types::LogicalId;
use serde::{Deserialize, Serialize};

use crate::secret::SecretReference;

/// Action a statement must allow for a secret to count as readable.
pub const READ_VALUE_ACTION: &str = "secretsmanager:GetSecretValue";

/// Whether a statement allows or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Effect {
    /// Grants the listed actions.
    #[serde(alias = "allow")]
    Allow,
    /// Refuses the listed actions, overriding any allow.
    #[serde(alias = "deny")]
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

/// An allow/deny rule over actions and resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionStatement {
    /// Allow or deny.
    pub effect: Effect,
    /// Action identifiers, possibly wildcarded.
    #[serde(rename = "Action")]
    pub actions: BTreeSet<String>,
    /// Resource identifiers, possibly wildcarded.
    #[serde(rename = "Resource")]
    pub resources: BTreeSet<String>,
}

impl PermissionStatement {
    /// Builds an allow statement.
    #[must_use]
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::new(Effect::Allow, actions, resources)
    }

    /// Builds a deny statement.
    #[must_use]
    pub fn deny<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::new(Effect::Deny, actions, resources)
    }

    fn new<A, R>(effect: Effect, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            effect,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns whether this statement names `action` on `resource`,
    /// regardless of effect.
    #[must_use]
    pub fn covers(&self, action: &str, resource: &str) -> bool {
        let action = action.to_ascii_lowercase();
        self.actions
            .iter()
            .any(|pattern| wildcard_match(&pattern.to_ascii_lowercase(), &action))
            && self
                .resources
                .iter()
                .any(|pattern| wildcard_match(pattern, resource))
    }

    /// Classifies how far this statement reaches.
    #[must_use]
    pub fn breadth(&self) -> PolicyBreadth {
        let any_action = self
            .actions
            .iter()
            .any(|a| a == "*" || a.ends_with(":*"));
        let any_resource = self.resources.iter().any(|r| r == "*");
        if any_action && any_resource {
            return PolicyBreadth::Unrestricted;
        }
        let wildcarded = self
            .actions
            .iter()
            .chain(&self.resources)
            .any(|s| s.contains(['*', '?']));
        if wildcarded {
            PolicyBreadth::Broadened
        } else {
            PolicyBreadth::Scoped
        }
    }

    fn check(&self) -> Result<()> {
        if self.actions.is_empty() || self.resources.is_empty() {
            return Err(HookstackError::Config {
                message: "permission statement needs at least one action and one resource"
                    .into(),
            });
        }
        if self
            .actions
            .iter()
            .chain(&self.resources)
            .any(|s| s.trim().is_empty())
        {
            return Err(HookstackError::Config {
                message: "permission statement contains a blank action or resource".into(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for PermissionStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
        write!(
            f,
            "{} [{}] on [{}]",
            self.effect,
            join(&self.actions),
            join(&self.resources)
        )
    }
}

/// How far a statement reaches beyond a single named resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyBreadth {
    /// Literal actions on literal resources.
    Scoped,
    /// Some action or resource is a wildcard pattern.
    Broadened,
    /// Any action of a service (or all services) on every resource.
    Unrestricted,
}

impl fmt::Display for PolicyBreadth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scoped => write!(f, "scoped"),
            Self::Broadened => write!(f, "broadened"),
            Self::Unrestricted => write!(f, "unrestricted"),
        }
    }
}

/// A recorded broadening beyond least privilege.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyFinding {
    /// Unit the statement is attached to.
    pub unit: LogicalId,
    /// The broad statement.
    pub statement: PermissionStatement,
    /// Its classification.
    pub breadth: PolicyBreadth,
}

/// Request to let a compute unit read one secret.
#[derive(Debug, Clone)]
pub struct ReadGrant {
    secret: SecretReference,
    actions: BTreeSet<String>,
    resource_pattern: Option<String>,
}

impl ReadGrant {
    /// Creates a grant with the default read actions on exactly this secret.
    #[must_use]
    pub fn new(secret: &SecretReference) -> Self {
        Self {
            secret: secret.clone(),
            actions: DEFAULT_READ_ACTIONS.iter().map(ToString::to_string).collect(),
            resource_pattern: None,
        }
    }

    /// Replaces the action set.
    #[must_use]
    pub fn actions<I>(mut self, actions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    /// Grants on a wildcard pattern instead of the bare identifier.
    #[must_use]
    pub fn resource_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.resource_pattern = Some(pattern.into());
        self
    }

    /// Returns the secret being granted.
    #[must_use]
    pub const fn secret(&self) -> &SecretReference {
        &self.secret
    }

    /// Derives the allow statement for this grant.
    ///
    /// # Errors
    ///
    /// Returns [`HookstackError::InvalidReference`] if a supplied resource
    /// pattern does not cover the secret, or [`HookstackError::Config`] if
    /// the action set is empty.
    pub fn to_statement(&self) -> Result<PermissionStatement> {
        let resource = match &self.resource_pattern {
            Some(pattern) => {
                if !wildcard_match(pattern, self.secret.identifier()) {
                    return Err(HookstackError::InvalidReference {
                        identifier: self.secret.identifier().to_string(),
                        reason: format!("grant pattern \"{pattern}\" does not cover it"),
                    });
                }
                pattern.clone()
            }
            None => self.secret.identifier().to_string(),
        };
        let statement = PermissionStatement::allow(self.actions.iter().cloned(), [resource]);
        statement.check()?;
        Ok(statement)
    }
}

/// Adds `statement` to a unit's policy set unless an identical one is
/// already present. Returns whether it was added.
///
/// # Errors
///
/// Returns an error if the statement has no actions or no resources.
pub fn attach(policy: &mut Vec<PermissionStatement>, statement: PermissionStatement) -> Result<bool> {
    statement.check()?;
    if policy.contains(&statement) {
        return Ok(false);
    }
    policy.push(statement);
    Ok(true)
}

/// Returns whether `policy` lets its unit read `secret`.
///
/// An explicit deny covering the secret wins over any allow.
#[must_use]
pub fn grants_read(policy: &[PermissionStatement], secret: &SecretReference) -> bool {
    let covering = |effect: Effect| {
        policy
            .iter()
            .filter(|s| s.effect == effect)
            .any(|s| s.covers(READ_VALUE_ACTION, secret.identifier()))
    };
    covering(Effect::Allow) && !covering(Effect::Deny)
}

/// IAM-style glob: `*` matches any run of characters, `?` exactly one.
#[must_use]
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();
    let (mut p, mut v) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == value[v]) {
            p += 1;
            v += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, v));
            p += 1;
        } else if let Some((star_p, star_v)) = star {
            p = star_p + 1;
            v = star_v + 1;
            star = Some((star_p, star_v + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
