//! Invocation endpoints bound to compute units.
//!
//! An endpoint with [`AuthMode::None`] can be invoked by anyone who learns
//! its URL. The function then has to authenticate callers itself, e.g. by
//! verifying a request signature with the secret it was granted.

use std::fmt;

use hookstack_common::constants::{INVOKE_URL_ACTION, URL_AUTH_CONDITION_KEY};
use hookstack_common::error::{HookstackError, Result};
use hookstack_common::types::LogicalId;
use serde::{Deserialize, Serialize};

/// Suffix appended to a unit name to form its endpoint id.
pub(crate) const URL_SUFFIX: &str = "Url";

/// Caller authentication required by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// No caller identity check; the URL is public.
    None,
    /// Callers must sign requests with provider credentials.
    AwsIam,
}

impl AuthMode {
    /// Returns the provider's name for the mode.
    #[must_use]
    pub const fn as_provider_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::AwsIam => "AWS_IAM",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::AwsIam => write!(f, "aws_iam"),
        }
    }
}

/// Resource-based permission letting callers invoke the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvokePermission {
    /// Who may invoke: `*` for public URLs, otherwise the account.
    pub principal: String,
    /// The invoke action.
    pub action: String,
    /// Condition key pinning the permission to the endpoint's auth mode.
    pub condition_key: String,
    /// Required condition value.
    pub condition_value: String,
}

/// A URL bound to one compute unit. Never mutated after binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationEndpoint {
    /// Logical name of the endpoint resource.
    pub id: LogicalId,
    /// Unit the endpoint invokes.
    pub unit: LogicalId,
    /// Caller authentication mode.
    pub auth_mode: AuthMode,
    /// Invoke permission generated for the mode.
    pub permission: InvokePermission,
}

impl InvocationEndpoint {
    /// Returns whether anyone with the URL can invoke the unit.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        matches!(self.auth_mode, AuthMode::None)
    }
}

/// Binds a new endpoint for `unit`, recording it in `endpoints`.
///
/// `account` is the principal allowed to call IAM-authenticated endpoints.
///
/// # Errors
///
/// Returns [`HookstackError::AlreadyBound`] if `unit` already has an endpoint.
pub fn bind(
    endpoints: &mut Vec<InvocationEndpoint>,
    unit: &LogicalId,
    auth_mode: AuthMode,
    account: &str,
) -> Result<InvocationEndpoint> {
    if endpoints.iter().any(|e| &e.unit == unit) {
        return Err(HookstackError::AlreadyBound {
            unit: unit.to_string(),
        });
    }

    let principal = match auth_mode {
        AuthMode::None => {
            tracing::warn!(
                unit = %unit,
                "binding unauthenticated invocation URL: anyone who discovers it can invoke the unit"
            );
            "*".to_string()
        }
        AuthMode::AwsIam => account.to_string(),
    };

    let endpoint = InvocationEndpoint {
        id: unit.child(URL_SUFFIX),
        unit: unit.clone(),
        auth_mode,
        permission: InvokePermission {
            principal,
            action: INVOKE_URL_ACTION.to_string(),
            condition_key: URL_AUTH_CONDITION_KEY.to_string(),
            condition_value: auth_mode.as_provider_str().to_string(),
        },
    };
    endpoints.push(endpoint.clone());
    tracing::info!(unit = %unit, auth_mode = %auth_mode, "invocation endpoint bound");
    Ok(endpoint)
}
