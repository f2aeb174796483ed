//! Static checks run when a composition is synthesized.
//!
//! Verifies that every secret dependency is backed by a readable grant and
//! collects the statements that reach beyond least privilege.

use hookstack_common::error::{HookstackError, Result};

use crate::compute::ComputeUnit;
use crate::grant::{self, Effect, PolicyBreadth, PolicyFinding};

/// Validates the wiring of declared units.
///
/// # Checks performed
///
/// 1. Every secret a unit depends on is readable through the unit's policy.
///
/// Units are checked in declaration order and their secrets in dependency
/// order, so the reported error is the first violation declared.
///
/// # Errors
///
/// Returns [`HookstackError::IncompleteWiring`] for the first unit/secret
/// pair without a read grant.
pub fn validate(units: &[ComputeUnit]) -> Result<()> {
    tracing::info!(units = units.len(), "validating composition wiring");
    for unit in units {
        for secret in &unit.secrets {
            if !grant::grants_read(&unit.policy, secret) {
                return Err(HookstackError::IncompleteWiring {
                    unit: unit.name.to_string(),
                    secret: secret.identifier().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Collects every allow statement broader than a scoped grant.
#[must_use]
pub fn policy_findings(units: &[ComputeUnit]) -> Vec<PolicyFinding> {
    units
        .iter()
        .flat_map(|unit| {
            unit.policy
                .iter()
                .filter(|s| s.effect == Effect::Allow)
                .filter(|s| s.breadth() != PolicyBreadth::Scoped)
                .map(|s| PolicyFinding {
                    unit: unit.name.clone(),
                    statement: s.clone(),
                    breadth: s.breadth(),
                })
        })
        .collect()
}
