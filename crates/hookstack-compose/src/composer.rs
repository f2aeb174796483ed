//! Two-phase stack composition.
//!
//! A [`StackComposer`] starts in [`ComposerPhase::Building`], where secrets,
//! compute units, grants and endpoints are declared in the caller's order.
//! [`StackComposer::synthesize`] checks the wiring and freezes everything into
//! a [`DeploymentGraph`]. Synthesis happens at most once: a synthesized
//! composer rejects every further declaration, and a new deployment needs a
//! new composer.

use std::sync::Arc;

use hookstack_common::config::{HookstackConfig, MemoryBounds};
use hookstack_common::error::{HookstackError, Result};
use hookstack_common::types::{ComposerPhase, LogicalId};

use crate::compute::{self, ComputeUnit, ComputeUnitHandle, ComputeUnitSpec};
use crate::engine::{ProvisionReport, ProvisioningEngine};
use crate::grant::{self, Effect, PermissionStatement, PolicyBreadth, ReadGrant};
use crate::graph::{DeploymentGraph, Layout};
use crate::invoke::{self, AuthMode, InvocationEndpoint};
use crate::secret::{self, SecretReference};
use crate::validator;

#[derive(Debug, Default)]
struct Draft {
    secrets: Vec<SecretReference>,
    units: Vec<ComputeUnit>,
    endpoints: Vec<InvocationEndpoint>,
}

#[derive(Debug)]
enum State {
    Building(Draft),
    Synthesized(Arc<DeploymentGraph>),
}

/// Orchestrates the declaration and synthesis of one stack.
#[derive(Debug)]
pub struct StackComposer {
    name: String,
    account: String,
    bounds: MemoryBounds,
    state: State,
}

impl StackComposer {
    /// Creates a composer with the default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, &HookstackConfig::default())
    }

    /// Creates a composer using the account and memory bounds from `config`.
    #[must_use]
    pub fn with_config(name: impl Into<String>, config: &HookstackConfig) -> Self {
        Self {
            name: name.into(),
            account: config.account.clone(),
            bounds: config.memory_bounds,
            state: State::Building(Draft::default()),
        }
    }

    /// Returns the stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> ComposerPhase {
        match self.state {
            State::Building(_) => ComposerPhase::Building,
            State::Synthesized(_) => ComposerPhase::Synthesized,
        }
    }

    /// Returns the frozen graph once synthesized.
    #[must_use]
    pub const fn graph(&self) -> Option<&Arc<DeploymentGraph>> {
        match &self.state {
            State::Building(_) => None,
            State::Synthesized(graph) => Some(graph),
        }
    }

    /// Resolves an externally managed secret into this composition.
    ///
    /// Resolving the same identifier twice returns the same reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is malformed or the composer is
    /// already synthesized.
    pub fn resolve_secret(&mut self, identifier: &str) -> Result<SecretReference> {
        let draft = self.draft_mut("resolve a secret")?;
        if let Some(existing) = draft.secrets.iter().find(|s| s.identifier() == identifier) {
            return Ok(existing.clone());
        }
        let secret = secret::resolve(identifier)?;
        draft.secrets.push(secret.clone());
        Ok(secret)
    }

    /// Declares a compute unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or one of its derived role and endpoint
    /// ids is taken, a dependency was not resolved by this composer, the
    /// spec fails validation, or the composer is already synthesized.
    pub fn declare(&mut self, spec: ComputeUnitSpec) -> Result<ComputeUnitHandle> {
        let bounds = self.bounds;
        let draft = self.draft_mut("declare a compute unit")?;
        if draft.units.iter().any(|u| &u.name == spec.name()) {
            return Err(HookstackError::DuplicateName {
                kind: "compute unit",
                name: spec.name().to_string(),
            });
        }
        let claimed = logical_ids(spec.name());
        if let Some(taken) = draft
            .units
            .iter()
            .flat_map(|u| logical_ids(&u.name))
            .find(|id| claimed.contains(id))
        {
            return Err(HookstackError::DuplicateName {
                kind: "logical id",
                name: taken.to_string(),
            });
        }
        let unit = compute::declare(spec, &bounds)?;
        if let Some(foreign) = unit.secrets.iter().find(|s| !draft.secrets.contains(s)) {
            return Err(HookstackError::NotFound {
                kind: "secret",
                id: foreign.identifier().to_string(),
            });
        }

        let handle = ComputeUnitHandle {
            index: draft.units.len(),
            name: unit.name.clone(),
        };
        draft.units.push(unit);
        Ok(handle)
    }

    /// Grants `unit` the default read actions on exactly `secret`.
    ///
    /// # Errors
    ///
    /// See [`StackComposer::grant_with`].
    pub fn grant(&mut self, unit: &ComputeUnitHandle, secret: &SecretReference) -> Result<()> {
        self.grant_with(unit, &ReadGrant::new(secret))
    }

    /// Attaches the statement derived from `grant` to `unit`.
    ///
    /// Granting an identical (unit, secret, actions, resource) request twice
    /// leaves a single statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit or secret does not belong to this
    /// composer, the grant is invalid, or the composer is already
    /// synthesized.
    pub fn grant_with(&mut self, unit: &ComputeUnitHandle, grant: &ReadGrant) -> Result<()> {
        let draft = self.draft_mut("grant")?;
        if !draft.secrets.contains(grant.secret()) {
            return Err(HookstackError::NotFound {
                kind: "secret",
                id: grant.secret().identifier().to_string(),
            });
        }
        let statement = grant.to_statement()?;
        let target = unit_mut(draft, unit)?;
        if grant::attach(&mut target.policy, statement)? {
            tracing::info!(
                unit = %target.name,
                secret = %grant.secret(),
                "read access granted"
            );
        } else {
            tracing::debug!(unit = %target.name, secret = %grant.secret(), "grant already present");
        }
        Ok(())
    }

    /// Attaches an arbitrary statement to `unit`'s policy.
    ///
    /// This bypasses the minimal-grant derivation. Allow statements with
    /// wildcards are logged as warnings and reported as findings at
    /// synthesis.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit does not belong to this composer, the
    /// statement is empty, or the composer is already synthesized.
    pub fn attach_policy(
        &mut self,
        unit: &ComputeUnitHandle,
        statement: PermissionStatement,
    ) -> Result<()> {
        let draft = self.draft_mut("attach a policy")?;
        let target = unit_mut(draft, unit)?;
        let breadth = statement.breadth();
        if statement.effect == Effect::Allow && breadth != PolicyBreadth::Scoped {
            tracing::warn!(
                unit = %target.name,
                statement = %statement,
                breadth = %breadth,
                "policy widens access beyond the minimal grant"
            );
        }
        let _ = grant::attach(&mut target.policy, statement)?;
        Ok(())
    }

    /// Binds an invocation endpoint to `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`HookstackError::AlreadyBound`] if the unit already has an
    /// endpoint, or an error if the unit is unknown or the composer is
    /// already synthesized.
    pub fn bind(
        &mut self,
        unit: &ComputeUnitHandle,
        auth_mode: AuthMode,
    ) -> Result<InvocationEndpoint> {
        let account = self.account.clone();
        let draft = self.draft_mut("bind an endpoint")?;
        let name = unit_mut(draft, unit)?.name.clone();
        invoke::bind(&mut draft.endpoints, &name, auth_mode, &account)
    }

    /// Checks the wiring and freezes the composition.
    ///
    /// On failure the composer stays in `Building`.
    ///
    /// # Errors
    ///
    /// Returns [`HookstackError::Config`] if the stack name cannot be used
    /// as a file name, [`HookstackError::IncompleteWiring`] for the first
    /// unit that depends on a secret it cannot read, or
    /// [`HookstackError::CompositionFrozen`] if already synthesized.
    pub fn synthesize(&mut self) -> Result<Arc<DeploymentGraph>> {
        let State::Building(draft) = &mut self.state else {
            return Err(HookstackError::CompositionFrozen {
                operation: "synthesize",
            });
        };
        check_stack_name(&self.name)?;
        validator::validate(&draft.units)?;
        let findings = validator::policy_findings(&draft.units);
        let layout = Layout::plan(&draft.secrets, &draft.units, &draft.endpoints)?;
        let Draft {
            secrets,
            units,
            endpoints,
        } = std::mem::take(draft);

        let graph = Arc::new(DeploymentGraph::assemble(
            self.name.clone(),
            secrets,
            units,
            endpoints,
            layout,
            findings,
        ));
        tracing::info!(
            stack = %self.name,
            secrets = graph.secrets().len(),
            units = graph.units().len(),
            endpoints = graph.endpoints().len(),
            findings = graph.findings().len(),
            "stack synthesized"
        );
        self.state = State::Synthesized(Arc::clone(&graph));
        Ok(graph)
    }

    /// Hands the frozen graph to `engine`, returning its result unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the composer has not been synthesized, or
    /// whatever error the engine reports.
    pub fn deploy(&self, engine: &dyn ProvisioningEngine) -> Result<ProvisionReport> {
        let Some(graph) = self.graph() else {
            return Err(HookstackError::Config {
                message: format!("stack \"{}\" must be synthesized before deploy", self.name),
            });
        };
        tracing::info!(stack = %self.name, engine = engine.name(), "handing graph to provisioning engine");
        engine.provision(graph)
    }

    fn draft_mut(&mut self, operation: &'static str) -> Result<&mut Draft> {
        match &mut self.state {
            State::Building(draft) => Ok(draft),
            State::Synthesized(_) => Err(HookstackError::CompositionFrozen { operation }),
        }
    }
}

/// Ids a unit occupies: its own name, its role and its endpoint.
fn logical_ids(name: &LogicalId) -> [LogicalId; 3] {
    [
        name.clone(),
        name.child(compute::ROLE_SUFFIX),
        name.child(invoke::URL_SUFFIX),
    ]
}

/// Stack names become template file names.
fn check_stack_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name.contains("..") {
        Some("must not contain \"..\"")
    } else if name.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(HookstackError::Config {
            message: format!("invalid stack name \"{}\": {reason}", name.escape_debug()),
        }),
        None => Ok(()),
    }
}

fn unit_mut<'a>(draft: &'a mut Draft, handle: &ComputeUnitHandle) -> Result<&'a mut ComputeUnit> {
    draft
        .units
        .get_mut(handle.index)
        .filter(|u| u.name == handle.name)
        .ok_or_else(|| HookstackError::NotFound {
            kind: "compute unit",
            id: handle.name.to_string(),
        })
}
