//! # hookstack-compose
//!
//! Declares the secret → webhook function topology and synthesizes it into
//! a frozen deployment graph.
//!
//! Handles:
//! - **Secret**: Resolution of externally managed secrets by stable identifier.
//! - **Compute**: Declaration and validation of compute units.
//! - **Grant**: Derivation of the permission statements a unit needs.
//! - **Invoke**: Invocation endpoints bound to compute units.
//! - **Graph**: Dependency graph construction and the frozen deployment graph.
//! - **Validator**: Wiring checks performed at synthesis.
//! - **Composer**: The two-phase `Building → Synthesized` orchestrator.
//! - **Engine**: The provisioning hand-off boundary.
//! - **Manifest**: YAML stack manifests fed into a composer.

pub mod composer;
pub mod compute;
pub mod engine;
pub mod grant;
pub mod graph;
pub mod invoke;
pub mod manifest;
pub mod secret;
pub mod validator;

pub use composer::StackComposer;
pub use compute::{ComputeUnitHandle, ComputeUnitSpec};
pub use engine::{ProvisionReport, ProvisioningEngine};
pub use grant::{Effect, PermissionStatement, PolicyBreadth, ReadGrant};
pub use graph::DeploymentGraph;
pub use invoke::{AuthMode, InvocationEndpoint};
pub use secret::SecretReference;
