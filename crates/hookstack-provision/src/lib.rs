//! # hookstack-provision
//!
//! Provisioning engines that consume a synthesized
//! [`DeploymentGraph`](hookstack_compose::DeploymentGraph).
//!
//! - [`DryRunEngine`](dry_run::DryRunEngine): Writes the template to disk and
//!   reports the outputs a real deployment would generate.
//! - [`artifact`]: SHA-256 verification of pre-built function packages.

pub mod artifact;
pub mod dry_run;

pub use artifact::ArtifactDigest;
pub use dry_run::DryRunEngine;
