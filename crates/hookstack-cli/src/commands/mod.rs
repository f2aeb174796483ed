//! CLI command definitions and dispatch.

pub mod deploy;
pub mod plan;
pub mod synth;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hookstack_common::config::HookstackConfig;
use hookstack_common::constants::{APP_NAME, DEFAULT_MANIFEST};
use hookstack_compose::{manifest, StackComposer};

/// hookstack: secret-backed webhook stacks from a YAML manifest.
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to a JSON or YAML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Region used in generated identities.
    #[arg(long, global = true, env = "HOOKSTACK_REGION")]
    pub region: Option<String>,

    /// Account used in generated identities and IAM invoke permissions.
    #[arg(long, global = true, env = "HOOKSTACK_ACCOUNT")]
    pub account: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display the resources, permissions and endpoints a manifest declares.
    Plan(plan::PlanArgs),
    /// Write the synthesized template.
    Synth(synth::SynthArgs),
    /// Synthesize and provision with the dry-run engine.
    Deploy(deploy::DeployArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if configuration loading or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Plan(args) => plan::execute(args, &config),
        Command::Synth(args) => synth::execute(args, &config),
        Command::Deploy(args) => deploy::execute(args, config),
    }
}

/// Loads the configuration file, if any, then applies flag and environment
/// overrides.
fn load_config(cli: &Cli) -> anyhow::Result<HookstackConfig> {
    let mut config = match &cli.config {
        Some(path) => HookstackConfig::load(path)?,
        None => HookstackConfig::default(),
    };
    if let Some(region) = &cli.region {
        config.region.clone_from(region);
    }
    if let Some(account) = &cli.account {
        config.account.clone_from(account);
    }
    tracing::debug!(region = %config.region, account = %config.account, "configuration loaded");
    Ok(config)
}

/// Loads `path` and replays it into a composer that is still building.
fn compose(path: &Path, config: &HookstackConfig) -> anyhow::Result<StackComposer> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "manifest not found: {}\n\
             Create a {DEFAULT_MANIFEST} file or specify a path: {APP_NAME} <command> <file>",
            path.display(),
        ));
    }
    let manifest = manifest::load(path)?;
    Ok(manifest.compose(config)?)
}
