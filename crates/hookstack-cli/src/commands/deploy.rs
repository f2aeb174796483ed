//! `hookstack deploy`: synthesize and provision with the dry-run engine.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use hookstack_common::config::HookstackConfig;
use hookstack_common::constants::DEFAULT_MANIFEST;
use hookstack_compose::ProvisionReport;
use hookstack_provision::DryRunEngine;

/// Arguments for the `deploy` command.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Path to the stack manifest.
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,

    /// Directory the template is written to.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Executes the `deploy` command.
///
/// Artifact paths in the manifest are resolved relative to the manifest's
/// directory.
///
/// # Errors
///
/// Returns an error if synthesis or provisioning fails.
pub fn execute(args: DeployArgs, mut config: HookstackConfig) -> anyhow::Result<()> {
    let start = Instant::now();
    if let Some(out_dir) = args.out_dir {
        config.out_dir = out_dir;
    }

    let mut composer = super::compose(&args.file, &config)?;
    let _ = composer.synthesize()?;

    let mut engine = DryRunEngine::from_config(&config);
    if let Some(root) = args.file.parent() {
        engine = engine.artifact_root(root);
    }
    let report = composer.deploy(&engine)?;

    print_report(&report, &engine, start);
    Ok(())
}

fn print_report(report: &ProvisionReport, engine: &DryRunEngine, start: Instant) {
    eprintln!();
    eprintln!(
        "  {GREEN}{BOLD}Deployed {}{RESET} in {:.1}s {DIM}[{}]{RESET}",
        report.stack,
        start.elapsed().as_secs_f64(),
        report.deployment_id
    );
    eprintln!();

    for (resource, outputs) in &report.outputs {
        let identity = outputs.identity.as_deref().unwrap_or("-");
        eprintln!("    {GREEN}●{RESET} {BOLD}{resource}{RESET} {DIM}{identity}{RESET}");
        if let Some(role) = &outputs.role {
            eprintln!("        {DIM}role: {role}{RESET}");
        }
        if let Some(url) = &outputs.url {
            eprintln!("        {CYAN}->{RESET} {BOLD}{url}{RESET}");
        }
    }

    eprintln!();
    eprintln!(
        "  {DIM}Template: {}{RESET}",
        engine.template_path(&report.stack).display()
    );
}
