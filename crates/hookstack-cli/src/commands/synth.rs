//! `hookstack synth`: write the synthesized template.

use std::path::PathBuf;

use clap::Args;
use hookstack_common::config::HookstackConfig;
use hookstack_common::constants::DEFAULT_MANIFEST;

/// Arguments for the `synth` command.
#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Path to the stack manifest.
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,

    /// Write the template here instead of standard output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes the `synth` command.
///
/// # Errors
///
/// Returns an error if synthesis fails or the template cannot be written.
pub fn execute(args: SynthArgs, config: &HookstackConfig) -> anyhow::Result<()> {
    let mut composer = super::compose(&args.file, config)?;
    let template = composer.synthesize()?.to_template_json()?;

    match args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, template)?;
            tracing::info!(path = %path.display(), "template written");
        }
        None => println!("{template}"),
    }
    Ok(())
}
