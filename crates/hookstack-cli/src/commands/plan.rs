//! `hookstack plan`: display what a manifest will deploy.

use std::path::PathBuf;

use clap::Args;
use hookstack_common::config::HookstackConfig;
use hookstack_common::constants::DEFAULT_MANIFEST;
use hookstack_compose::graph::ResourceNode;
use hookstack_compose::DeploymentGraph;

use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the stack manifest.
    #[arg(default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,
}

/// Executes the `plan` command.
///
/// Parses the manifest, synthesizes it, and prints the resources in
/// provisioning order together with their permissions, endpoints, and any
/// policy findings.
///
/// # Errors
///
/// Returns an error if parsing, declaration, or synthesis fails.
pub fn execute(args: PlanArgs, config: &HookstackConfig) -> anyhow::Result<()> {
    let mut composer = super::compose(&args.file, config)?;
    let graph = composer.synthesize()?;
    print_plan(&graph);
    Ok(())
}

fn print_plan(graph: &DeploymentGraph) {
    println!("Deployment Plan for: {}", graph.stack());
    println!("{}", output::rule(40));
    println!();

    for node in graph.order() {
        println!("  + {node}");
        match node {
            ResourceNode::Secret(_) => println!("      managed: externally"),
            ResourceNode::Unit(name) => {
                if let Some(unit) = graph.unit(name.as_str()) {
                    println!("      artifact: {}", unit.artifact.display());
                    println!("      memory: {}", output::format_memory(unit.memory_mb));
                    for (key, value) in &unit.environment {
                        println!("      env: {key}={value}");
                    }
                    for statement in &unit.policy {
                        println!("      policy: {statement}");
                    }
                }
            }
            ResourceNode::Endpoint(id) => {
                if let Some(endpoint) = graph.endpoints().iter().find(|e| &e.id == id) {
                    println!("      auth: {}", endpoint.auth_mode.as_provider_str());
                    println!("      invoker: {}", endpoint.permission.principal);
                }
            }
        }
    }

    println!();
    println!("  {} resource(s) will be deployed.", graph.order().len());

    if !graph.edges().is_empty() {
        println!();
        println!("  Dependencies:");
        for edge in graph.edges() {
            println!("    {} -> {}", edge.dependency, edge.dependent);
        }
    }

    if !graph.findings().is_empty() {
        println!();
        println!("  Findings:");
        for finding in graph.findings() {
            println!(
                "    ! {} ({}): {}",
                finding.unit, finding.breadth, finding.statement
            );
        }
    }
}
