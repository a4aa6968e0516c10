use super::{CliError, EngineFlags};
use anyhow::Context;
use mdkit_core::modules::execution::script::validate_script;
use mdkit_core::{
    ExecutionConfig, ExecutionPipeline, SimulationResponse, analyze, cleanup_stale_runs,
};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Engine input script
    script: PathBuf,

    /// Auxiliary potential file staged next to the script before execution
    #[arg(long)]
    potential: Option<PathBuf>,

    #[command(flatten)]
    engine: EngineFlags,
}

#[derive(clap::Args)]
pub(super) struct AnalyzeArgs {
    /// Trajectory file (XYZ or dump format)
    trajectory: PathBuf,

    /// Velocity dump file for kinetic-energy enrichment
    #[arg(long)]
    velocities: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct ValidateArgs {
    /// Engine input script
    script: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct CleanupArgs {
    /// Root directory holding `sim_*` working directories
    #[arg(long, default_value = "simulations")]
    simulations_dir: PathBuf,

    /// Age threshold in hours
    #[arg(long, default_value_t = 24)]
    max_age_hours: u64,
}

pub(super) fn run_simulation_command(args: RunArgs) -> Result<i32, CliError> {
    if let Some(potential) = &args.potential {
        stage_potential(potential, &args.script)?;
    }

    let defaults = ExecutionConfig::default();
    let config = ExecutionConfig {
        engine_executable: args.engine.engine.unwrap_or(defaults.engine_executable),
        simulations_root: args.engine.simulations_dir,
        storage_root: args.engine.storage_dir,
    };

    let outcome = ExecutionPipeline::with_defaults(config).run(&args.script);
    print_json(&SimulationResponse::from_outcome(&outcome))?;
    Ok(if outcome.success { 0 } else { 1 })
}

/// Copy the auxiliary file next to the script so it rides the pipeline's
/// sibling-copy rule into the working directory.
fn stage_potential(potential: &PathBuf, script: &PathBuf) -> Result<(), CliError> {
    let name = potential
        .file_name()
        .ok_or_else(|| CliError::Usage(format!("not a file: {}", potential.display())))?;
    let target = script
        .parent()
        .map(|parent| parent.join(name))
        .unwrap_or_else(|| PathBuf::from(name));

    if target != *potential {
        fs::copy(potential, &target)
            .with_context(|| format!("failed to stage potential file '{}'", potential.display()))?;
        info!(path = %target.display(), "staged potential file");
    }
    Ok(())
}

pub(super) fn run_analyze_command(args: AnalyzeArgs) -> Result<i32, CliError> {
    let result = analyze(&args.trajectory, args.velocities.as_deref());
    let failed = result.error().is_some();
    print_json(&SimulationResponse::from_analysis(&result))?;
    Ok(if failed { 1 } else { 0 })
}

pub(super) fn run_validate_command(args: ValidateArgs) -> Result<i32, CliError> {
    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read input script '{}'", args.script.display()))?;

    let report = validate_script(&source);
    print_json(&json!({
        "valid": report.is_valid(),
        "errors": report.errors,
        "warnings": report.warnings,
    }))?;
    Ok(if report.is_valid() { 0 } else { 1 })
}

pub(super) fn run_cleanup_command(args: CleanupArgs) -> Result<i32, CliError> {
    let max_age = Duration::from_secs(args.max_age_hours * 3600);
    let removed = cleanup_stale_runs(&args.simulations_dir, max_age);
    print_json(&json!({ "removed": removed }))?;
    Ok(0)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
