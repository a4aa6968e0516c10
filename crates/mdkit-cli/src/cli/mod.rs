mod commands;

use clap::Parser;
use mdkit_core::domain::SimError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(std::env::args().skip(1)) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_sim_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            diagnostic.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("mdkit".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();

    match Cli::try_parse_from(&full_args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_simulation_command(args),
        CliCommand::Analyze(args) => commands::run_analyze_command(args),
        CliCommand::Validate(args) => commands::run_validate_command(args),
        CliCommand::Cleanup(args) => commands::run_cleanup_command(args),
    }
}

#[derive(Parser)]
#[command(name = "mdkit", about = "MD run orchestration and trajectory analysis")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Validate, execute, and analyze an input script end to end
    Run(commands::RunArgs),
    /// Analyze an existing trajectory file
    Analyze(commands::AnalyzeArgs),
    /// Validate an input script without executing it
    Validate(commands::ValidateArgs),
    /// Remove stale simulation working directories
    Cleanup(commands::CleanupArgs),
}

#[derive(clap::Args)]
pub(crate) struct EngineFlags {
    /// Engine executable (default `lmp`, or the MDKIT_ENGINE variable)
    #[arg(long)]
    pub engine: Option<String>,

    /// Root directory for transient working directories
    #[arg(long, default_value = "simulations")]
    pub simulations_dir: PathBuf,

    /// Root directory for durable output storage
    #[arg(long, default_value = "storage")]
    pub storage_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(SimError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_sim_error(&self) -> SimError {
        match self {
            Self::Usage(message) => SimError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => SimError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
