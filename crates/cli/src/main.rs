mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use commands::{check::cmd_check, explain::cmd_explain, passes::cmd_passes};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Exit status when the input or configuration cannot be loaded.
pub(crate) const EXIT_LOAD_FAILURE: i32 = 2;

/// ISL semantic analyzer.
#[derive(Parser)]
#[command(name = "isl", version, about = "ISL semantic analyzer")]
struct Cli {
    /// Output format (text or json); overrides `[output] format` in isl.toml
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log analyzer progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run semantic analysis on a serialized domain AST
    Check {
        /// Path to the domain AST JSON file
        file: PathBuf,
        /// Comma-separated list of passes to run. Default: all enabled passes.
        #[arg(long)]
        passes: Option<String>,
        /// Path to a configuration file (default: ./isl.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Exit non-zero when any warning is reported
        #[arg(long)]
        deny_warnings: bool,
    },

    /// List the registered analysis passes
    Passes,

    /// Describe a diagnostic code
    Explain {
        /// Error code (E0350) or symbolic name (TAUTOLOGY)
        code: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("ISL_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check {
            file,
            passes,
            config,
            deny_warnings,
        } => {
            cmd_check(commands::check::CheckOptions {
                file: &file,
                passes: passes.as_deref(),
                config: config.as_deref(),
                deny_warnings,
                output: cli.output,
                quiet: cli.quiet,
            });
        }
        Commands::Passes => {
            cmd_passes(cli.output.unwrap_or(OutputFormat::Text), cli.quiet);
        }
        Commands::Explain { code } => {
            cmd_explain(&code, cli.output.unwrap_or(OutputFormat::Text), cli.quiet);
        }
    }
}

/// Report an error to stderr in the requested output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
