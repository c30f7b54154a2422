#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "asct: build the body-rooted ASCT+B anatomical structure / cell type graph",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (pretty, text, json).
    #[arg(long = "format-output", value_enum, global = true)]
    format_output: Option<OutputMode>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags, `FORMAT` and the terminal.
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format_output, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Build",
        about = "Build the graph and export it",
        long_about = "Load the organ tables, build the primary graph (and optionally the secondary overlay), write the exports and report diagnostics.",
        after_help = "EXAMPLES:\n    # Build from a local release file into ./data\n    asct build --input hra-asctb-all.json\n\n    # Download the default release and also build the vasculature overlay\n    asct build --secondary\n\n    # Only write CSV tables, report as JSON\n    asct build --input asctb.json --format csv --json"
    )]
    Build(cmd::build::BuildArgs),

    #[command(
        next_help_heading = "Read",
        about = "Inspect an exported node table",
        long_about = "Audit duplicate rows and look up nodes in an exported node table.",
        after_help = "EXAMPLES:\n    # Duplicate audit\n    asct inspect --nodes data/asct-nodes.csv\n\n    # Where did the heart end up?\n    asct inspect --nodes data/asct-nodes.csv --ontology-id UBERON:0000948\n\n    # Entities placed more than once, shown for the vasculature\n    asct inspect --nodes data/asct-nodes.csv --shared-in blood_vasculature --limit 20"
    )]
    Inspect(cmd::inspect::InspectArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ASCT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "asct=debug,info"
        } else {
            "asct=info,warn"
        })
    });

    let format = env::var("ASCT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        debug!("verbose mode enabled");
    }

    let output = cli.output_mode();
    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("error: cannot read working directory: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Build(ref args) => cmd::build::run_build(args, output, cli.quiet, &cwd),
        Commands::Inspect(ref args) => cmd::inspect::run_inspect(args, output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let cli_error = output::CliError::from_anyhow(&err);
            if output::render_error(output, &cli_error).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
