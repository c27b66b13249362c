use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use monke::repl::{self, ReplConfig};
use monke::{interpret, Evaluator};

/// Run monke programs, or start an interactive shell.
#[derive(Debug, Parser)]
#[clap(name = "monke", version)]
struct Cli {
    /// Source file to run. Starts the shell when neither this nor --eval is given
    file: Option<PathBuf>,

    /// Source text to run instead of a file
    #[clap(short, long, conflicts_with = "file")]
    eval: Option<String>,

    /// Prompt printed by the shell
    #[clap(long, default_value = ">> ")]
    prompt: String,

    /// More log output on stderr (-v info, -vv debug, -vvv trace); RUST_LOG overrides it
    #[clap(short, long, parse(from_occurrences))]
    verbose: u64,
}

fn init_tracing(verbose: u64) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> monke::Result<()> {
    let source = match (&cli.eval, &cli.file) {
        (Some(source), _) => source.clone(),
        (None, Some(path)) => {
            debug!(path = %path.display(), "reading source file");
            fs::read_to_string(path)?
        }
        (None, None) => {
            let config = ReplConfig { prompt: cli.prompt };
            repl::start(io::stdin().lock(), io::stdout(), &config)?;
            return Ok(());
        }
    };

    let mut evaluator = Evaluator::default();
    if let Some(value) = interpret(&source, &mut evaluator)? {
        println!("{}", value);
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.to_string().trim_end());
            ExitCode::FAILURE
        }
    }
}
