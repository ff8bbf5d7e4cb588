#[macro_use]
mod errors;
mod repl;
mod sql;
mod storage;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A single-file table store with a line-oriented REPL.
#[derive(Parser)]
#[command(name = "tinybase", version = VERSION)]
struct Cli {
    /// Path to the database file. Created if it doesn't exist.
    database_path: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut table = match storage::Table::open(&cli.database_path) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error opening {}: {}", cli.database_path, e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let result = repl::run(&mut table, stdin.lock(), io::stdout());

    if let Err(e) = table.flush() {
        eprintln!("Error flushing {}: {}", cli.database_path, e);
        return ExitCode::FAILURE;
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
