//! CLI module for Pieslot.
//!
//! One-shot commands build the reconciliation pipeline, run a single forced
//! cycle and print the result. `watch` runs the periodic service instead.

mod commands;
mod output;

use clap::Parser;
pub use commands::{Cli, Commands};
use tracing_subscriber::EnvFilter;

use crate::error::PieslotError;

/// Runs the CLI.
///
/// Parses command-line arguments, installs logging and executes the
/// appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), PieslotError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.execute()
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `info`, or `debug` for
/// this crate with `--verbose`. Logs go to stderr so JSON output stays clean.
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "info,pieslot_lib=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
