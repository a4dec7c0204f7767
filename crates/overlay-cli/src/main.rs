// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

mod error;
mod plan;
mod probe;
mod resolve;
mod setup;
mod simulate;
mod utils;

use clap::{Parser, Subcommand};
use error::{result_to_exit_code, CliError};
use std::process::ExitCode;

/// Overlay CLI - display state resolution, geometry planning and simulated playback
#[derive(Parser)]
#[command(name = "overlayctl", version, propagate_version = true)]
#[command(about = "Overlay CLI - display states, overlay geometry and simulated playback")]
struct Cli {
    /// Enable verbose logging (use RUST_LOG=trace for per-frame detail)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Default filter when RUST_LOG is not set
    fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (_, true) => "debug",
            _ => "info",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the display state for a set of conditions
    Resolve(resolve::Args),

    /// Show the per-channel overlay geometry for a source
    Plan(plan::Args),

    /// Queue frames through a simulated display driver
    Simulate(simulate::Args),

    /// Read the capability files and resolve the display state
    Probe(probe::Args),
}

fn run(cli: Cli) -> Result<(), CliError> {
    let json = cli.json;
    match cli.command {
        Commands::Resolve(args) => resolve::execute(args, json),
        Commands::Plan(args) => plan::execute(args, json),
        Commands::Simulate(args) => simulate::execute(args, json),
        Commands::Probe(args) => probe::execute(args, json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .format_target(false)
        .init();

    result_to_exit_code(run(cli))
}
