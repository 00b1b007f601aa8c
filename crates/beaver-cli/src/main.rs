//! Beaver CLI: the `beaver` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

/// Environment variable holding an `EnvFilter` directive that overrides
/// `--verbose`/`--quiet`.
const LOG_ENV: &str = "BEAVER_LOG";

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Call {
            rulebook,
            class,
            operations,
        } => commands::call::run(rulebook, class, operations, cli.json),

        Commands::Probe {
            rulebook,
            class,
            operations,
        } => commands::probe::run(rulebook, class, operations, cli.json),

        Commands::Inspect { rulebook } => commands::inspect::run(rulebook, cli.json),
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("warn"),
                1 => EnvFilter::new("debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    // stdout carries command output; logs go to stderr.
    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}
