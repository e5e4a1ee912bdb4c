mod aggregate;
mod cli;
mod commands;
mod config;
mod corpus;
mod engine;
mod model;
mod pipeline;
mod queue;
mod review;
mod scoring;
#[cfg(test)]
mod test_support;
mod translate;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Docs(args) => commands::docs::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Probe(args) => commands::probe::run(args),
        Commands::Score(args) => commands::score::run(args),
        Commands::Aggregate(args) => commands::aggregate::run(args),
        Commands::Refresh(args) => commands::refresh::run(args),
        Commands::Review(args) => commands::review::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
