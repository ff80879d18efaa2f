use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod command;
mod config;
mod editor;
mod error;
mod history;
mod pipes;
mod prompt;
mod redirects;
mod shell;
mod tokenizer;

use config::Cli;

/// `--log` beats `PIPESH_LOG`, which beats the `warn` default.
fn init_logging(cli: &Cli) {
    let filter = match &cli.log {
        Some(directives) => EnvFilter::try_new(directives).ok(),
        None => EnvFilter::try_from_env("PIPESH_LOG").ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut shell = shell::Shell::new(&cli);

    if let Err(e) = shell.run() {
        eprintln!("pipesh: {}", e);
        process::exit(1);
    }
}
