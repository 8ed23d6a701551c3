mod cli;
pub mod core;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use cli::{parse_selection, Cli, ConsoleReporter, PromptSelector};

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse the command line, run the launcher and return the exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    tracing::info!("MicroDrop launcher {} starting...", env!("CARGO_PKG_VERSION"));

    cli::execute(cli).await
}
