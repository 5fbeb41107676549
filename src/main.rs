use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use escritorio::cli::Cli;
use escritorio::config::Config;
use escritorio::dispatcher::{dispatch_command, Runtime};

#[tokio::main]
async fn main() {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let runtime = Runtime::new(&cli, &config);
    tracing::debug!("Database: {:?}", runtime.db_path);

    dispatch_command(cli.command, &runtime).await
}
