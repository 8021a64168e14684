use clap::Parser;
use tracing_subscriber::EnvFilter;

use widescreen_rs::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout carries MCP protocol frames; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli::run(cli).await
}
