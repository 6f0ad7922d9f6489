use anyhow::Result;
use clap::Parser;
use schelling_app::{Cli, dispatch};
use tracing::info;

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    info!(command = ?cli.command, "starting schelling");
    dispatch(&cli)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
