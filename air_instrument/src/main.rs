//! air_instrument: entry point.

use air_instrument::app::run;
use air_instrument::config::Cli;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "air_instrument=info,air_samples=info".into()),
        )
        .init();

    let cfg = Cli::parse().into_config()?;

    info!(instrument = %cfg.instrument, replay = ?cfg.replay, "air instrument starting");

    run(cfg)
}
