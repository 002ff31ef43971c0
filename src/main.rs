#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names
)]

use anyhow::{Context, Result};
use clap::Parser;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod app;
mod cli;

use cli::commands::Cli;
use tintward::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_init()?;

    // Initialize logging
    let level = Level::from_str(&config.observability.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Warning: unknown log level {:?}, using info",
            config.observability.log_level
        );
        Level::INFO
    });
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    app::dispatch::dispatch(cli, config).await
}
