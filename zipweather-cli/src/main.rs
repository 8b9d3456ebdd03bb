//! Binary crate for the `zipweather` command-line tool.
//!
//! This crate focuses on:
//! - Running either hop as an HTTP server
//! - One-shot lookups from the terminal
//! - Interactive configuration

use clap::Parser;
use zipweather_core::telemetry;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    let _telemetry = telemetry::init(cmd.command.service_name())?;

    cmd.run().await
}
