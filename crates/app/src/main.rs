mod config;
mod input_gen;

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use clap::Parser;
use packet_pipeline_core::sink::from_fn;
use packet_pipeline_core::{Packet, Pipeline};
use tracing::info;

use config::{Config, InputSource};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only packets and the summary
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::parse().resolve();
    if config.print_config {
        config.print();
    }

    let message = read_message(&config)?;
    let pipeline =
        Pipeline::new(config.pipeline_config()).context("invalid pipeline configuration")?;

    info!(chars = message.chars().count(), "sending message");
    let report = pipeline
        .run(&message, from_fn(|packet: Packet| println!("{packet}")))
        .context("pipeline run failed")?;

    if !config.no_metrics {
        report.metrics.print_summary();
    }
    Ok(())
}

fn read_message(config: &Config) -> Result<String> {
    match config.input_source() {
        InputSource::Message(message) => Ok(message),
        InputSource::Generate { len, seed } => {
            info!(len, seed, "generating message");
            Ok(input_gen::generate_message(seed, len))
        }
        InputSource::Stdin => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read message from stdin")?;
            Ok(line.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}
