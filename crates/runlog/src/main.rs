// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! runlog: reconstruct test runs from test runner console output
//!
//! Reads a log from stdin or `--input` and writes every published run as a
//! JSON line to stdout or `--output`.

use std::process::ExitCode;

use clap::Parser;
use runlog::{Config, run_pipeline};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Logs go to stderr; stdout carries the published runs.
    let filter = EnvFilter::builder()
        .with_default_directive(config.log_level().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = config.validate() {
        error!("{err}");
        return ExitCode::FAILURE;
    }

    info!(parsers = ?config.selected_parsers(), "Starting runlog");
    match run_pipeline(&config).await {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            error!(failed_parsers = report.failures.len(), "Some parsers stopped early");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
