// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Pipeline wiring
//!
//! Reads a log, runs every selected parser over it in parallel and writes
//! the published runs through a [`JsonLinesSink`].

use std::sync::Arc;

use anyhow::{Context, Result};
use runlog_bus::{BusError, LineBus, ParserReport, SinkReport, channel, spawn_parser, spawn_sink};
use runlog_parser::{CumulativeTelemetry, ParserKind, Telemetry, TelemetryReport};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader, BufWriter};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::sink::JsonLinesSink;

/// Outcome of one pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    /// Stream id stamped on every written run
    pub stream_id: Uuid,
    /// Lines read from the input
    pub lines: u64,
    /// Parsers that reached the end of the stream
    pub parsers: Vec<ParserReport>,
    /// Parsers stopped by a fatal parse error
    pub failures: Vec<BusError>,
    /// What the sink did with the published runs
    pub sink: SinkReport,
}

impl PipelineReport {
    /// Whether every parser reached the end of the stream
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the parsers in `kinds` over `reader`, writing runs to `writer`
///
/// # Errors
///
/// Returns an error if reading the input or writing a run fails, or if a
/// task panics. Fatal parse errors are not errors here; they are collected
/// in [`PipelineReport::failures`].
pub async fn run_stream<R, W>(
    reader: R,
    writer: W,
    kinds: &[ParserKind],
    telemetry: Arc<dyn Telemetry>,
) -> Result<PipelineReport>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let stream_id = Uuid::new_v4();
    let (publisher, receiver) = channel();
    let sink = spawn_sink(
        receiver,
        JsonLinesSink::new(writer, stream_id, telemetry.clone()),
    );

    let publisher = Arc::new(publisher);
    let mut bus = LineBus::new();
    let tasks: Vec<_> = kinds
        .iter()
        .map(|kind| spawn_parser(kind.build(publisher.clone(), telemetry.clone()), bus.subscribe()))
        .collect();
    // The sink stops once the parsers drop their clones.
    drop(publisher);

    let lines = bus.pump(reader).await.context("Failed to read log input")?;

    let mut parsers = Vec::new();
    let mut failures = Vec::new();
    for task in tasks {
        match task.await.context("Parser task panicked")? {
            Ok(report) => parsers.push(report),
            Err(err) => failures.push(err),
        }
    }

    let sink = sink
        .await
        .context("Sink task panicked")?
        .context("Failed to write published runs")?;

    info!(
        %stream_id,
        lines,
        written = sink.accepted,
        rejected = sink.rejected,
        failed_parsers = failures.len(),
        "Log processed"
    );
    Ok(PipelineReport {
        stream_id,
        lines,
        parsers,
        failures,
        sink,
    })
}

/// Run the pipeline described by `config`
///
/// # Errors
///
/// Returns an error if a file cannot be opened or written, or if
/// [`run_stream`] fails.
pub async fn run_pipeline(config: &Config) -> Result<PipelineReport> {
    let kinds = config.selected_parsers();
    let telemetry = Arc::new(CumulativeTelemetry::new());

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &config.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let writer: Box<dyn AsyncWrite + Unpin + Send> = match &config.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(tokio::io::stdout())),
    };

    let report = run_stream(reader, writer, &kinds, telemetry.clone()).await?;
    for failure in &report.failures {
        error!("{failure}");
    }

    if let Some(path) = &config.telemetry {
        write_telemetry(path, &telemetry).await?;
    }
    Ok(report)
}

async fn write_telemetry(path: &std::path::Path, telemetry: &CumulativeTelemetry) -> Result<()> {
    let snapshot = telemetry.snapshot();
    let report = TelemetryReport {
        areas: &snapshot,
        total: telemetry.total(),
    };
    let json = serde_json::to_vec_pretty(&report).context("Failed to serialize telemetry")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write telemetry to {}", path.display()))?;
    info!(path = %path.display(), events = report.total, "Telemetry written");
    Ok(())
}
