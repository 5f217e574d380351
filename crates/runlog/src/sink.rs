// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! JSON-lines run sink
//!
//! Each accepted run is written as one [`PublishedRun`] envelope per line.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use runlog_bus::{RunSink, SinkError};
use runlog_parser::{Telemetry, TestRun};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};
use uuid::Uuid;

/// Telemetry area for sink-side validation
pub const PUBLISHER_AREA: &str = "Publisher";
/// Telemetry event: run arrived without a parser URI
pub const PARSER_URI_EMPTY: &str = "ParserUriEmpty";
/// Telemetry event: run arrived with id 0
pub const TEST_RUN_ID_ZERO: &str = "TestRunIdZero";
/// Telemetry event: run arrived without a summary
pub const SUMMARY_MISSING: &str = "SummaryMissing";

/// One line of output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRun {
    /// Identifies one invocation; shared by every run it publishes
    pub stream_id: Uuid,
    /// When the sink accepted the run
    pub published_at: DateTime<Utc>,
    /// The reconciled run
    pub run: TestRun,
}

/// Writes runs as JSON lines to any async writer
pub struct JsonLinesSink<W> {
    writer: W,
    stream_id: Uuid,
    telemetry: Arc<dyn Telemetry>,
    written: usize,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Create a sink writing to `writer`
    pub fn new(writer: W, stream_id: Uuid, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            writer,
            stream_id,
            telemetry,
            written: 0,
        }
    }

    /// Runs written so far
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    fn check(&self, run: &TestRun) -> Result<(), SinkError> {
        let problem = if run.parser_uri.is_empty() {
            Some((PARSER_URI_EMPTY, "parser URI is empty"))
        } else if run.run_id == 0 {
            Some((TEST_RUN_ID_ZERO, "run id is zero"))
        } else if run.summary.is_none() {
            Some((SUMMARY_MISSING, "run has no summary"))
        } else {
            None
        };

        match problem {
            Some((event, reason)) => {
                error!(parser = %run.parser_uri, run_id = run.run_id, "Not writing run: {reason}");
                self.telemetry.record(
                    PUBLISHER_AREA,
                    event,
                    json!({ "parser": run.parser_uri, "run_id": run.run_id }),
                );
                Err(SinkError::Rejected(reason.to_string()))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<W> RunSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn accept(&mut self, run: TestRun) -> Result<(), SinkError> {
        self.check(&run)?;

        let envelope = PublishedRun {
            stream_id: self.stream_id,
            published_at: Utc::now(),
            run,
        };
        let mut line = serde_json::to_vec(&envelope)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;

        self.written += 1;
        debug!(
            parser = %envelope.run.parser_uri,
            run_id = envelope.run.run_id,
            "Run written"
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush().await?;
        Ok(())
    }
}
