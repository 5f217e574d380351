// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Run delivery
//!
//! A [`RunSink`] is the final stop for reconciled runs. [`spawn_sink`]
//! drains a [`channel`](crate::publisher::channel) receiver into one.

use async_trait::async_trait;
use runlog_parser::TestRun;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{BusError, SinkError};

/// Destination for published runs
#[async_trait]
pub trait RunSink: Send {
    /// Deliver one run
    ///
    /// Returning [`SinkError::Rejected`] skips the run; any other error
    /// stops delivery.
    async fn accept(&mut self, run: TestRun) -> Result<(), SinkError>;

    /// Called once after the last run
    async fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Runs a sink saw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Runs the sink took
    pub accepted: usize,
    /// Runs the sink refused
    pub rejected: usize,
}

/// Drain `receiver` into `sink` on its own task
///
/// The task ends when every publisher has been dropped.
pub fn spawn_sink<S>(
    mut receiver: UnboundedReceiver<TestRun>,
    mut sink: S,
) -> JoinHandle<Result<SinkReport, BusError>>
where
    S: RunSink + 'static,
{
    tokio::spawn(async move {
        let mut report = SinkReport::default();

        while let Some(run) = receiver.recv().await {
            let (parser, run_id) = (run.parser_uri.clone(), run.run_id);
            match sink.accept(run).await {
                Ok(()) => report.accepted += 1,
                Err(SinkError::Rejected(reason)) => {
                    warn!(%parser, run_id, "Sink rejected run: {reason}");
                    report.rejected += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        sink.finish().await?;
        debug!(
            accepted = report.accepted,
            rejected = report.rejected,
            "Sink drained"
        );
        Ok(report)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::channel;
    use runlog_parser::RunPublisher;
    use similar_asserts::assert_eq;

    /// Keeps runs with an even id, refuses the rest
    #[derive(Default)]
    struct EvenSink {
        kept: Vec<u64>,
        finished: bool,
    }

    #[async_trait]
    impl RunSink for EvenSink {
        async fn accept(&mut self, run: TestRun) -> Result<(), SinkError> {
            if run.run_id % 2 == 0 {
                self.kept.push(run.run_id);
                Ok(())
            } else {
                Err(SinkError::Rejected(format!("odd run {}", run.run_id)))
            }
        }

        async fn finish(&mut self) -> Result<(), SinkError> {
            self.finished = true;
            assert_eq!(self.kept, vec![2, 4]);
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl RunSink for BrokenSink {
        async fn accept(&mut self, _run: TestRun) -> Result<(), SinkError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[tokio::test]
    async fn test_rejections_are_counted_and_skipped() {
        let (publisher, receiver) = channel();
        let handle = spawn_sink(receiver, EvenSink::default());

        for run_id in 1..=4 {
            publisher.publish(TestRun::new("Jasmine/1.0", run_id));
        }
        drop(publisher);

        let report = handle
            .await
            .expect("Task should not panic")
            .expect("Sink should succeed");
        assert_eq!(
            report,
            SinkReport {
                accepted: 2,
                rejected: 2
            }
        );
    }

    #[tokio::test]
    async fn test_write_failure_stops_delivery() {
        let (publisher, receiver) = channel();
        let handle = spawn_sink(receiver, BrokenSink);

        publisher.publish(TestRun::new("Python/1.0", 1));
        drop(publisher);

        let result = handle.await.expect("Task should not panic");
        assert!(matches!(result, Err(BusError::Sink(SinkError::Io(_)))));
    }
}
