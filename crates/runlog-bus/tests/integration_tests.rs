// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! End-to-end tests: lines in, reconciled runs out

use std::sync::Arc;

use async_trait::async_trait;
use runlog_bus::{BusError, LineBus, RunSink, SinkError, channel, spawn_parser, spawn_sink};
use runlog_parser::{CumulativeTelemetry, ParserKind, TestRun};
use similar_asserts::assert_eq;
use tokio::sync::mpsc::UnboundedSender;

/// Sink that hands every run back to the test
struct ForwardingSink(UnboundedSender<TestRun>);

#[async_trait]
impl RunSink for ForwardingSink {
    async fn accept(&mut self, run: TestRun) -> Result<(), SinkError> {
        self.0
            .send(run)
            .map_err(|_| SinkError::Rejected("test receiver gone".to_string()))
    }
}

const MIXED_LOG: &str = "\
Started
..*

3 specs, 0 failures, 1 pending spec
Finished in 0.02 seconds
npm run test:py
test_add (calc.tests.AddTest) ... ok
test_sub (calc.tests.SubTest) ... FAIL

======================================================================
FAIL: test_sub (calc.tests.SubTest)
----------------------------------------------------------------------
Traceback (most recent call last):
AssertionError: 1 != 2

----------------------------------------------------------------------
Ran 2 tests in 0.004s

FAILED (failures=1)
";

async fn run_log(log: &str) -> (Vec<TestRun>, Vec<Result<runlog_bus::ParserReport, BusError>>) {
    let telemetry = Arc::new(CumulativeTelemetry::new());
    let (publisher, receiver) = channel();
    let (forward, mut collected) = tokio::sync::mpsc::unbounded_channel();
    let sink = spawn_sink(receiver, ForwardingSink(forward));

    let publisher = Arc::new(publisher);
    let mut bus = LineBus::new();
    let parsers: Vec<_> = ParserKind::ALL
        .into_iter()
        .map(|kind| spawn_parser(kind.build(publisher.clone(), telemetry.clone()), bus.subscribe()))
        .collect();
    drop(publisher);

    bus.pump(log.as_bytes()).await.expect("Should read log");

    let mut reports = Vec::new();
    for parser in parsers {
        reports.push(parser.await.expect("Parser task should not panic"));
    }
    sink.await
        .expect("Sink task should not panic")
        .expect("Sink should succeed");

    let mut runs = Vec::new();
    while let Some(run) = collected.recv().await {
        runs.push(run);
    }
    runs.sort_by(|a, b| (&a.parser_uri, a.run_id).cmp(&(&b.parser_uri, b.run_id)));
    (runs, reports)
}

#[tokio::test]
async fn test_mixed_log_reaches_sink() {
    let (runs, reports) = run_log(MIXED_LOG).await;

    let lines = MIXED_LOG.lines().count() as u64;
    for report in &reports {
        let report = report.as_ref().expect("No parser should fail");
        assert_eq!(report.lines, lines);
    }

    let uris: Vec<&str> = runs.iter().map(|run| run.parser_uri.as_str()).collect();
    assert_eq!(uris.len(), 2);
    assert!(uris[0].starts_with("JasmineTestResultParser/"));
    assert!(uris[1].starts_with("PythonTestResultParser/"));

    let jasmine = runs[0].summary.expect("Jasmine summary");
    assert_eq!(jasmine.total_passed, 2);
    assert_eq!(jasmine.total_skipped, 1);

    let python = runs[1].summary.expect("Python summary");
    assert_eq!(python.total_tests, 2);
    assert_eq!(python.total_failed, 1);
    assert_eq!(runs[1].failed_tests.len(), 1);
}

#[tokio::test]
async fn test_empty_input_publishes_nothing() {
    let (runs, reports) = run_log("").await;
    assert!(runs.is_empty());
    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|report| matches!(report, Ok(r) if r.lines == 0)));
}
