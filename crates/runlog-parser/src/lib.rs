// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! runlog-parser: Streaming test-runner log parsers
//!
//! This library crate turns the console output of test runners into
//! structured test runs, one line at a time. Each supported runner is a
//! [`Grammar`]: a hand-written state table of regex rules driven by the
//! generic [`Parser`] engine. Finished runs are reconciled against their
//! summary lines and handed to a [`RunPublisher`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use runlog_parser::grammar::ParserKind;
//! use runlog_parser::{CollectingPublisher, CumulativeTelemetry};
//!
//! let publisher = Arc::new(CollectingPublisher::new());
//! let telemetry = Arc::new(CumulativeTelemetry::new());
//! let mut parser = ParserKind::Jest.build(publisher.clone(), telemetry.clone());
//!
//! let log = "PASS src/sum.test.js\n  ✓ adds (3 ms)\nTest Suites: 1 passed, 1 total\n\
//!            Tests:       1 passed, 1 total\nSnapshots:   0 total\nTime:        0.5s";
//! for (index, line) in log.lines().enumerate() {
//!     parser.process_line(line, index as u64 + 1).unwrap();
//! }
//! parser.complete();
//!
//! for run in publisher.runs() {
//!     println!("{} run {}: {:?}", run.parser_uri, run.run_id, run.summary);
//! }
//! ```

pub mod engine;
pub mod error;
pub mod grammar;
pub mod model;
pub mod publisher;
pub mod reconcile;
pub mod telemetry;

pub use engine::{Expectation, Grammar, LogParser, Parser, Rule, Session, StateTable};
pub use error::{ParseError, UnknownParserError};
pub use grammar::ParserKind;
pub use model::{TestOutcome, TestResult, TestRun, TestRunSummary};
pub use publisher::{CollectingPublisher, RunPublisher};
pub use reconcile::{Rejection, reconcile};
pub use telemetry::{CumulativeTelemetry, NoopTelemetry, Telemetry, TelemetryReport};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::engine::{LogParser, Parser};
    pub use crate::grammar::ParserKind;
    pub use crate::model::{TestOutcome, TestResult, TestRun, TestRunSummary};
    pub use crate::publisher::RunPublisher;
    pub use crate::telemetry::Telemetry;
}
