// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Run reconciliation
//!
//! Cross-checks the individually matched results of a finished run against
//! its summary line before the run is published. The summary always wins:
//! a detail collection whose length disagrees with the summary is emptied,
//! and a run whose summary is missing or self-contradictory is rejected.

use std::fmt;

use serde_json::json;
use tracing::warn;

use crate::model::{TestResult, TestRun};
use crate::telemetry::{RECONCILIATION_AREA, Telemetry};

/// Telemetry event for a passed-bucket mismatch
pub const PASSED_SUMMARY_MISMATCH: &str = "PassedSummaryMismatch";
/// Telemetry event for a failed-bucket mismatch
pub const FAILED_SUMMARY_MISMATCH: &str = "FailedSummaryMismatch";
/// Telemetry event for a skipped-bucket mismatch
pub const SKIPPED_SUMMARY_MISMATCH: &str = "SkippedSummaryMismatch";

/// Why a finished run was dropped instead of published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Neither results nor a summary were seen
    NoSummary,
    /// Results were matched but no summary followed them
    TestCasesWithoutSummary,
    /// Summary total is smaller than the sum of its buckets
    InconsistentSummary,
    /// Summary reported zero tests
    ZeroTotalTests,
    /// Grammar-specific gate: a required summary line never arrived
    Incomplete(&'static str),
}

impl Rejection {
    /// Telemetry event name for this rejection
    #[must_use]
    pub fn event_name(self) -> &'static str {
        match self {
            Self::NoSummary => "NoSummaryEncounteredBeforePublish",
            Self::TestCasesWithoutSummary => "TestCasesFoundButNoSummary",
            Self::InconsistentSummary => "TotalTestsLessThanOutcomeSum",
            Self::ZeroTotalTests => "TotalTestsZero",
            Self::Incomplete(_) => "IncompleteSummary",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSummary => f.write_str("no evidence of any summary seen"),
            Self::TestCasesWithoutSummary => {
                f.write_str("test cases were encountered but no summary was encountered")
            }
            Self::InconsistentSummary => {
                f.write_str("summary total is less than the sum of passed, failed and skipped")
            }
            Self::ZeroTotalTests => f.write_str("summary reported zero total tests"),
            Self::Incomplete(missing) => write!(f, "{missing} was never encountered"),
        }
    }
}

/// Reconcile a finished run against its summary
///
/// Returns the run, possibly with some detail collections emptied, or the
/// reason it must not be published. Every emptied collection is reported
/// to `telemetry` under [`RECONCILIATION_AREA`].
///
/// # Errors
///
/// Returns a [`Rejection`] when the summary is absent, reports fewer tests
/// than its buckets add up to, or reports zero tests.
pub fn reconcile(mut run: TestRun, telemetry: &dyn Telemetry) -> Result<TestRun, Rejection> {
    let Some(summary) = run.summary else {
        return Err(if run.has_results() {
            Rejection::TestCasesWithoutSummary
        } else {
            Rejection::NoSummary
        });
    };

    if summary.total_tests < summary.bucket_total() {
        return Err(Rejection::InconsistentSummary);
    }

    if summary.total_tests == 0 {
        return Err(Rejection::ZeroTotalTests);
    }

    let run_id = run.run_id;
    let parser = run.parser_uri.clone();
    let buckets = [
        (&mut run.passed_tests, summary.total_passed, PASSED_SUMMARY_MISMATCH),
        (&mut run.failed_tests, summary.total_failed, FAILED_SUMMARY_MISMATCH),
        (&mut run.skipped_tests, summary.total_skipped, SKIPPED_SUMMARY_MISMATCH),
    ];

    for (details, expected, event) in buckets {
        discard_on_mismatch(details, expected, event, &parser, run_id, telemetry);
    }

    Ok(run)
}

fn discard_on_mismatch(
    details: &mut Vec<TestResult>,
    expected: usize,
    event: &'static str,
    parser: &str,
    run_id: u64,
    telemetry: &dyn Telemetry,
) {
    if details.len() == expected {
        return;
    }

    warn!(
        parser,
        run_id,
        summary = expected,
        matched = details.len(),
        "{event}: discarding matched results in favour of the summary"
    );
    telemetry.record(
        RECONCILIATION_AREA,
        event,
        json!({
            "parser": parser,
            "run_id": run_id,
            "summary": expected,
            "matched": details.len(),
        }),
    );
    details.clear();
}
