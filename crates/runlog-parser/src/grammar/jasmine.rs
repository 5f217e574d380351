// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Jasmine console reporter grammar
//!
//! ```text
//! Started
//! .F*
//!
//! Failures:
//! 1) Calculator should divide
//!   Message: ...
//!
//! Pending:
//! 1) Calculator should round
//!
//! 3 specs, 1 failure, 1 pending spec
//! Finished in 0.012 seconds
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::engine::{
    Grammar, Rule, Session, StateTable, capture_count, capture_ordinal, capture_str,
    parse_duration,
};
use crate::error::ParseError;
use crate::model::{TestOutcome, TestResult};
use crate::reconcile::Rejection;

/// Telemetry event: failed ordinal out of sequence
pub const UNEXPECTED_FAILED_TEST_CASE_NUMBER: &str = "UnexpectedFailedTestCaseNumber";
/// Telemetry event: pending ordinal out of sequence
pub const UNEXPECTED_PENDING_TEST_CASE_NUMBER: &str = "UnexpectedPendingTestCaseNumber";
/// Telemetry event: numbered line before any `Failures:`/`Pending:` header
pub const FAILED_PENDING_WITHOUT_STARTER: &str = "FailedPendingTestCaseWithoutStarterMatch";
/// Telemetry event: run closed without a `Finished in` line
pub const TOTAL_TEST_RUN_TIME_NOT_PARSED: &str = "TotalTestRunTimeNotParsed";
/// Telemetry event: run reported suite errors
pub const SUITE_ERRORS: &str = "SuiteErrors";
/// Telemetry event: status line glyphs disagree with the summary counts
pub const STATUS_GLYPHS_SUMMARY_MISMATCH: &str = "StatusGlyphsSummaryMismatch";

static TEST_RUN_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Started$").expect("valid regex"));

static TEST_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[.F*]+$").expect("valid regex"));

static FAILURES_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Failures:$").expect("valid regex"));

static PENDING_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Pending:$").expect("valid regex"));

static FAILED_OR_PENDING_TEST_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ordinal>[1-9][0-9]*)\) (?P<name>.+)$").expect("valid regex")
});

static TESTS_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<total>0|[1-9][0-9]*) specs?, (?P<failed>[0-9]+) failures?(?:, (?P<skipped>[0-9]+) pending specs?)?",
    )
    .expect("valid regex")
});

static TEST_RUN_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Finished in (?P<time>[0-9]+(?:\.[0-9]+)?) seconds?$").expect("valid regex")
});

static SUITE_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Suite error: (?P<name>.+)$").expect("valid regex"));

/// Jasmine grammar
#[derive(Debug)]
pub struct Jasmine;

/// Jasmine parser states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JasmineState {
    /// Waiting for `Started`
    AwaitingStart,
    /// Collecting status glyphs and numbered failures/pending specs
    AwaitingResults,
    /// Summary seen, waiting for the run time
    AwaitingSummary,
}

/// Per-run Jasmine bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JasmineScratch {
    /// Ordinal of the last accepted failure
    pub last_failed_ordinal: u32,
    /// Ordinal of the last accepted pending spec
    pub last_pending_ordinal: u32,
    /// `Failures:` header is the active one
    pub failure_starter_seen: bool,
    /// `Pending:` header is the active one
    pub pending_starter_seen: bool,
    /// `.` glyphs on the status line
    pub passed_to_expect: usize,
    /// `F` glyphs on the status line
    pub failed_to_expect: usize,
    /// `*` glyphs on the status line
    pub skipped_to_expect: usize,
    /// `Suite error:` lines seen
    pub suite_errors: usize,
    /// `Finished in` line seen
    pub time_parsed: bool,
}

impl Grammar for Jasmine {
    const NAME: &'static str = "JasmineTestResultParser";
    const VERSION: &'static str = "1.0";
    type State = JasmineState;
    type Scratch = JasmineScratch;

    fn initial_state() -> JasmineState {
        JasmineState::AwaitingStart
    }

    fn table() -> StateTable<Self> {
        StateTable::new()
            .state(
                JasmineState::AwaitingStart,
                vec![Rule::new(&TEST_RUN_START, first_test_run_start)],
            )
            .state(
                JasmineState::AwaitingResults,
                vec![
                    Rule::new(&FAILED_OR_PENDING_TEST_CASE, failed_or_pending_test_case),
                    Rule::new(&TEST_STATUS, test_status),
                    Rule::new(&FAILURES_START, failures_start),
                    Rule::new(&PENDING_START, pending_start),
                    Rule::new(&TESTS_SUMMARY, tests_summary),
                    Rule::new(&TEST_RUN_START, restart),
                    Rule::new(&SUITE_ERROR, suite_error),
                ],
            )
            .state(
                JasmineState::AwaitingSummary,
                vec![
                    Rule::new(&TEST_RUN_TIME, test_run_time),
                    Rule::new(&TEST_RUN_START, restart),
                ],
            )
    }

    fn before_reconcile(session: &mut Session<Self>) -> Result<(), Rejection> {
        if session.run().summary.is_none() {
            return Ok(());
        }

        if !session.scratch.time_parsed {
            error!(parser = Self::NAME, "Total test run time was not parsed");
            session.record_event(TOTAL_TEST_RUN_TIME_NOT_PARSED);
        }

        if session.scratch.suite_errors > 0 {
            info!(
                parser = Self::NAME,
                suite_errors = session.scratch.suite_errors,
                "Suite errors found in the test run"
            );
            session.record_event(SUITE_ERRORS);
        }

        check_status_glyphs(session);
        Ok(())
    }
}

/// Compare the status line with the summary; only reported, never corrected
fn check_status_glyphs(session: &Session<Jasmine>) {
    let scratch = &session.scratch;
    let Some(summary) = session.run().summary else {
        return;
    };
    let glyphs = [
        scratch.passed_to_expect,
        scratch.failed_to_expect,
        scratch.skipped_to_expect,
    ];
    if glyphs.iter().all(|&count| count == 0) {
        return;
    }

    // Suite errors are failures without a glyph.
    let reported = [
        summary.total_passed,
        summary.total_failed.saturating_sub(scratch.suite_errors),
        summary.total_skipped,
    ];
    if glyphs != reported {
        warn!(
            parser = Jasmine::NAME,
            run_id = session.run().run_id,
            ?glyphs,
            ?reported,
            "Status line does not match the summary"
        );
        session.record_event_with(
            STATUS_GLYPHS_SUMMARY_MISMATCH,
            json!({ "glyphs": glyphs, "summary": reported }),
        );
    }
}

fn first_test_run_start(
    _: &Captures<'_>,
    session: &mut Session<Jasmine>,
) -> Result<JasmineState, ParseError> {
    session.expect_within(1, "test run status");
    info!(
        parser = Jasmine::NAME,
        line = session.line_number(),
        "Transitioned to state AwaitingResults"
    );
    Ok(JasmineState::AwaitingResults)
}

fn restart(_: &Captures<'_>, session: &mut Session<Jasmine>) -> Result<JasmineState, ParseError> {
    // A second `Started` closes whatever run was in progress.
    session.finalize_and_reset();
    Ok(JasmineState::AwaitingResults)
}

fn test_status(
    captures: &Captures<'_>,
    session: &mut Session<Jasmine>,
) -> Result<JasmineState, ParseError> {
    let glyphs = captures.get(0).map_or("", |m| m.as_str());
    session.clear_expectation();
    session.scratch.passed_to_expect = glyphs.matches('.').count();
    session.scratch.failed_to_expect = glyphs.matches('F').count();
    session.scratch.skipped_to_expect = glyphs.matches('*').count();
    Ok(JasmineState::AwaitingResults)
}

fn failures_start(
    _: &Captures<'_>,
    session: &mut Session<Jasmine>,
) -> Result<JasmineState, ParseError> {
    session.scratch.failure_starter_seen = true;
    session.scratch.pending_starter_seen = false;
    Ok(JasmineState::AwaitingResults)
}

fn pending_start(
    _: &Captures<'_>,
    session: &mut Session<Jasmine>,
) -> Result<JasmineState, ParseError> {
    session.scratch.pending_starter_seen = true;
    session.scratch.failure_starter_seen = false;
    Ok(JasmineState::AwaitingResults)
}

fn failed_or_pending_test_case(
    captures: &Captures<'_>,
    session: &mut Session<Jasmine>,
) -> Result<JasmineState, ParseError> {
    let ordinal = capture_ordinal(captures, "ordinal")?;
    let name = capture_str(captures, "name")?;

    if session.scratch.failure_starter_seen {
        let expected = session.scratch.last_failed_ordinal + 1;
        if ordinal != expected {
            error!(
                parser = Jasmine::NAME,
                line = session.line_number(),
                "Expecting failed test case with number {expected} but found {ordinal} instead"
            );
            session.record_event(UNEXPECTED_FAILED_TEST_CASE_NUMBER);
            return Ok(JasmineState::AwaitingResults);
        }
        session.scratch.last_failed_ordinal = ordinal;
        session
            .run_mut()
            .record(TestResult::new(name, TestOutcome::Failed));
        return Ok(JasmineState::AwaitingResults);
    }

    if session.scratch.pending_starter_seen {
        let expected = session.scratch.last_pending_ordinal + 1;
        if ordinal != expected {
            error!(
                parser = Jasmine::NAME,
                line = session.line_number(),
                "Expecting pending test case with number {expected} but found {ordinal} instead"
            );
            session.record_event(UNEXPECTED_PENDING_TEST_CASE_NUMBER);
            return Ok(JasmineState::AwaitingResults);
        }
        session.scratch.last_pending_ordinal = ordinal;
        session
            .run_mut()
            .record(TestResult::new(name, TestOutcome::NotExecuted));
        return Ok(JasmineState::AwaitingResults);
    }

    error!(
        parser = Jasmine::NAME,
        line = session.line_number(),
        "Encountered test case {ordinal} without a failures or pending header"
    );
    session.record_event(FAILED_PENDING_WITHOUT_STARTER);
    Ok(JasmineState::AwaitingResults)
}

fn suite_error(
    captures: &Captures<'_>,
    session: &mut Session<Jasmine>,
) -> Result<JasmineState, ParseError> {
    // Suite errors are reported as failures in the summary line.
    let name = capture_str(captures, "name")?;
    session
        .run_mut()
        .record(TestResult::new(name, TestOutcome::Failed));
    session.scratch.suite_errors += 1;
    Ok(JasmineState::AwaitingResults)
}

fn tests_summary(
    captures: &Captures<'_>,
    session: &mut Session<Jasmine>,
) -> Result<JasmineState, ParseError> {
    let total = capture_count(captures, "total")?;
    let failed = capture_count(captures, "failed")?;
    let skipped = capture_count(captures, "skipped")?;

    // Suite errors are part of the failure count but not of the spec count.
    let passed = total
        .saturating_sub(skipped)
        .saturating_sub(failed.saturating_sub(session.scratch.suite_errors));

    let summary = session.run_mut().summary_mut();
    summary.total_tests = total;
    summary.total_failed = failed;
    summary.total_skipped = skipped;
    summary.total_passed = passed;

    session.expect_within(1, "test run time");
    info!(
        parser = Jasmine::NAME,
        line = session.line_number(),
        "Transitioned to state AwaitingSummary"
    );
    Ok(JasmineState::AwaitingSummary)
}

fn test_run_time(
    captures: &Captures<'_>,
    session: &mut Session<Jasmine>,
) -> Result<JasmineState, ParseError> {
    let elapsed: Duration = parse_duration(capture_str(captures, "time")?, "s")?;
    session.run_mut().summary_mut().total_execution_time = elapsed;
    session.scratch.time_parsed = true;
    debug!(parser = Jasmine::NAME, ?elapsed, "Parsed test run time");
    session.finalize_and_reset();
    Ok(JasmineState::AwaitingStart)
}
