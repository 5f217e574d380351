// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Mocha spec reporter grammar
//!
//! ```text
//!   calculator
//!     ✓ adds
//!     ✓ multiplies (52ms)
//!     1) divides
//!     - subtracts
//!
//!   2 passing (80ms)
//!   1 pending
//!   1 failing
//!
//!   1) calculator
//!        divides:
//!      AssertionError: expected 1 to equal 2
//! ```
//!
//! The failure details printed after the summary are numbered exactly like
//! the failed test lines, so the grammar counts them off against the
//! `failing` total and closes the run once the last one has been seen.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{error, info};

use crate::engine::{
    Grammar, Rule, Session, StateTable, capture_count, capture_duration, capture_ordinal,
    capture_str,
};
use crate::error::ParseError;
use crate::model::{TestOutcome, TestResult};
use crate::reconcile::Rejection;

/// Telemetry event: failed test numbered out of sequence
pub const UNEXPECTED_FAILED_TEST_CASE_NUMBER: &str = "UnexpectedFailedTestCaseNumber";
/// Telemetry event: failure detail numbered out of sequence
pub const UNEXPECTED_FAILED_STACK_TRACE_NUMBER: &str = "UnexpectedFailedStackTraceNumber";
/// Telemetry event: passing summary without test cases since the last one
pub const SUMMARY_WITH_NO_TEST_CASES: &str = "SummaryWithNoTestCases";
/// Telemetry event: passed test while failure details were outstanding
pub const EXPECTING_STACK_TRACES_BUT_FOUND_PASSED_TEST: &str =
    "ExpectingStackTracesButFoundPassedTest";
/// Telemetry event: pending test while failure details were outstanding
pub const EXPECTING_STACK_TRACES_BUT_FOUND_PENDING_TEST: &str =
    "ExpectingStackTracesButFoundPendingTest";

static PASSED_TEST_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:  )+(?:✓|√|ΓêÜ) (?P<name>.+?)(?: \((?P<time>[0-9]+)(?P<unit>ms|s|m|h)\))?$")
        .expect("valid regex")
});

static FAILED_TEST_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:  )+(?P<ordinal>[1-9][0-9]*)\) (?P<name>.+)$").expect("valid regex")
});

static PENDING_TEST_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:  )+- (?P<name>.+)$").expect("valid regex"));

static PASSED_TESTS_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:  )+(?P<passed>0|[1-9][0-9]*) passing \((?P<time>[0-9]+)(?P<unit>ms|s|m|h)\)$")
        .expect("valid regex")
});

static FAILED_TESTS_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:  )+(?P<failed>0|[1-9][0-9]*) failing$").expect("valid regex")
});

static PENDING_TESTS_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:  )+(?P<pending>[1-9][0-9]*) pending$").expect("valid regex")
});

/// Mocha grammar
#[derive(Debug)]
pub struct Mocha;

/// Mocha parser states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MochaState {
    /// Collecting test lines
    AwaitingResults,
    /// Between the `passing` line and the `failing` line
    AwaitingSummary,
    /// Counting off failure details
    AwaitingStackTraces,
}

/// Per-run Mocha bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MochaScratch {
    /// Ordinal of the last accepted failed test or failure detail
    pub last_failed_ordinal: u32,
    /// Failure details still to be seen
    pub stack_traces_to_skip: usize,
}

impl Grammar for Mocha {
    const NAME: &'static str = "MochaTestResultParser";
    const VERSION: &'static str = "1.0";
    type State = MochaState;
    type Scratch = MochaScratch;

    fn initial_state() -> MochaState {
        MochaState::AwaitingResults
    }

    fn table() -> StateTable<Self> {
        StateTable::new()
            .state(
                MochaState::AwaitingResults,
                vec![
                    Rule::new(&PASSED_TEST_CASE, passed_test_case),
                    Rule::new(&FAILED_TEST_CASE, failed_test_case),
                    Rule::new(&PENDING_TEST_CASE, pending_test_case),
                    Rule::new(&PASSED_TESTS_SUMMARY, passed_tests_summary),
                ],
            )
            .state(
                MochaState::AwaitingSummary,
                vec![
                    Rule::new(&PENDING_TESTS_SUMMARY, pending_tests_summary),
                    Rule::new(&FAILED_TESTS_SUMMARY, failed_tests_summary),
                    Rule::new(&PASSED_TEST_CASE, passed_test_case_after_summary),
                    Rule::new(&FAILED_TEST_CASE, failed_test_case_after_summary),
                    Rule::new(&PENDING_TEST_CASE, pending_test_case_after_summary),
                    Rule::new(&PASSED_TESTS_SUMMARY, repeated_passed_tests_summary),
                ],
            )
            .state(
                MochaState::AwaitingStackTraces,
                vec![
                    Rule::new(&FAILED_TEST_CASE, stack_trace),
                    Rule::new(&PASSED_TEST_CASE, passed_test_case_in_stack_traces),
                    Rule::new(&PENDING_TEST_CASE, pending_test_case_in_stack_traces),
                    Rule::new(&PASSED_TESTS_SUMMARY, passed_tests_summary_in_stack_traces),
                ],
            )
    }

    /// Mocha never prints a grand total, so it is the sum of the buckets.
    fn before_reconcile(session: &mut Session<Self>) -> Result<(), Rejection> {
        if let Some(summary) = session.run_mut().summary.as_mut() {
            summary.total_tests = summary.bucket_total();
        }
        Ok(())
    }
}

// ============================================================================
// Shared actions
// ============================================================================

fn record(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
    outcome: TestOutcome,
) -> Result<(), ParseError> {
    let name = capture_str(captures, "name")?;
    let elapsed = capture_duration(captures, "time", "unit")?;
    session
        .run_mut()
        .record(TestResult::new(name, outcome).with_execution_time(elapsed));
    Ok(())
}

fn start_summary(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    let passed = capture_count(captures, "passed")?;
    let elapsed = capture_duration(captures, "time", "unit")?.unwrap_or_default();

    let summary = session.run_mut().summary_mut();
    summary.total_passed = passed;
    summary.total_execution_time = elapsed;

    // Failure details restart their numbering at 1.
    session.scratch.last_failed_ordinal = 0;
    session.expect_within(1, "failed/pending tests summary");
    info!(
        parser = Mocha::NAME,
        line = session.line_number(),
        "Transitioned to state AwaitingSummary"
    );
    Ok(MochaState::AwaitingSummary)
}

fn out_of_sequence(session: &Session<Mocha>, ordinal: u32, event: &'static str) {
    error!(
        parser = Mocha::NAME,
        line = session.line_number(),
        expected = session.scratch.last_failed_ordinal + 1,
        found = ordinal,
        "Failure numbered out of sequence"
    );
    session.record_event(event);
}

// ============================================================================
// AwaitingResults
// ============================================================================

fn passed_test_case(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    record(captures, session, TestOutcome::Passed)?;
    Ok(MochaState::AwaitingResults)
}

fn failed_test_case(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    let ordinal = capture_ordinal(captures, "ordinal")?;

    if ordinal != session.scratch.last_failed_ordinal + 1 {
        out_of_sequence(session, ordinal, UNEXPECTED_FAILED_TEST_CASE_NUMBER);
        if ordinal != 1 {
            return Ok(MochaState::AwaitingResults);
        }
        // Numbering restarted: most likely the next run.
        session.finalize_and_reset();
    }

    session.scratch.last_failed_ordinal += 1;
    record(captures, session, TestOutcome::Failed)?;
    Ok(MochaState::AwaitingResults)
}

fn pending_test_case(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    record(captures, session, TestOutcome::NotExecuted)?;
    Ok(MochaState::AwaitingResults)
}

fn passed_tests_summary(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    start_summary(captures, session)
}

// ============================================================================
// AwaitingSummary
// ============================================================================

fn pending_tests_summary(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    let pending = capture_count(captures, "pending")?;
    session.run_mut().summary_mut().total_skipped = pending;
    session.expect_within(1, "failed tests summary");
    Ok(MochaState::AwaitingSummary)
}

fn failed_tests_summary(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    let failed = capture_count(captures, "failed")?;
    session.run_mut().summary_mut().total_failed = failed;
    session.clear_expectation();

    if failed == 0 {
        session.finalize_and_reset();
        return Ok(MochaState::AwaitingResults);
    }

    session.scratch.stack_traces_to_skip = failed;
    info!(
        parser = Mocha::NAME,
        line = session.line_number(),
        "Transitioned to state AwaitingStackTraces"
    );
    Ok(MochaState::AwaitingStackTraces)
}

// A test line right after the summary means the run is over and the next
// one has begun.

fn passed_test_case_after_summary(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    session.finalize_and_reset();
    record(captures, session, TestOutcome::Passed)?;
    Ok(MochaState::AwaitingResults)
}

fn failed_test_case_after_summary(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    session.finalize_and_reset();

    let ordinal = capture_ordinal(captures, "ordinal")?;
    if ordinal != 1 {
        out_of_sequence(session, ordinal, UNEXPECTED_FAILED_TEST_CASE_NUMBER);
        return Ok(MochaState::AwaitingResults);
    }

    session.scratch.last_failed_ordinal += 1;
    record(captures, session, TestOutcome::Failed)?;
    Ok(MochaState::AwaitingResults)
}

fn pending_test_case_after_summary(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    session.finalize_and_reset();
    record(captures, session, TestOutcome::NotExecuted)?;
    Ok(MochaState::AwaitingResults)
}

fn repeated_passed_tests_summary(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    error!(
        parser = Mocha::NAME,
        line = session.line_number(),
        "Passing summary encountered again without any test cases in between"
    );
    session.record_event(SUMMARY_WITH_NO_TEST_CASES);
    session.finalize_and_reset();
    start_summary(captures, session)
}

// ============================================================================
// AwaitingStackTraces
// ============================================================================

fn stack_trace(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    let ordinal = capture_ordinal(captures, "ordinal")?;

    if ordinal != session.scratch.last_failed_ordinal + 1 {
        out_of_sequence(session, ordinal, UNEXPECTED_FAILED_STACK_TRACE_NUMBER);
        if ordinal != 1 {
            return Ok(MochaState::AwaitingStackTraces);
        }

        session.finalize_and_reset();
        session.scratch.last_failed_ordinal += 1;
        record(captures, session, TestOutcome::Failed)?;
        return Ok(MochaState::AwaitingResults);
    }

    session.scratch.last_failed_ordinal += 1;
    session.scratch.stack_traces_to_skip = session.scratch.stack_traces_to_skip.saturating_sub(1);

    if session.scratch.stack_traces_to_skip == 0 {
        session.finalize_and_reset();
        return Ok(MochaState::AwaitingResults);
    }

    Ok(MochaState::AwaitingStackTraces)
}

fn passed_test_case_in_stack_traces(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    if session.scratch.stack_traces_to_skip != 0 {
        error!(
            parser = Mocha::NAME,
            line = session.line_number(),
            "Expecting stack traces but found a passed test case"
        );
        session.record_event(EXPECTING_STACK_TRACES_BUT_FOUND_PASSED_TEST);
    }

    session.finalize_and_reset();
    record(captures, session, TestOutcome::Passed)?;
    Ok(MochaState::AwaitingResults)
}

fn pending_test_case_in_stack_traces(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    if session.scratch.stack_traces_to_skip != 0 {
        error!(
            parser = Mocha::NAME,
            line = session.line_number(),
            "Expecting stack traces but found a pending test case"
        );
        session.record_event(EXPECTING_STACK_TRACES_BUT_FOUND_PENDING_TEST);
    }

    session.finalize_and_reset();
    record(captures, session, TestOutcome::NotExecuted)?;
    Ok(MochaState::AwaitingResults)
}

fn passed_tests_summary_in_stack_traces(
    captures: &Captures<'_>,
    session: &mut Session<Mocha>,
) -> Result<MochaState, ParseError> {
    if session.scratch.stack_traces_to_skip != 0 {
        error!(
            parser = Mocha::NAME,
            line = session.line_number(),
            "Expecting stack traces but found a passing summary"
        );
        session.record_event(SUMMARY_WITH_NO_TEST_CASES);
    }

    session.finalize_and_reset();
    start_summary(captures, session)
}
