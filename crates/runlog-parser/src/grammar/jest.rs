// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Jest default reporter grammar
//!
//! Jest prints a `PASS`/`FAIL` marker per test file. With `--verbose` every
//! test gets its own `✓`/`✕` line; without it only failures show up, as
//! `●` stack-trace headers. Console output is printed under the same `●`
//! header with the name `Console`, which must never be taken for a test.
//!
//! ```text
//! FAIL src/sum.test.js
//!   ✓ adds (3 ms)
//!   ✕ subtracts (1 ms)
//!
//!   ● subtracts
//!
//!     expect(received).toBe(expected)
//!
//! Test Suites: 1 failed, 1 total
//! Tests:       1 failed, 1 passed, 2 total
//! Snapshots:   0 total
//! Time:        0.512s
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, error, info};

use crate::engine::{
    Grammar, Rule, Session, StateTable, capture_count, capture_duration, capture_str,
    parse_duration,
};
use crate::error::ParseError;
use crate::model::{TestOutcome, TestResult};
use crate::reconcile::Rejection;

/// Telemetry event: new file marker while the summary was still incomplete
pub const UNEXPECTED_TEST_RUN_START: &str = "UnexpectedTestRunStart";
/// Telemetry event: run closed without a usable `Time:` line
pub const TOTAL_TEST_RUN_TIME_ZERO: &str = "TotalTestRunTimeZero";

/// Name Jest gives to console output blocks
const CONSOLE_SENTINEL: &str = "Console";

static TEST_RUN_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?: FAIL |FAIL| PASS |PASS) (?P<file>.+)$").expect("valid regex")
});

static PASSED_TEST_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:  )+(?:✓|√|ΓêÜ) (?P<name>.+?)(?: \((?P<time>[0-9]+) ?(?P<unit>ms|s|m|h)\))?$",
    )
    .expect("valid regex")
});

static FAILED_TEST_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:  )+(?:✕|×|├ù) (?P<name>.+?)(?: \((?P<time>[0-9]+) ?(?P<unit>ms|s|m|h)\))?$",
    )
    .expect("valid regex")
});

static SKIPPED_TEST_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:  )+○ (?:skipped )?(?P<name>.+)$").expect("valid regex")
});

static STACK_TRACE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^  (?:●|ΓùÅ) (?P<name>.*)$").expect("valid regex"));

static SUMMARY_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Test Suites: .+$").expect("valid regex"));

static TESTS_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Tests:[ ]+(?:(?P<failed>[1-9][0-9]*) failed, )?(?:(?P<skipped>[1-9][0-9]*) skipped, )?(?:(?P<passed>[1-9][0-9]*) passed, )?(?P<total>[1-9][0-9]*) total",
    )
    .expect("valid regex")
});

static TEST_RUN_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Time:\s+(?P<time>[0-9]+(?:\.[0-9]+)?) ?(?P<unit>ms|s|m|h)").expect("valid regex")
});

static FAILED_TESTS_SUMMARY_INDICATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Summary of all failing tests$").expect("valid regex"));

/// Jest grammar
#[derive(Debug)]
pub struct Jest;

/// Jest parser states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JestState {
    /// Waiting for a `PASS`/`FAIL` file marker
    AwaitingStart,
    /// Collecting per-test lines
    AwaitingResults,
    /// Inside failure stack traces
    AwaitingStackTraces,
    /// Inside the summary block
    AwaitingSummary,
}

/// Per-run Jest bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JestScratch {
    /// Individual test lines were printed
    pub verbose: bool,
    /// `Summary of all failing tests` was printed; later `●` headers repeat
    /// failures already recorded
    pub failed_summary_seen: bool,
}

impl Grammar for Jest {
    const NAME: &'static str = "JestTestResultParser";
    const VERSION: &'static str = "1.0";
    type State = JestState;
    type Scratch = JestScratch;

    fn initial_state() -> JestState {
        JestState::AwaitingStart
    }

    fn table() -> StateTable<Self> {
        StateTable::new()
            .state(
                JestState::AwaitingStart,
                vec![Rule::new(&TEST_RUN_START, test_run_start)],
            )
            .state(
                JestState::AwaitingResults,
                vec![
                    Rule::new(&PASSED_TEST_CASE, passed_test_case),
                    Rule::new(&FAILED_TEST_CASE, failed_test_case),
                    Rule::new(&SKIPPED_TEST_CASE, skipped_test_case),
                    Rule::new(&STACK_TRACE_START, stack_trace_start),
                    Rule::new(&SUMMARY_START, summary_start),
                    Rule::new(&TEST_RUN_START, test_run_start),
                    Rule::new(&FAILED_TESTS_SUMMARY_INDICATOR, failed_tests_summary),
                ],
            )
            .state(
                JestState::AwaitingStackTraces,
                vec![
                    Rule::new(&STACK_TRACE_START, stack_trace_start),
                    Rule::new(&SUMMARY_START, summary_start),
                    Rule::new(&TEST_RUN_START, next_file_after_stack_traces),
                    Rule::new(&FAILED_TESTS_SUMMARY_INDICATOR, failed_tests_summary),
                ],
            )
            .state(
                JestState::AwaitingSummary,
                vec![
                    Rule::new(&TESTS_SUMMARY, tests_summary),
                    Rule::new(&TEST_RUN_TIME, test_run_time),
                    Rule::new(&TEST_RUN_START, unexpected_test_run_start),
                ],
            )
    }

    fn before_reconcile(session: &mut Session<Self>) -> Result<(), Rejection> {
        let Some(summary) = session.run().summary else {
            return Ok(());
        };

        if summary.total_tests > 0 && summary.total_execution_time.is_zero() {
            error!(parser = Self::NAME, "Total test run time was 0 or not encountered");
            session.record_event(TOTAL_TEST_RUN_TIME_ZERO);
        }

        if !session.scratch.verbose {
            debug!(
                parser = Self::NAME,
                "Run printed no individual passed tests, relying on the summary"
            );
        }

        Ok(())
    }
}

fn test_run_start(_: &Captures<'_>, _: &mut Session<Jest>) -> Result<JestState, ParseError> {
    Ok(JestState::AwaitingResults)
}

fn passed_test_case(
    captures: &Captures<'_>,
    session: &mut Session<Jest>,
) -> Result<JestState, ParseError> {
    let name = capture_str(captures, "name")?;
    let elapsed = capture_duration(captures, "time", "unit")?;
    session
        .run_mut()
        .record(TestResult::new(name, TestOutcome::Passed).with_execution_time(elapsed));
    session.scratch.verbose = true;
    Ok(JestState::AwaitingResults)
}

fn failed_test_case(_: &Captures<'_>, session: &mut Session<Jest>) -> Result<JestState, ParseError> {
    // Failures are recorded from their stack-trace headers, which are
    // printed in both verbose and compact mode.
    session.scratch.verbose = true;
    Ok(JestState::AwaitingResults)
}

fn skipped_test_case(
    captures: &Captures<'_>,
    session: &mut Session<Jest>,
) -> Result<JestState, ParseError> {
    let name = capture_str(captures, "name")?;
    session
        .run_mut()
        .record(TestResult::new(name, TestOutcome::Skipped));
    session.scratch.verbose = true;
    Ok(JestState::AwaitingResults)
}

fn stack_trace_start(
    captures: &Captures<'_>,
    session: &mut Session<Jest>,
) -> Result<JestState, ParseError> {
    let name = capture_str(captures, "name")?;

    if session.scratch.failed_summary_seen {
        debug!(
            parser = Jest::NAME,
            line = session.line_number(),
            "Ignoring failed test header repeated in the failing tests summary"
        );
        return Ok(JestState::AwaitingStackTraces);
    }

    if name == CONSOLE_SENTINEL {
        debug!(
            parser = Jest::NAME,
            line = session.line_number(),
            "Ignoring console output block"
        );
        return Ok(JestState::AwaitingStackTraces);
    }

    session
        .run_mut()
        .record(TestResult::new(name, TestOutcome::Failed));
    Ok(JestState::AwaitingStackTraces)
}

fn summary_start(_: &Captures<'_>, session: &mut Session<Jest>) -> Result<JestState, ParseError> {
    session.expect_within(1, "tests summary");
    info!(
        parser = Jest::NAME,
        line = session.line_number(),
        "Transitioned to state AwaitingSummary"
    );
    Ok(JestState::AwaitingSummary)
}

fn next_file_after_stack_traces(
    _: &Captures<'_>,
    session: &mut Session<Jest>,
) -> Result<JestState, ParseError> {
    if session.scratch.failed_summary_seen {
        return Ok(JestState::AwaitingStackTraces);
    }
    Ok(JestState::AwaitingResults)
}

fn failed_tests_summary(
    _: &Captures<'_>,
    session: &mut Session<Jest>,
) -> Result<JestState, ParseError> {
    session.scratch.failed_summary_seen = true;
    Ok(JestState::AwaitingStackTraces)
}

fn tests_summary(
    captures: &Captures<'_>,
    session: &mut Session<Jest>,
) -> Result<JestState, ParseError> {
    let summary = session.run_mut().summary_mut();
    summary.total_failed = capture_count(captures, "failed")?;
    summary.total_skipped = capture_count(captures, "skipped")?;
    summary.total_passed = capture_count(captures, "passed")?;
    summary.total_tests = capture_count(captures, "total")?;

    // `Snapshots:` sits between the counts and the time.
    session.expect_within(2, "test run time");
    Ok(JestState::AwaitingSummary)
}

fn test_run_time(
    captures: &Captures<'_>,
    session: &mut Session<Jest>,
) -> Result<JestState, ParseError> {
    let elapsed = parse_duration(capture_str(captures, "time")?, capture_str(captures, "unit")?)?;
    session.run_mut().summary_mut().total_execution_time = elapsed;
    session.finalize_and_reset();
    Ok(JestState::AwaitingStart)
}

fn unexpected_test_run_start(
    _: &Captures<'_>,
    session: &mut Session<Jest>,
) -> Result<JestState, ParseError> {
    error!(
        parser = Jest::NAME,
        line = session.line_number(),
        "Test run start marker encountered before the full summary"
    );
    session.record_event(UNEXPECTED_TEST_RUN_START);
    session.finalize_and_reset();
    Ok(JestState::AwaitingResults)
}
