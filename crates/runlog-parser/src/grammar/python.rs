// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Python unittest text runner grammar
//!
//! ```text
//! test_add (tests.test_calc.CalcTest) ... ok
//! test_sub (tests.test_calc.CalcTest) ... skipped 'not ready'
//! test_div (tests.test_calc.CalcTest) ... ERROR
//!
//! ======================================================================
//! ERROR: test_div (tests.test_calc.CalcTest)
//! ----------------------------------------------------------------------
//! Traceback (most recent call last):
//! ZeroDivisionError: division by zero
//!
//! ----------------------------------------------------------------------
//! Ran 3 tests in 0.012s
//!
//! FAILED (errors=1, skipped=1)
//! ```
//!
//! Output printed by a test lands between its `...` and its outcome, so a
//! result line whose outcome is not recognised is held back until a bare
//! `ok` line settles it.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, error, info};

use crate::engine::{Grammar, Rule, Session, StateTable, capture_count, capture_str, parse_duration};
use crate::error::ParseError;
use crate::model::{TestOutcome, TestResult};
use crate::reconcile::Rejection;

/// Telemetry event: a new result line appeared while failure details or
/// the summary were expected
pub const SUMMARY_OR_FAILED_TESTS_NOT_FOUND: &str = "SummaryOrFailedTestsNotFound";

const OUTCOME_SUMMARY: &str = "test outcome summary";

static TEST_RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>\S.*?) \.\.\.(?: (?P<outcome>.*))?$").expect("valid regex")
});

static PASSED_OUTCOME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ok$").expect("valid regex"));

static SKIPPED_OUTCOME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^skipped\b").expect("valid regex"));

static FAILED_RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:FAIL|ERROR): (?P<name>.+)$").expect("valid regex")
});

static TEST_COUNT_AND_TIME_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Ran (?P<total>[0-9]+) tests? in (?P<time>[0-9]+(?:\.[0-9]+)?)s$")
        .expect("valid regex")
});

static TEST_OUTCOME_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<outcome>OK|FAILED)(?: \((?P<details>.*)\))?$").expect("valid regex")
});

static SUMMARY_FAILURES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|, )failures=(?P<failed>[0-9]+)").expect("valid regex")
});

static SUMMARY_ERRORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|, )errors=(?P<errors>[0-9]+)").expect("valid regex"));

static SUMMARY_SKIPPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|, )skipped=(?P<skipped>[0-9]+)").expect("valid regex")
});

/// Python unittest grammar
#[derive(Debug)]
pub struct Python;

/// Python parser states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PythonState {
    /// Collecting `name ... outcome` lines
    AwaitingResults,
    /// Inside the `FAIL:`/`ERROR:` detail blocks
    AwaitingFailedDetails,
    /// `Ran N tests` seen, waiting for `OK`/`FAILED`
    AwaitingSummary,
}

/// Per-run unittest bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PythonScratch {
    /// Result whose outcome was swallowed by test output
    pub partial: Option<String>,
    /// The `OK`/`FAILED` line was seen
    pub outcome_seen: bool,
}

impl Grammar for Python {
    const NAME: &'static str = "PythonTestResultParser";
    const VERSION: &'static str = "1.0";
    type State = PythonState;
    type Scratch = PythonScratch;

    fn initial_state() -> PythonState {
        PythonState::AwaitingResults
    }

    fn table() -> StateTable<Self> {
        StateTable::new()
            .state(
                PythonState::AwaitingResults,
                vec![
                    Rule::new(&TEST_RESULT, test_result),
                    Rule::new(&PASSED_OUTCOME, partial_result_passed),
                    Rule::new(&FAILED_RESULT, first_failed_result),
                    Rule::new(&TEST_COUNT_AND_TIME_SUMMARY, test_count_and_time_summary),
                ],
            )
            .state(
                PythonState::AwaitingFailedDetails,
                vec![
                    Rule::new(&FAILED_RESULT, failed_result),
                    Rule::new(&TEST_COUNT_AND_TIME_SUMMARY, test_count_and_time_summary),
                    Rule::new(&TEST_RESULT, unexpected_test_result),
                ],
            )
            .state(
                PythonState::AwaitingSummary,
                vec![
                    Rule::new(&TEST_OUTCOME_SUMMARY, test_outcome_summary),
                    Rule::new(&FAILED_RESULT, failed_result_without_outcome),
                    Rule::new(&TEST_COUNT_AND_TIME_SUMMARY, summary_without_outcome),
                    Rule::new(&TEST_RESULT, unexpected_test_result),
                ],
            )
    }

    fn before_reconcile(session: &mut Session<Self>) -> Result<(), Rejection> {
        if session.run().summary.is_some() && !session.scratch.outcome_seen {
            error!(
                parser = Self::NAME,
                run_id = session.run().run_id,
                "Test count summary was seen but the outcome summary never followed"
            );
            return Err(Rejection::Incomplete(OUTCOME_SUMMARY));
        }
        Ok(())
    }
}

fn test_result(
    captures: &Captures<'_>,
    session: &mut Session<Python>,
) -> Result<PythonState, ParseError> {
    session.scratch.partial = None;

    let name = capture_str(captures, "name")?.trim();
    let outcome = captures.name("outcome").map_or("", |m| m.as_str().trim());

    if PASSED_OUTCOME.is_match(outcome) {
        session
            .run_mut()
            .record(TestResult::new(name, TestOutcome::Passed));
    } else if SKIPPED_OUTCOME.is_match(outcome) {
        session
            .run_mut()
            .record(TestResult::new(name, TestOutcome::Skipped));
    } else {
        // Failures are taken from the FAIL:/ERROR: blocks instead.
        debug!(
            parser = Python::NAME,
            line = session.line_number(),
            outcome,
            "Holding back result with unrecognised outcome"
        );
        session.scratch.partial = Some(name.to_string());
    }

    Ok(PythonState::AwaitingResults)
}

fn partial_result_passed(
    _: &Captures<'_>,
    session: &mut Session<Python>,
) -> Result<PythonState, ParseError> {
    if let Some(name) = session.scratch.partial.take() {
        session
            .run_mut()
            .record(TestResult::new(name, TestOutcome::Passed));
    }
    Ok(PythonState::AwaitingResults)
}

fn first_failed_result(
    captures: &Captures<'_>,
    session: &mut Session<Python>,
) -> Result<PythonState, ParseError> {
    session.scratch.partial = None;
    failed_result(captures, session)
}

fn failed_result(
    captures: &Captures<'_>,
    session: &mut Session<Python>,
) -> Result<PythonState, ParseError> {
    let name = capture_str(captures, "name")?.trim();
    session
        .run_mut()
        .record(TestResult::new(name, TestOutcome::Failed));
    Ok(PythonState::AwaitingFailedDetails)
}

fn test_count_and_time_summary(
    captures: &Captures<'_>,
    session: &mut Session<Python>,
) -> Result<PythonState, ParseError> {
    let total = capture_count(captures, "total")?;
    let elapsed = parse_duration(capture_str(captures, "time")?, "s")?;

    session.scratch.partial = None;
    let summary = session.run_mut().summary_mut();
    summary.total_tests = total;
    summary.total_execution_time = elapsed;

    session.expect_within(1, OUTCOME_SUMMARY);
    info!(
        parser = Python::NAME,
        line = session.line_number(),
        total,
        "Test count summary encountered"
    );
    Ok(PythonState::AwaitingSummary)
}

fn unexpected_test_result(
    captures: &Captures<'_>,
    session: &mut Session<Python>,
) -> Result<PythonState, ParseError> {
    error!(
        parser = Python::NAME,
        line = session.line_number(),
        "Expecting failed results or summary but found a new test result"
    );
    session.record_event(SUMMARY_OR_FAILED_TESTS_NOT_FOUND);
    session.finalize_and_reset();
    test_result(captures, session)
}

/// The next run started before the outcome line; close this one first
fn failed_result_without_outcome(
    captures: &Captures<'_>,
    session: &mut Session<Python>,
) -> Result<PythonState, ParseError> {
    info!(
        parser = Python::NAME,
        line = session.line_number(),
        "Failed result found while expecting the outcome summary"
    );
    session.finalize_and_reset();
    first_failed_result(captures, session)
}

fn summary_without_outcome(
    captures: &Captures<'_>,
    session: &mut Session<Python>,
) -> Result<PythonState, ParseError> {
    info!(
        parser = Python::NAME,
        line = session.line_number(),
        "Test count summary found while expecting the outcome summary"
    );
    session.finalize_and_reset();
    test_count_and_time_summary(captures, session)
}

fn test_outcome_summary(
    captures: &Captures<'_>,
    session: &mut Session<Python>,
) -> Result<PythonState, ParseError> {
    let details = captures.name("details").map_or("", |m| m.as_str());

    let mut failed = 0;
    if let Some(failures) = SUMMARY_FAILURES.captures(details) {
        failed = capture_count(&failures, "failed")?;
    }
    // Errors share the failed bucket.
    if let Some(errors) = SUMMARY_ERRORS.captures(details) {
        failed = failed.saturating_add(capture_count(&errors, "errors")?);
    }
    let skipped = match SUMMARY_SKIPPED.captures(details) {
        Some(skipped) => capture_count(&skipped, "skipped")?,
        None => 0,
    };

    let summary = session.run_mut().summary_mut();
    summary.total_failed = failed;
    summary.total_skipped = skipped;
    summary.total_passed = summary
        .total_tests
        .saturating_sub(failed.saturating_add(skipped));

    session.scratch.outcome_seen = true;
    session.finalize_and_reset();
    Ok(PythonState::AwaitingResults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Parser;
    use crate::publisher::CollectingPublisher;
    use crate::telemetry::CumulativeTelemetry;
    use similar_asserts::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn parser() -> (Parser<Python>, Arc<CollectingPublisher>, Arc<CumulativeTelemetry>) {
        let publisher = Arc::new(CollectingPublisher::new());
        let telemetry = Arc::new(CumulativeTelemetry::new());
        let parser = Parser::<Python>::new(publisher.clone(), telemetry.clone());
        (parser, publisher, telemetry)
    }

    fn feed(parser: &mut Parser<Python>, lines: &[&str]) {
        for (index, line) in lines.iter().enumerate() {
            parser
                .process_line(line, index as u64 + 1)
                .expect("Should parse");
        }
    }

    fn names(results: &[TestResult]) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_failed_run() {
        let (mut parser, publisher, telemetry) = parser();
        feed(
            &mut parser,
            &[
                "test_add (tests.test_calc.CalcTest) ... ok",
                "test_sub (tests.test_calc.CalcTest) ... skipped 'not ready'",
                "test_mul (tests.test_calc.CalcTest) ... FAIL",
                "test_div (tests.test_calc.CalcTest) ... ERROR",
                "",
                "======================================================================",
                "ERROR: test_div (tests.test_calc.CalcTest)",
                "----------------------------------------------------------------------",
                "Traceback (most recent call last):",
                "  File \"tests/test_calc.py\", line 20, in test_div",
                "ZeroDivisionError: division by zero",
                "",
                "======================================================================",
                "FAIL: test_mul (tests.test_calc.CalcTest)",
                "----------------------------------------------------------------------",
                "AssertionError: 6 != 5",
                "",
                "----------------------------------------------------------------------",
                "Ran 4 tests in 0.250s",
                "",
                "FAILED (failures=1, errors=1, skipped=1)",
            ],
        );

        let runs = publisher.runs();
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.parser_uri, "PythonTestResultParser/1.0");
        assert_eq!(
            names(&run.passed_tests),
            vec!["test_add (tests.test_calc.CalcTest)"]
        );
        assert_eq!(
            names(&run.failed_tests),
            vec![
                "test_div (tests.test_calc.CalcTest)",
                "test_mul (tests.test_calc.CalcTest)",
            ]
        );
        assert_eq!(run.skipped_tests[0].outcome, TestOutcome::Skipped);

        let summary = run.summary.expect("Should have summary");
        assert_eq!(summary.total_tests, 4);
        assert_eq!(summary.total_passed, 1);
        assert_eq!(summary.total_failed, 2);
        assert_eq!(summary.total_skipped, 1);
        assert_eq!(summary.total_execution_time, Duration::from_millis(250));
        assert_eq!(telemetry.total(), 1);
    }

    #[test]
    fn test_output_between_name_and_outcome() {
        let (mut parser, publisher, _telemetry) = parser();
        feed(
            &mut parser,
            &[
                "test_a (t.T) ... ok",
                "test_b (t.T) ... printing from the test",
                "ok",
                "----------------------------------------------------------------------",
                "Ran 2 tests in 0.5s",
                "",
                "OK",
            ],
        );

        let runs = publisher.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(
            names(&runs[0].passed_tests),
            vec!["test_a (t.T)", "test_b (t.T)"]
        );
        assert_eq!(runs[0].summary.map(|s| s.total_passed), Some(2));
    }

    #[test]
    fn test_bare_ok_without_partial_is_harmless() {
        let (mut parser, _publisher, _telemetry) = parser();
        feed(&mut parser, &["ok"]);
        assert!(parser.session().is_pristine());
    }

    #[test]
    fn test_missing_outcome_line_rejects_run() {
        let (mut parser, publisher, telemetry) = parser();
        feed(
            &mut parser,
            &["test_a (t.T) ... ok", "Ran 1 test in 0.1s", "Something else"],
        );

        assert!(publisher.is_empty());
        assert_eq!(
            telemetry.count(
                Python::NAME,
                Rejection::Incomplete(OUTCOME_SUMMARY).event_name()
            ),
            1
        );
        assert!(parser.session().is_pristine());
    }

    #[test]
    fn test_new_result_while_expecting_failures() {
        let (mut parser, publisher, telemetry) = parser();
        feed(
            &mut parser,
            &[
                "test_a (t.T) ... FAIL",
                "FAIL: test_a (t.T)",
                "test_b (t.T) ... ok",
            ],
        );

        assert!(publisher.is_empty());
        assert_eq!(
            telemetry.count(Python::NAME, SUMMARY_OR_FAILED_TESTS_NOT_FOUND),
            1
        );
        assert_eq!(
            telemetry.count(Python::NAME, Rejection::TestCasesWithoutSummary.event_name()),
            1
        );
        assert_eq!(parser.session().run().run_id, 2);
        assert_eq!(names(&parser.session().run().passed_tests), vec!["test_b (t.T)"]);
    }

    #[test]
    fn test_zero_tests_ran_is_rejected() {
        let (mut parser, publisher, telemetry) = parser();
        feed(&mut parser, &["Ran 0 tests in 0.000s", "", "OK"]);

        assert!(publisher.is_empty());
        assert_eq!(
            telemetry.count(Python::NAME, Rejection::ZeroTotalTests.event_name()),
            1
        );
    }

    #[test]
    fn test_outcome_summary_counts() {
        let (mut parser, publisher, _telemetry) = parser();
        feed(&mut parser, &["Ran 5 tests in 1.000s", "OK (skipped=3)"]);

        let runs = publisher.runs();
        let summary = runs[0].summary.expect("Should have summary");
        assert_eq!(summary.total_skipped, 3);
        assert_eq!(summary.total_passed, 2);
        assert_eq!(summary.total_failed, 0);
    }

    #[test]
    fn test_next_run_starts_before_outcome_line() {
        let (mut parser, publisher, telemetry) = parser();
        feed(
            &mut parser,
            &[
                "Ran 2 tests in 0.1s",
                "ERROR: test_b (t.T)",
                "Ran 1 test in 0.1s",
                "FAILED (errors=1)",
            ],
        );

        let runs = publisher.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, 2);
        assert_eq!(names(&runs[0].failed_tests), vec!["test_b (t.T)"]);
        assert_eq!(runs[0].summary.map(|s| s.total_failed), Some(1));
        assert_eq!(
            telemetry.count(
                Python::NAME,
                Rejection::Incomplete(OUTCOME_SUMMARY).event_name()
            ),
            1
        );
    }

    #[test]
    fn test_repeated_count_summary_starts_new_run() {
        let (mut parser, publisher, _telemetry) = parser();
        feed(
            &mut parser,
            &["Ran 3 tests in 0.1s", "Ran 2 tests in 0.2s", "OK"],
        );

        let runs = publisher.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, 2);
        assert_eq!(runs[0].summary.map(|s| s.total_passed), Some(2));
    }

    #[test]
    fn test_huge_outcome_counts_saturate() {
        let (mut parser, publisher, telemetry) = parser();
        parser
            .process_line("Ran 1 test in 0.1s", 1)
            .expect("Should parse");
        let outcome = format!("FAILED (failures={}, errors=1, skipped=1)", usize::MAX);
        parser.process_line(&outcome, 2).expect("Should parse");

        assert!(publisher.is_empty());
        assert_eq!(
            telemetry.count(Python::NAME, Rejection::InconsistentSummary.event_name()),
            1
        );
        assert!(parser.session().is_pristine());
    }

    #[test]
    fn test_expected_failures_are_not_counted_as_failures() {
        let captures = TEST_OUTCOME_SUMMARY
            .captures("OK (expected failures=2)")
            .expect("Should match");
        let details = captures.name("details").map_or("", |m| m.as_str());
        assert!(SUMMARY_FAILURES.captures(details).is_none());
    }
}
