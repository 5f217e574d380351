// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test run data model
//!
//! A [`TestRun`] is the unit a parser hands to its publisher: the individual
//! [`TestResult`]s recognized for one run, bucketed by outcome, plus the
//! [`TestRunSummary`] the runner printed at the end of it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Possible test outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestOutcome {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped by the runner
    Skipped,
    /// Test was declared but never run (pending specs)
    NotExecuted,
}

impl TestOutcome {
    /// Whether results with this outcome land in the skipped bucket
    #[must_use]
    pub fn is_skipped(self) -> bool {
        matches!(self, Self::Skipped | Self::NotExecuted)
    }
}

/// A single test case result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test name as printed by the runner
    pub name: String,
    /// Test outcome
    pub outcome: TestOutcome,
    /// Execution time, when the runner printed one
    #[serde(
        default,
        with = "duration_ms::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_time: Option<Duration>,
}

impl TestResult {
    /// Create a result without timing information
    #[must_use]
    pub fn new(name: impl Into<String>, outcome: TestOutcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            execution_time: None,
        }
    }

    /// Attach an execution time
    #[must_use]
    pub fn with_execution_time(mut self, execution_time: Option<Duration>) -> Self {
        self.execution_time = execution_time;
        self
    }
}

/// Aggregate counts printed by the runner at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunSummary {
    /// Total tests reported
    pub total_tests: usize,
    /// Tests passed
    pub total_passed: usize,
    /// Tests failed
    pub total_failed: usize,
    /// Tests skipped or pending
    pub total_skipped: usize,
    /// Wall-clock time of the run
    #[serde(with = "duration_ms")]
    pub total_execution_time: Duration,
}

impl TestRunSummary {
    /// Sum of the three outcome buckets, saturating on overflow
    #[must_use]
    pub fn bucket_total(&self) -> usize {
        self.total_passed
            .saturating_add(self.total_failed)
            .saturating_add(self.total_skipped)
    }
}

/// One reconstructed test run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    /// `<ParserName>/<Version>` of the parser that produced the run
    pub parser_uri: String,
    /// Per-parser run counter, starting at 1
    pub run_id: u64,
    /// Passed results in the order they were seen
    pub passed_tests: Vec<TestResult>,
    /// Failed results in the order they were seen
    pub failed_tests: Vec<TestResult>,
    /// Skipped and not-executed results in the order they were seen
    pub skipped_tests: Vec<TestResult>,
    /// Summary, once the runner printed one
    pub summary: Option<TestRunSummary>,
}

impl TestRun {
    /// Create an empty run
    #[must_use]
    pub fn new(parser_uri: impl Into<String>, run_id: u64) -> Self {
        Self {
            parser_uri: parser_uri.into(),
            run_id,
            passed_tests: Vec::new(),
            failed_tests: Vec::new(),
            skipped_tests: Vec::new(),
            summary: None,
        }
    }

    /// Append a result to the bucket matching its outcome
    pub fn record(&mut self, result: TestResult) {
        match result.outcome {
            TestOutcome::Passed => self.passed_tests.push(result),
            TestOutcome::Failed => self.failed_tests.push(result),
            TestOutcome::Skipped | TestOutcome::NotExecuted => self.skipped_tests.push(result),
        }
    }

    /// Summary of the run, created with zeroed counts on first access
    pub fn summary_mut(&mut self) -> &mut TestRunSummary {
        self.summary.get_or_insert_with(TestRunSummary::default)
    }

    /// Whether any individual result has been recorded
    #[must_use]
    pub fn has_results(&self) -> bool {
        !(self.passed_tests.is_empty()
            && self.failed_tests.is_empty()
            && self.skipped_tests.is_empty())
    }

    /// Whether nothing at all has been recorded for this run
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_results() && self.summary.is_none()
    }
}

/// Serde helpers storing a [`Duration`] as integer milliseconds
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as milliseconds
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    /// Deserialize from milliseconds
    ///
    /// # Errors
    ///
    /// Propagates deserializer errors.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    /// Same encoding for optional durations
    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize as milliseconds or null
        ///
        /// # Errors
        ///
        /// Propagates serializer errors.
        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(duration) => super::serialize(duration, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize from milliseconds or null
        ///
        /// # Errors
        ///
        /// Propagates deserializer errors.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_record_routes_by_outcome() {
        let mut run = TestRun::new("Test/1.0", 1);
        run.record(TestResult::new("a", TestOutcome::Passed));
        run.record(TestResult::new("b", TestOutcome::Failed));
        run.record(TestResult::new("c", TestOutcome::Skipped));
        run.record(TestResult::new("d", TestOutcome::NotExecuted));

        assert_eq!(run.passed_tests.len(), 1);
        assert_eq!(run.failed_tests.len(), 1);
        assert_eq!(run.skipped_tests.len(), 2);
        assert!(run.has_results());
    }

    #[test]
    fn test_new_run_is_empty() {
        let run = TestRun::new("Test/1.0", 7);
        assert!(run.is_empty());
        assert_eq!(run.run_id, 7);
        assert!(run.summary.is_none());
    }

    #[test]
    fn test_summary_mut_creates_zeroed_summary() {
        let mut run = TestRun::new("Test/1.0", 1);
        run.summary_mut().total_tests = 3;
        assert_eq!(
            run.summary,
            Some(TestRunSummary {
                total_tests: 3,
                ..TestRunSummary::default()
            })
        );
        assert!(!run.is_empty());
    }

    #[test]
    fn test_bucket_total_saturates() {
        let summary = TestRunSummary {
            total_passed: usize::MAX,
            total_failed: 1,
            ..TestRunSummary::default()
        };
        assert_eq!(summary.bucket_total(), usize::MAX);
    }

    #[test]
    fn test_serialize_durations_as_millis() {
        let mut run = TestRun::new("Jest/1.0", 1);
        run.record(
            TestResult::new("adds", TestOutcome::Passed)
                .with_execution_time(Some(Duration::from_millis(12))),
        );
        run.summary_mut().total_execution_time = Duration::from_millis(1500);

        let json = serde_json::to_value(&run).expect("Should serialize");
        assert_eq!(json["passed_tests"][0]["execution_time"], 12);
        assert_eq!(json["summary"]["total_execution_time"], 1500);

        let back: TestRun = serde_json::from_value(json).expect("Should deserialize");
        assert_eq!(back, run);
    }

    #[test]
    fn test_untimed_result_omits_execution_time() {
        let result = TestResult::new("pending spec", TestOutcome::NotExecuted);
        let json = serde_json::to_value(&result).expect("Should serialize");
        assert!(json.get("execution_time").is_none());
    }
}
