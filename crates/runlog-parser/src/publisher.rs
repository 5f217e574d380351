// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Run publishing interface

use std::sync::{Mutex, PoisonError};

use crate::model::TestRun;

/// Receives reconciled runs from a parser
///
/// Publishing is one-way: implementations must not block the caller and
/// have no way to report failure back to the parser.
pub trait RunPublisher: Send + Sync {
    /// Submit a run for publishing
    fn publish(&self, run: TestRun);
}

/// Publisher that keeps every run in memory
#[derive(Debug, Default)]
pub struct CollectingPublisher {
    runs: Mutex<Vec<TestRun>>,
}

impl CollectingPublisher {
    /// Create an empty publisher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the runs published so far
    #[must_use]
    pub fn runs(&self) -> Vec<TestRun> {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of runs published so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been published
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return the runs published so far
    pub fn take(&self) -> Vec<TestRun> {
        std::mem::take(&mut *self.runs.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl RunPublisher for CollectingPublisher {
    fn publish(&self, run: TestRun) {
        self.runs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_publisher_take() {
        let publisher = CollectingPublisher::new();
        assert!(publisher.is_empty());

        publisher.publish(TestRun::new("A/1.0", 1));
        publisher.publish(TestRun::new("A/1.0", 2));
        assert_eq!(publisher.len(), 2);

        let runs = publisher.take();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].run_id, 2);
        assert!(publisher.is_empty());
    }
}
