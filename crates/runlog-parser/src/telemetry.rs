// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Telemetry collection
//!
//! Parsers report anomalies (out-of-order ordinals, dropped runs, summary
//! mismatches) as named events grouped by area. Recording is a plain
//! synchronous call that can never fail back into the parser.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;

/// Area used by run reconciliation
pub const RECONCILIATION_AREA: &str = "RunReconciliation";

/// Event recorded once per parser at construction
pub const INITIALIZE: &str = "Initialize";

/// Event recorded when a grammar action fails
pub const EXCEPTIONS: &str = "Exceptions";

/// Sink for parser telemetry events
pub trait Telemetry: Send + Sync {
    /// Record one occurrence of `event` under `area`
    fn record(&self, area: &str, event: &str, payload: Value);
}

/// Telemetry sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _area: &str, _event: &str, _payload: Value) {}
}

/// Point-in-time copy of everything a [`CumulativeTelemetry`] has seen
pub type TelemetrySnapshot = BTreeMap<String, BTreeMap<String, Vec<Value>>>;

/// In-memory telemetry that accumulates payloads per area and event
#[derive(Debug, Default)]
pub struct CumulativeTelemetry {
    events: Mutex<TelemetrySnapshot>,
}

impl CumulativeTelemetry {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `event` was recorded under `area`
    #[must_use]
    pub fn count(&self, area: &str, event: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(area)
            .and_then(|events| events.get(event))
            .map_or(0, Vec::len)
    }

    /// Payloads recorded for `event` under `area`, oldest first
    #[must_use]
    pub fn payloads(&self, area: &str, event: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(area)
            .and_then(|events| events.get(event))
            .cloned()
            .unwrap_or_default()
    }

    /// Copy of all recorded events
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total number of events across all areas
    #[must_use]
    pub fn total(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }
}

impl Telemetry for CumulativeTelemetry {
    fn record(&self, area: &str, event: &str, payload: Value) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(area.to_string())
            .or_default()
            .entry(event.to_string())
            .or_default()
            .push(payload);
    }
}

/// Serializable view of a snapshot, used when dumping telemetry to disk
#[derive(Debug, Serialize)]
pub struct TelemetryReport<'a> {
    /// Events grouped by area then event name
    pub areas: &'a TelemetrySnapshot,
    /// Total number of events
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use similar_asserts::assert_eq;

    #[test]
    fn test_cumulative_counts_per_event() {
        let telemetry = CumulativeTelemetry::new();
        telemetry.record("Jasmine", "TotalTestsZero", json!({"run_id": 1}));
        telemetry.record("Jasmine", "TotalTestsZero", json!({"run_id": 2}));
        telemetry.record("Jest", "TotalTestsZero", json!({"run_id": 1}));

        assert_eq!(telemetry.count("Jasmine", "TotalTestsZero"), 2);
        assert_eq!(telemetry.count("Jest", "TotalTestsZero"), 1);
        assert_eq!(telemetry.count("Mocha", "TotalTestsZero"), 0);
        assert_eq!(telemetry.total(), 3);
        assert_eq!(
            telemetry.payloads("Jasmine", "TotalTestsZero"),
            vec![json!({"run_id": 1}), json!({"run_id": 2})]
        );
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let telemetry = CumulativeTelemetry::new();
        telemetry.record("b", "x", json!(true));
        telemetry.record("a", "y", json!(true));

        let snapshot = telemetry.snapshot();
        let areas: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(areas, vec!["a", "b"]);
    }

    #[test]
    fn test_noop_accepts_anything() {
        NoopTelemetry.record("", "", Value::Null);
    }
}
