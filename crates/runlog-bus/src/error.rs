// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for runlog-bus

use runlog_parser::ParseError;
use thiserror::Error;

/// Errors raised by a [`RunSink`](crate::sink::RunSink)
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink refused this run; delivery continues with the next one
    #[error("Run rejected by sink: {0}")]
    Rejected(String),

    /// Error writing the run out
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error serializing the run
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that end a bus task
#[derive(Debug, Error)]
pub enum BusError {
    /// A grammar action failed; the parser stopped consuming lines
    #[error("{parser} failed at line {line}: {source}")]
    Parser {
        /// Parser name
        parser: &'static str,
        /// Line that triggered the failure
        line: u64,
        /// Underlying parse error
        #[source]
        source: ParseError,
    },

    /// The run sink failed
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl SinkError {
    /// Whether delivery can carry on after this error
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
