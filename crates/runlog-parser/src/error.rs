// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for runlog-parser

use thiserror::Error;

/// Errors raised while applying a grammar action to a matched line
///
/// Any of these aborts the parser: the engine records the failure as
/// telemetry and hands it back to whoever is feeding lines.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A captured count did not fit the counter type
    #[error("Invalid number in capture '{group}': {source}")]
    InvalidNumber {
        /// Capture group name
        group: &'static str,
        /// Underlying integer parse error
        #[source]
        source: std::num::ParseIntError,
    },

    /// A captured duration could not be converted
    #[error("Invalid duration: {value} {unit}")]
    InvalidDuration {
        /// Numeric part as captured
        value: String,
        /// Unit as captured
        unit: String,
    },

    /// A pattern matched without producing a required capture group
    #[error("Missing capture group: {0}")]
    MissingCapture(&'static str),

    /// The current state has no entry in the grammar's state table
    #[error("No rules defined for state {0}")]
    UndefinedState(String),
}

/// Error returned when a parser name is not recognized
#[derive(Debug, Error)]
#[error("Unknown parser '{0}', expected one of: jasmine, jest, mocha, python")]
pub struct UnknownParserError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_number_message() {
        let source = "99999999999999999999999"
            .parse::<u32>()
            .expect_err("Should overflow");
        let err = ParseError::InvalidNumber {
            group: "total",
            source,
        };
        assert!(err.to_string().starts_with("Invalid number in capture 'total'"));
    }

    #[test]
    fn test_unknown_parser_message() {
        let err = UnknownParserError("nunit".to_string());
        assert!(err.to_string().contains("'nunit'"));
    }
}
