// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test runner grammars
//!
//! | Grammar | Runner style | States |
//! |---|---|---|
//! | [`Jasmine`] | glyph line, then numbered failures/pending | `AwaitingStart → AwaitingResults → AwaitingSummary` |
//! | [`Jest`] | per-file start markers, verbose or compact | `AwaitingStart → AwaitingResults → AwaitingStackTraces → AwaitingSummary` |
//! | [`Mocha`] | nested suites, numbered failure details after the summary | `AwaitingResults → AwaitingSummary → AwaitingStackTraces` |
//! | [`Python`] | unittest `name ... outcome` report | `AwaitingResults → AwaitingFailedDetails → AwaitingSummary` |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::{LogParser, Parser};
use crate::error::UnknownParserError;
use crate::publisher::RunPublisher;
use crate::telemetry::Telemetry;

pub mod jasmine;
pub mod jest;
pub mod mocha;
pub mod python;

pub use jasmine::Jasmine;
pub use jest::Jest;
pub use mocha::Mocha;
pub use python::Python;

/// Selector for the built-in grammars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// Jasmine reporter output
    Jasmine,
    /// Jest reporter output
    Jest,
    /// Mocha spec reporter output
    Mocha,
    /// Python unittest output
    Python,
}

impl ParserKind {
    /// Every built-in grammar
    pub const ALL: [Self; 4] = [Self::Jasmine, Self::Jest, Self::Mocha, Self::Python];

    /// Lowercase selector name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jasmine => "jasmine",
            Self::Jest => "jest",
            Self::Mocha => "mocha",
            Self::Python => "python",
        }
    }

    /// Build a boxed parser for this grammar
    #[must_use]
    pub fn build(
        self,
        publisher: Arc<dyn RunPublisher>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Box<dyn LogParser> {
        match self {
            Self::Jasmine => Box::new(Parser::<Jasmine>::new(publisher, telemetry)),
            Self::Jest => Box::new(Parser::<Jest>::new(publisher, telemetry)),
            Self::Mocha => Box::new(Parser::<Mocha>::new(publisher, telemetry)),
            Self::Python => Box::new(Parser::<Python>::new(publisher, telemetry)),
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParserKind {
    type Err = UnknownParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownParserError(s.to_string()))
    }
}
