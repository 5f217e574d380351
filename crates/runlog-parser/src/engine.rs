// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Pattern/action parsing engine
//!
//! A grammar is a table mapping each of its states to an ordered list of
//! [`Rule`]s. [`Parser`] feeds every line to the rules of the current state,
//! first match wins, and the matching action decides the next state. A
//! bounded expectation lets an action demand that some follow-up line
//! matches within the next few lines; when it does not, the run is closed
//! by [`Session::finalize_and_reset`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use runlog_parser::grammar::Jasmine;
//! use runlog_parser::{CollectingPublisher, NoopTelemetry, Parser};
//!
//! let publisher = Arc::new(CollectingPublisher::new());
//! let mut parser = Parser::<Jasmine>::new(publisher.clone(), Arc::new(NoopTelemetry));
//!
//! for (index, line) in ["Started", ".", "1 spec, 0 failures", "Finished in 0.1 seconds"]
//!     .iter()
//!     .enumerate()
//! {
//!     parser.process_line(line, index as u64 + 1).unwrap();
//! }
//! parser.complete();
//! assert_eq!(publisher.len(), 1);
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use regex::{Captures, Regex};
use serde_json::{Value, json};
use tracing::{debug, error, info, trace, warn};

use crate::error::ParseError;
use crate::model::TestRun;
use crate::publisher::RunPublisher;
use crate::reconcile::{Rejection, reconcile};
use crate::telemetry::{EXCEPTIONS, INITIALIZE, Telemetry};

// ============================================================================
// Grammar definition
// ============================================================================

/// One test runner's console output format
pub trait Grammar: Sized + 'static {
    /// Parser name, also used as the telemetry area
    const NAME: &'static str;
    /// Parser version
    const VERSION: &'static str;

    /// Named states of the grammar
    type State: Copy + Eq + Hash + Debug + Send + 'static;
    /// Grammar-specific bookkeeping, reset with every run
    type Scratch: Default + Clone + PartialEq + Debug + Send;

    /// State every run starts in
    fn initial_state() -> Self::State;

    /// Rules for every state
    fn table() -> StateTable<Self>;

    /// Hook run at the start of every finalize, before reconciliation
    ///
    /// Grammars use it for their own summary arithmetic and diagnostics,
    /// and may veto publishing.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when the run must be dropped.
    fn before_reconcile(_session: &mut Session<Self>) -> Result<(), Rejection> {
        Ok(())
    }

    /// `<Name>/<Version>` identity stamped on every run
    #[must_use]
    fn parser_uri() -> String {
        format!("{}/{}", Self::NAME, Self::VERSION)
    }
}

/// Action run when a rule's pattern matches; returns the next state
pub type Action<G> =
    fn(&Captures<'_>, &mut Session<G>) -> Result<<G as Grammar>::State, ParseError>;

/// A pattern and the action bound to it
pub struct Rule<G: Grammar> {
    pattern: &'static Regex,
    action: Action<G>,
}

impl<G: Grammar> Rule<G> {
    /// Bind `action` to `pattern`
    #[must_use]
    pub fn new(pattern: &'static Regex, action: Action<G>) -> Self {
        Self { pattern, action }
    }

    /// Pattern this rule matches
    #[must_use]
    pub fn pattern(&self) -> &'static Regex {
        self.pattern
    }
}

impl<G: Grammar> Debug for Rule<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Ordered rules per state
pub struct StateTable<G: Grammar> {
    states: HashMap<G::State, Vec<Rule<G>>>,
}

impl<G: Grammar> StateTable<G> {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    /// Set the rules for `state`, in match priority order
    #[must_use]
    pub fn state(mut self, state: G::State, rules: Vec<Rule<G>>) -> Self {
        self.states.insert(state, rules);
        self
    }

    /// Rules for `state`, if the table defines it
    #[must_use]
    pub fn rules(&self, state: G::State) -> Option<&[Rule<G>]> {
        self.states.get(&state).map(Vec::as_slice)
    }
}

impl<G: Grammar> Default for StateTable<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Grammar> Debug for StateTable<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.states.iter()).finish()
    }
}

// ============================================================================
// Session state
// ============================================================================

/// Bounded expectation: a match is required within `remaining` lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expectation {
    /// Lines left in the window; 0 or less means nothing is expected
    pub remaining: i32,
    /// What was expected, for diagnostics
    pub description: Option<&'static str>,
}

/// Mutable state threaded through every action
pub struct Session<G: Grammar> {
    state: G::State,
    run: TestRun,
    line_number: u64,
    expectation: Expectation,
    /// Grammar bookkeeping for the current run
    pub scratch: G::Scratch,
    publisher: Arc<dyn RunPublisher>,
    telemetry: Arc<dyn Telemetry>,
}

impl<G: Grammar> Session<G> {
    fn new(publisher: Arc<dyn RunPublisher>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            state: G::initial_state(),
            run: TestRun::new(G::parser_uri(), 1),
            line_number: 0,
            expectation: Expectation::default(),
            scratch: G::Scratch::default(),
            publisher,
            telemetry,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> G::State {
        self.state
    }

    /// Live run
    #[must_use]
    pub fn run(&self) -> &TestRun {
        &self.run
    }

    /// Live run, mutably
    pub fn run_mut(&mut self) -> &mut TestRun {
        &mut self.run
    }

    /// Number of the line being processed
    #[must_use]
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Pending expectation
    #[must_use]
    pub fn expectation(&self) -> Expectation {
        self.expectation
    }

    /// Require a match within the next `lines` lines
    pub fn expect_within(&mut self, lines: i32, description: &'static str) {
        self.expectation = Expectation {
            remaining: lines,
            description: Some(description),
        };
    }

    /// Drop any pending expectation
    pub fn clear_expectation(&mut self) {
        self.expectation.remaining = 0;
    }

    /// Record a grammar telemetry event tagged with the live run id
    pub fn record_event(&self, event: &str) {
        self.record_event_with(event, json!({ "run_id": self.run.run_id }));
    }

    /// Record a grammar telemetry event with an explicit payload
    pub fn record_event_with(&self, event: &str, payload: Value) {
        self.telemetry.record(G::NAME, event, payload);
    }

    /// Whether the session is indistinguishable from a fresh one, run id aside
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.state == G::initial_state()
            && self.run.is_empty()
            && self.expectation == Expectation::default()
            && self.scratch == G::Scratch::default()
    }

    /// Close the live run and start the next one
    ///
    /// The run goes through the grammar's `before_reconcile` hook and then
    /// [`reconcile`]; if it survives both it is handed to the publisher,
    /// otherwise it is dropped with a logged reason. Either way the session
    /// is reset to its initial shape with the run id advanced by one.
    pub fn finalize_and_reset(&mut self) {
        let run_id = self.run.run_id;
        info!(
            parser = G::NAME,
            run_id,
            line = self.line_number,
            "Resetting the parser and attempting to publish the test run"
        );

        let gate = G::before_reconcile(self);
        let next = TestRun::new(self.run.parser_uri.clone(), run_id + 1);
        let finished = std::mem::replace(&mut self.run, next);

        match gate.and_then(|()| reconcile(finished, self.telemetry.as_ref())) {
            Ok(run) => {
                info!(parser = G::NAME, run_id, "Publishing test run");
                self.publisher.publish(run);
            }
            Err(rejection) => {
                warn!(parser = G::NAME, run_id, "Skipping publish: {rejection}");
                self.record_event_with(rejection.event_name(), json!({ "run_id": run_id }));
            }
        }

        self.state = G::initial_state();
        self.line_number = 0;
        self.expectation = Expectation::default();
        self.scratch = G::Scratch::default();
        debug!(parser = G::NAME, run_id = run_id + 1, "Successfully reset the parser");
    }
}

impl<G: Grammar> Debug for Session<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("run", &self.run)
            .field("line_number", &self.line_number)
            .field("expectation", &self.expectation)
            .field("scratch", &self.scratch)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Drives one grammar over a stream of lines
pub struct Parser<G: Grammar> {
    table: StateTable<G>,
    session: Session<G>,
}

impl<G: Grammar> Parser<G> {
    /// Create a parser publishing to `publisher`
    #[must_use]
    pub fn new(publisher: Arc<dyn RunPublisher>, telemetry: Arc<dyn Telemetry>) -> Self {
        info!(parser = G::NAME, "Starting test result parser");
        telemetry.record(G::NAME, INITIALIZE, json!(true));
        Self {
            table: G::table(),
            session: Session::new(publisher, telemetry),
        }
    }

    /// Session state, for inspection
    #[must_use]
    pub fn session(&self) -> &Session<G> {
        &self.session
    }

    /// Feed one line
    ///
    /// Blank lines are skipped without touching any state.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`] raised by a grammar action. The parser
    /// should not be fed further lines after an error.
    pub fn process_line(&mut self, line: &str, line_number: u64) -> Result<(), ParseError> {
        if line.trim().is_empty() {
            trace!(parser = G::NAME, line = line_number, "Skipping blank line");
            return Ok(());
        }

        self.session.line_number = line_number;

        match self.attempt_match(line) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => {
                error!(parser = G::NAME, line = line_number, "Parse failed: {err}");
                self.session
                    .record_event_with(EXCEPTIONS, json!([err.to_string()]));
                return Err(err);
            }
        }

        let expectation = self.session.expectation;
        if expectation.remaining == 1 {
            info!(
                parser = G::NAME,
                "Was expecting {} before line {line_number}, but no matches occurred",
                expectation.description.unwrap_or("a match")
            );
            self.session.finalize_and_reset();
        } else if expectation.remaining > 1 {
            self.session.expectation.remaining -= 1;
        }

        Ok(())
    }

    /// Signal the end of the stream, closing any run still in flight
    pub fn complete(&mut self) {
        if self.session.is_pristine() {
            debug!(parser = G::NAME, "Stream complete with no run in flight");
            return;
        }
        info!(parser = G::NAME, "Stream complete, closing the run in flight");
        self.session.finalize_and_reset();
    }

    fn attempt_match(&mut self, line: &str) -> Result<bool, ParseError> {
        let state = self.session.state;
        let rules = self
            .table
            .rules(state)
            .ok_or_else(|| ParseError::UndefinedState(format!("{state:?}")))?;

        for rule in rules {
            if let Some(captures) = rule.pattern.captures(line) {
                let next = (rule.action)(&captures, &mut self.session)?;
                if next != state {
                    trace!(parser = G::NAME, from = ?state, to = ?next, "Transition");
                }
                self.session.state = next;
                return Ok(true);
            }
        }

        Ok(false)
    }
}

impl<G: Grammar> Debug for Parser<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("grammar", &G::NAME)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Object-safe view of a parser, for driving mixed grammars together
pub trait LogParser: Send {
    /// Parser name
    fn name(&self) -> &'static str;

    /// Feed one line
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`] raised by a grammar action.
    fn process_line(&mut self, line: &str, line_number: u64) -> Result<(), ParseError>;

    /// Signal the end of the stream
    fn complete(&mut self);
}

impl<G: Grammar> LogParser for Parser<G> {
    fn name(&self) -> &'static str {
        G::NAME
    }

    fn process_line(&mut self, line: &str, line_number: u64) -> Result<(), ParseError> {
        Parser::process_line(self, line, line_number)
    }

    fn complete(&mut self) {
        Parser::complete(self);
    }
}

// ============================================================================
// Capture helpers
// ============================================================================

/// Text of a required capture group
///
/// # Errors
///
/// Returns `ParseError::MissingCapture` if the group did not participate.
pub fn capture_str<'h>(captures: &Captures<'h>, group: &'static str) -> Result<&'h str, ParseError> {
    captures
        .name(group)
        .map(|m| m.as_str())
        .ok_or(ParseError::MissingCapture(group))
}

/// Count from an optional capture group; absent groups count as zero
///
/// # Errors
///
/// Returns `ParseError::InvalidNumber` if the text does not fit a `usize`.
pub fn capture_count(captures: &Captures<'_>, group: &'static str) -> Result<usize, ParseError> {
    match captures.name(group) {
        Some(m) => m
            .as_str()
            .parse()
            .map_err(|source| ParseError::InvalidNumber { group, source }),
        None => Ok(0),
    }
}

/// Ordinal from a required capture group
///
/// # Errors
///
/// Returns `ParseError::MissingCapture` or `ParseError::InvalidNumber`.
pub fn capture_ordinal(captures: &Captures<'_>, group: &'static str) -> Result<u32, ParseError> {
    capture_str(captures, group)?
        .parse()
        .map_err(|source| ParseError::InvalidNumber { group, source })
}

/// Duration from a value group and a unit group, if the value participated
///
/// # Errors
///
/// Returns `ParseError::InvalidDuration` if the value cannot be converted.
pub fn capture_duration(
    captures: &Captures<'_>,
    value_group: &'static str,
    unit_group: &'static str,
) -> Result<Option<Duration>, ParseError> {
    let Some(value) = captures.name(value_group) else {
        return Ok(None);
    };
    let unit = captures.name(unit_group).map_or("s", |m| m.as_str());
    parse_duration(value.as_str(), unit).map(Some)
}

/// Convert a decimal value in `ms`, `s`, `m` or `h` to a [`Duration`]
///
/// # Errors
///
/// Returns `ParseError::InvalidDuration` for unknown units, unparsable
/// values or values out of range.
pub fn parse_duration(value: &str, unit: &str) -> Result<Duration, ParseError> {
    let invalid = || ParseError::InvalidDuration {
        value: value.to_string(),
        unit: unit.to_string(),
    };
    let amount: f64 = value.parse().map_err(|_| invalid())?;
    let nanos_per_unit = match unit {
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        _ => return Err(invalid()),
    };

    // Rounded so that decimal inputs such as `0.052` land on whole milliseconds.
    let nanos = (amount * nanos_per_unit).round();
    if !nanos.is_finite() || nanos < 0.0 || nanos >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos as u64))
}
