// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! CLI tests for runlog
//!
//! Flag parsing through [`Config`], plus a few runs of the real binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use clap::Parser;
use runlog::{Config, PublishedRun};
use runlog_parser::ParserKind;
use similar_asserts::assert_eq;
use tracing::Level;

// ============================================================================
// Flag parsing
// ============================================================================

#[test]
fn test_no_flags() {
    let config = Config::try_parse_from(["runlog"]).expect("parse should succeed");
    assert!(config.input.is_none());
    assert!(config.parsers.is_empty());
    assert_eq!(config.log_level(), Level::INFO);
}

#[test]
fn test_parsers_comma_separated() {
    let config = Config::try_parse_from(["runlog", "--parsers", "jest,Mocha"])
        .expect("parse should succeed");
    assert_eq!(config.parsers, vec![ParserKind::Jest, ParserKind::Mocha]);
}

#[test]
fn test_parsers_repeated_short_flag() {
    let config = Config::try_parse_from(["runlog", "-p", "python", "-p", "jasmine"])
        .expect("parse should succeed");
    assert_eq!(
        config.selected_parsers(),
        vec![ParserKind::Jasmine, ParserKind::Python]
    );
}

#[test]
fn test_unknown_parser_rejected() {
    let result = Config::try_parse_from(["runlog", "--parsers", "jest,nunit"]);
    let err = result.expect_err("nunit is not a parser");
    assert!(err.to_string().contains("nunit"));
}

#[test]
fn test_paths() {
    let config = Config::try_parse_from([
        "runlog",
        "-i",
        "build.log",
        "-o",
        "runs.jsonl",
        "--telemetry",
        "telemetry.json",
    ])
    .expect("parse should succeed");
    assert_eq!(config.input.as_deref(), Some(Path::new("build.log")));
    assert_eq!(config.output.as_deref(), Some(Path::new("runs.jsonl")));
    assert_eq!(config.telemetry.as_deref(), Some(Path::new("telemetry.json")));
}

#[test]
fn test_verbose_and_quiet() {
    let verbose = Config::try_parse_from(["runlog", "-v"]).expect("parse should succeed");
    assert_eq!(verbose.log_level(), Level::DEBUG);

    let quiet = Config::try_parse_from(["runlog", "--quiet"]).expect("parse should succeed");
    assert_eq!(quiet.log_level(), Level::WARN);

    // Verbose wins when both are given
    let both = Config::try_parse_from(["runlog", "-v", "-q"]).expect("parse should succeed");
    assert_eq!(both.log_level(), Level::DEBUG);
}

// ============================================================================
// Binary
// ============================================================================

fn runlog(args: &[&str], stdin: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_runlog"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Should start runlog");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Should write stdin");
    child.wait_with_output().expect("Should wait for runlog")
}

#[test]
fn test_binary_writes_runs_to_stdout() {
    let log = "\
    ✓ adds
    ✓ subtracts

  2 passing (4ms)
";
    let output = runlog(&["--quiet"], log);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).expect("Should be UTF-8");
    let runs: Vec<PublishedRun> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("Should parse"))
        .collect();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run.parser_uri, "MochaTestResultParser/1.0");
    assert_eq!(runs[0].run.passed_tests.len(), 2);
}

#[test]
fn test_binary_fails_on_fatal_parse_error() {
    let output = runlog(&[], "Started\n.\n99999999999999999999999 specs, 0 failures\n");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("JasmineTestResultParser"));
}

#[test]
fn test_binary_rejects_missing_input() {
    let output = runlog(&["--input", "/nonexistent/path/12345.log"], "");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Input file not found"));
}
