// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Configuration for the runlog command
//!
//! Every option can also be set through a `RUNLOG_*` environment variable.

use std::path::{Path, PathBuf};

use clap::Parser;
use runlog_parser::ParserKind;

/// runlog - turn test runner console output into structured test runs
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "runlog")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Log file to read
    ///
    /// Defaults to stdin.
    #[arg(short, long, env = "RUNLOG_INPUT")]
    pub input: Option<PathBuf>,

    /// File to write published runs to, one JSON object per line
    ///
    /// Defaults to stdout.
    #[arg(short, long, env = "RUNLOG_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Parsers to run, comma separated (jasmine, jest, mocha, python)
    ///
    /// Defaults to all of them.
    #[arg(short, long, env = "RUNLOG_PARSERS", value_delimiter = ',')]
    pub parsers: Vec<ParserKind>,

    /// Write the telemetry collected during the run to this file as JSON
    #[arg(short, long, env = "RUNLOG_TELEMETRY")]
    pub telemetry: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so they never mix with published runs.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Config {
    /// Parsers to run, in a stable order and without duplicates
    #[must_use]
    pub fn selected_parsers(&self) -> Vec<ParserKind> {
        if self.parsers.is_empty() {
            return ParserKind::ALL.to_vec();
        }
        let mut kinds = self.parsers.clone();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input path is given but doesn't exist or isn't a file
    /// - The output or telemetry file would land in a missing directory
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(ConfigError::InputNotFound(input.clone()));
            }
            if !input.is_file() {
                return Err(ConfigError::InputNotFile(input.clone()));
            }
        }

        for path in [&self.output, &self.telemetry].into_iter().flatten() {
            check_parent(path)?;
        }

        Ok(())
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

fn check_parent(path: &Path) -> Result<(), ConfigError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(ConfigError::DirectoryNotFound(parent.to_path_buf()))
        }
        _ => Ok(()),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Input path not found
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    /// Input path is not a regular file
    #[error("Input path is not a file: {0}")]
    InputNotFile(PathBuf),

    /// Output directory missing
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),
}
