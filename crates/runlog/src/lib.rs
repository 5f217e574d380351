// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! runlog library
//!
//! This module exports the command's configuration, pipeline and sink for
//! use in integration tests and benchmarks.

pub mod config;
pub mod pipeline;
pub mod sink;

pub use config::{Config, ConfigError};
pub use pipeline::{PipelineReport, run_pipeline, run_stream};
pub use sink::{JsonLinesSink, PublishedRun};
