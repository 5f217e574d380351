// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! runlog-bus: async plumbing around runlog-parser
//!
//! This crate connects a line source to any number of parsers and their
//! published runs to a sink:
//!
//! - [`LineBus`] numbers lines and fans them out, one queue per subscriber
//! - [`spawn_parser`] runs a [`LogParser`](runlog_parser::LogParser) on its own task
//! - [`ChannelPublisher`] forwards published runs to a receiver
//! - [`spawn_sink`] drains that receiver into a [`RunSink`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use runlog_bus::{LineBus, channel, spawn_parser};
//! use runlog_parser::{NoopTelemetry, ParserKind};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let (publisher, mut runs) = channel();
//! let publisher = Arc::new(publisher);
//! let mut bus = LineBus::new();
//! let parsers: Vec<_> = ParserKind::ALL
//!     .into_iter()
//!     .map(|kind| spawn_parser(kind.build(publisher.clone(), Arc::new(NoopTelemetry)), bus.subscribe()))
//!     .collect();
//! drop(publisher);
//!
//! bus.pump(tokio::io::BufReader::new(tokio::io::stdin())).await?;
//! while let Some(run) = runs.recv().await {
//!     println!("{} run {}", run.parser_uri, run.run_id);
//! }
//! # drop(parsers);
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod error;
pub mod publisher;
pub mod sink;

pub use bus::{BusEvent, LineBus, LogLine, ParserReport, Subscription, spawn_parser};
pub use error::{BusError, SinkError};
pub use publisher::{ChannelPublisher, channel};
pub use sink::{RunSink, SinkReport, spawn_sink};
