// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Line fan-out
//!
//! [`LineBus`] numbers incoming lines and hands every subscriber its own
//! copy through an unbounded queue, so one slow parser never holds up
//! another and no line is ever dropped. Each parser runs on its own task
//! via [`spawn_parser`].

use runlog_parser::LogParser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::error::BusError;

/// One line of console output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// 1-based position in the stream
    pub number: u64,
    /// Line text without its line ending
    pub text: String,
}

/// What a subscriber receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Next line of the stream
    Line(LogLine),
    /// No more lines will follow
    Complete,
}

/// Receiving end handed out by [`LineBus::subscribe`]
#[derive(Debug)]
pub struct Subscription {
    receiver: UnboundedReceiver<BusEvent>,
}

impl Subscription {
    /// Next event, or `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<BusEvent> {
        self.receiver.recv().await
    }
}

/// Fan-out of one line stream to any number of subscribers
#[derive(Debug, Default)]
pub struct LineBus {
    subscribers: Vec<UnboundedSender<BusEvent>>,
    published: u64,
    completed: bool,
}

impl LineBus {
    /// Create a bus with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber; it sees every line published from now on
    pub fn subscribe(&mut self) -> Subscription {
        let (sender, receiver) = unbounded_channel();
        if self.completed {
            // Late subscribers still get a well-formed stream.
            let _ = sender.send(BusEvent::Complete);
        } else {
            self.subscribers.push(sender);
        }
        Subscription { receiver }
    }

    /// Number of subscribers still listening
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Lines published so far
    #[must_use]
    pub fn lines_published(&self) -> u64 {
        self.published
    }

    /// Number `text` as the next line and send it to every subscriber
    ///
    /// Returns the line number. Subscribers that have gone away are
    /// dropped from the bus.
    pub fn publish(&mut self, text: impl Into<String>) -> u64 {
        self.published += 1;
        let line = LogLine {
            number: self.published,
            text: text.into(),
        };

        self.subscribers
            .retain(|subscriber| subscriber.send(BusEvent::Line(line.clone())).is_ok());
        trace!(
            line = line.number,
            subscribers = self.subscribers.len(),
            "Published line"
        );
        line.number
    }

    /// Signal the end of the stream to every subscriber
    ///
    /// Only the first call has any effect.
    pub fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        for subscriber in self.subscribers.drain(..) {
            let _ = subscriber.send(BusEvent::Complete);
        }
        debug!(lines = self.published, "Line stream complete");
    }

    /// Publish every line of `reader`, then complete the stream
    ///
    /// Invalid UTF-8 is replaced rather than rejected. The stream is
    /// completed even when reading fails part way.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if reading fails.
    pub async fn pump<R>(&mut self, mut reader: R) -> std::io::Result<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let start = self.published;
        let result = self.read_lines(&mut reader).await;
        self.complete();
        result.map(|()| self.published - start)
    }

    async fn read_lines<R>(&mut self, reader: &mut R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer).await? == 0 {
                return Ok(());
            }
            let text = String::from_utf8_lossy(trim_line_ending(&buffer)).into_owned();
            self.publish(text);
        }
    }
}

fn trim_line_ending(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

/// Summary of a parser task that reached the end of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserReport {
    /// Parser name
    pub parser: &'static str,
    /// Lines the parser consumed
    pub lines: u64,
}

/// Run `parser` over `subscription` on its own task
///
/// The task feeds every line to the parser and completes it when the stream
/// ends. A fatal parse error ends the task early with [`BusError::Parser`];
/// the run in flight is dropped and other parsers are unaffected.
pub fn spawn_parser(
    mut parser: Box<dyn LogParser>,
    mut subscription: Subscription,
) -> JoinHandle<Result<ParserReport, BusError>> {
    tokio::spawn(async move {
        let name = parser.name();
        let mut lines = 0;

        while let Some(event) = subscription.recv().await {
            match event {
                BusEvent::Line(line) => {
                    lines += 1;
                    if let Err(source) = parser.process_line(&line.text, line.number) {
                        error!(parser = name, line = line.number, "Parser stopped: {source}");
                        return Err(BusError::Parser {
                            parser: name,
                            line: line.number,
                            source,
                        });
                    }
                }
                BusEvent::Complete => break,
            }
        }

        parser.complete();
        debug!(parser = name, lines, "Parser task finished");
        Ok(ParserReport {
            parser: name,
            lines,
        })
    })
}
