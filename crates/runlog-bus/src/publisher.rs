// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Channel-backed run publisher

use runlog_parser::{RunPublisher, TestRun};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::warn;

/// Forwards published runs to a single receiver
///
/// Cloned into every parser; the receiving end closes once the last clone
/// is dropped.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: UnboundedSender<TestRun>,
}

/// Create a publisher and the receiver its runs arrive on
#[must_use]
pub fn channel() -> (ChannelPublisher, UnboundedReceiver<TestRun>) {
    let (sender, receiver) = unbounded_channel();
    (ChannelPublisher { sender }, receiver)
}

impl RunPublisher for ChannelPublisher {
    fn publish(&self, run: TestRun) {
        if let Err(err) = self.sender.send(run) {
            let run = err.0;
            warn!(
                parser = %run.parser_uri,
                run_id = run.run_id,
                "Run receiver closed, dropping run"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[tokio::test]
    async fn test_runs_arrive_in_publish_order() {
        let (publisher, mut receiver) = channel();
        publisher.publish(TestRun::new("Jest/1.0", 1));
        publisher.clone().publish(TestRun::new("Jest/1.0", 2));
        drop(publisher);

        let mut ids = Vec::new();
        while let Some(run) = receiver.recv().await {
            ids.push(run.run_id);
        }
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_publish_after_receiver_closed_is_dropped() {
        let (publisher, receiver) = channel();
        drop(receiver);
        publisher.publish(TestRun::new("Mocha/1.0", 1));
    }
}
