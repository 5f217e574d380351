// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Property-based tests for runlog-bus

use proptest::prelude::*;
use runlog_bus::{BusEvent, LineBus};

/// Everything one subscriber received, in order
fn collect(lines: &[String], subscribers: usize) -> Vec<Vec<BusEvent>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Should build runtime");

    runtime.block_on(async {
        let mut bus = LineBus::new();
        let mut subscriptions: Vec<_> = (0..subscribers).map(|_| bus.subscribe()).collect();
        for line in lines {
            bus.publish(line.clone());
        }
        bus.complete();

        let mut received = Vec::new();
        for subscription in &mut subscriptions {
            let mut events = Vec::new();
            while let Some(event) = subscription.recv().await {
                events.push(event);
            }
            received.push(events);
        }
        received
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Every subscriber sees every line once, numbered in order, then one completion
    #[test]
    fn fan_out_is_lossless_and_ordered(
        lines in prop::collection::vec(".{0,30}", 0..50),
        subscribers in 1usize..5,
    ) {
        for events in collect(&lines, subscribers) {
            prop_assert_eq!(events.len(), lines.len() + 1);
            prop_assert_eq!(events.last(), Some(&BusEvent::Complete));
            for (index, (event, text)) in events.iter().zip(&lines).enumerate() {
                match event {
                    BusEvent::Line(line) => {
                        prop_assert_eq!(line.number, index as u64 + 1);
                        prop_assert_eq!(&line.text, text);
                    }
                    BusEvent::Complete => prop_assert!(false, "completion before line {}", index + 1),
                }
            }
        }
    }
}
