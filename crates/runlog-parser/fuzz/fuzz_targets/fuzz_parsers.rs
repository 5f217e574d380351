// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for the streaming grammars
//!
//! Feeds arbitrary text to every grammar line by line, the way the CLI does.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;

use runlog_parser::{CollectingPublisher, NoopTelemetry, ParserKind};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    for kind in ParserKind::ALL {
        let publisher = Arc::new(CollectingPublisher::new());
        let mut parser = kind.build(publisher, Arc::new(NoopTelemetry));

        // A fatal error ends the stream for that grammar; panics are bugs
        let mut failed = false;
        for (index, line) in input.lines().enumerate() {
            if parser.process_line(line, index as u64 + 1).is_err() {
                failed = true;
                break;
            }
        }

        if !failed {
            parser.complete();
        }
    }
});
