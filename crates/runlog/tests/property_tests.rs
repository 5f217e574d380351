// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Property-based tests for runlog configuration

use clap::Parser;
use proptest::prelude::*;
use runlog::Config;
use runlog_parser::ParserKind;

fn parser_kind() -> impl Strategy<Value = ParserKind> {
    prop::sample::select(ParserKind::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Any --parsers list selects exactly the named parsers, sorted, once each
    #[test]
    fn parser_selection_is_sorted_and_unique(kinds in prop::collection::vec(parser_kind(), 1..8)) {
        let list = kinds.iter().map(|kind| kind.as_str()).collect::<Vec<_>>().join(",");
        let config = Config::try_parse_from(["runlog", "--parsers", &list])
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let selected = config.selected_parsers();
        prop_assert!(selected.windows(2).all(|w| w[0] < w[1]));
        for kind in ParserKind::ALL {
            prop_assert_eq!(selected.contains(&kind), kinds.contains(&kind));
        }
    }
}
