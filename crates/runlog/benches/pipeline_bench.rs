// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

use std::hint::black_box;
use std::path::Path;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use runlog::run_stream;
use runlog_parser::{NoopTelemetry, ParserKind};

/// Repeat the mixed fixture so the bus carries a realistic amount of output
fn load_log(repeat: usize) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mixed.log");
    std::fs::read_to_string(path)
        .expect("Failed to read fixture")
        .repeat(repeat)
}

fn pipeline_benchmarks(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let log = load_log(200);
    let lines = log.lines().count() as u64;

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(lines));
    for parsers in [1, ParserKind::ALL.len()] {
        let kinds = &ParserKind::ALL[..parsers];
        group.bench_with_input(BenchmarkId::new("parsers", parsers), &log, |b, log| {
            b.iter(|| {
                runtime
                    .block_on(run_stream(
                        black_box(log.as_bytes()),
                        tokio::io::sink(),
                        kinds,
                        Arc::new(NoopTelemetry),
                    ))
                    .expect("Pipeline failed")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, pipeline_benchmarks);
criterion_main!(benches);
