//! Replay benchmarks.

use std::fmt::Write;

use cmapool::{replay_reader, PoolConfig, PAGE_SIZE};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// A log that keeps a 64-page pool under constant eviction pressure.
fn synthetic_log(buffers: u32, rounds: u32) -> String {
    let mut log = String::new();

    for id in 0..buffers {
        let pages = u64::from(id % 7 + 1);
        writeln!(log, "[ 1.000000] @@@ create {id:x} {}", pages * PAGE_SIZE).unwrap();
    }
    for round in 0..rounds {
        for id in (0..buffers).filter(|id| (id + round) % 3 == 0) {
            writeln!(log, "[ 2.000000] @@@ use {id:x}").unwrap();
            if id % 5 == 0 {
                writeln!(log, "[ 2.000000] @@@ madv {id:x} dontneed").unwrap();
            }
        }
    }
    for id in 0..buffers {
        writeln!(log, "[ 3.000000] @@@ destroy {id:x}").unwrap();
    }

    log
}

fn replay_benchmark(c: &mut Criterion) {
    let log = synthetic_log(256, 16);

    c.bench_function("replay_256_buffers", |b| {
        b.iter(|| {
            let report = replay_reader(PoolConfig::new(64 * PAGE_SIZE), log.as_bytes()).unwrap();
            black_box(report.commands)
        })
    });
}

fn parse_benchmark(c: &mut Criterion) {
    let line = "[  123.456789] @@@ create 8f3a2c00 16384 nomove";

    c.bench_function("parse_create_line", |b| {
        b.iter(|| black_box(cmapool::replay::parse_line(black_box(line)).unwrap()))
    });
}

criterion_group!(benches, replay_benchmark, parse_benchmark);
criterion_main!(benches);
