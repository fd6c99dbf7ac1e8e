use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use maskforge::{MaskOptions, MaskSession};
use std::hint::black_box;

// Three ranges run the general path, five the unrolled one.
const GENERAL: &str = "?l?l?d";
const UNROLLED: &str = "?d?d?d?d?d";

fn enumerate(pattern: &str) -> u64 {
    let mut session = MaskSession::new(MaskOptions::builder().pattern(pattern).build())
        .expect("Failed to compile mask");
    let mut sum = 0u64;
    session
        .run(&mut |c: &[u8]| {
            sum = sum.wrapping_add(black_box(c)[0] as u64);
            false
        })
        .expect("Run failed");
    sum
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("odometer");

    group.throughput(Throughput::Elements(26 * 26 * 10));
    group.bench_function("general (?l?l?d)", |b| b.iter(|| enumerate(black_box(GENERAL))));

    group.throughput(Throughput::Elements(100_000));
    group.bench_function("unrolled (?d x5)", |b| b.iter(|| enumerate(black_box(UNROLLED))));

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
