//! Criterion micro-benchmarks for split buffer edge operations.

use std::collections::VecDeque;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use relo_bench::Payload;
use relo_buffer::{Placement, SplitBuffer};

fn bench_push_front(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_front_10k");

    group.bench_function("split_balanced", |b| {
        b.iter(|| {
            let mut buf = SplitBuffer::new();
            for i in 0..10_000u64 {
                buf.push_front(Payload::new(i));
            }
            black_box(buf.len());
        });
    });

    group.bench_function("vecdeque", |b| {
        b.iter(|| {
            let mut dq = VecDeque::new();
            for i in 0..10_000u64 {
                dq.push_front(Payload::new(i));
            }
            black_box(dq.len());
        });
    });

    group.finish();
}

fn bench_alternating_ends(c: &mut Criterion) {
    let mut group = c.benchmark_group("alternating_10k");
    for placement in [Placement::Balanced, Placement::Packed] {
        group.bench_function(format!("{placement:?}"), |b| {
            b.iter(|| {
                let mut buf = SplitBuffer::new().with_placement(placement);
                for i in 0..5_000u64 {
                    buf.push_back(Payload::new(i));
                    buf.push_front(Payload::new(i));
                }
                black_box(buf.capacity());
            });
        });
    }
    group.finish();
}

fn bench_queue_churn(c: &mut Criterion) {
    c.bench_function("queue_churn_10k", |b| {
        let mut buf = SplitBuffer::new();
        for i in 0..64u64 {
            buf.push_back(Payload::new(i));
        }
        b.iter(|| {
            for i in 0..10_000u64 {
                buf.push_back(Payload::new(i));
                black_box(buf.pop_front());
            }
        });
    });
}

criterion_group!(benches, bench_push_front, bench_alternating_ends, bench_queue_churn);
criterion_main!(benches);
