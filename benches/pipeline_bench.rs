//! Benchmarks for plan composition and pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pipeflow::prelude::*;
use std::num::NonZeroUsize;

fn cap(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn compose_benchmark(c: &mut Criterion) {
    c.bench_function("compose_four_stages", |b| {
        b.iter(|| {
            let plan = filter(|x: i64| x + 1)
                | filter(|x: i64| x * 2)
                | filter(|x: i64| x - 3)
                | filter(|x: i64| x ^ 0x55);
            black_box(plan.apply(black_box(7)))
        });
    });
}

fn execute_benchmark(c: &mut Criterion) {
    let pool = ThreadPool::new();
    c.bench_function("execute_1k_items_two_stages", |b| {
        b.iter(|| {
            let (in_tx, in_rx) = bounded::<i64>(cap(64));
            let (out_tx, out_rx) = bounded::<i64>(cap(1024));
            let plan = source(in_rx)
                | parallel(filter(|x: i64| x * 2))
                | sink_and_close(out_tx);
            let exec = PipelineExecution::start(&plan, &pool);
            for x in 0..1000 {
                in_tx.push(x).unwrap();
            }
            in_tx.close();
            exec.wait().unwrap();
            let mut total = 0i64;
            while let Some(x) = out_rx.wait_pop() {
                total = total.wrapping_add(x);
            }
            black_box(total)
        });
    });
}

criterion_group!(benches, compose_benchmark, execute_benchmark);
criterion_main!(benches);
