//! Cause stack throughput.
//!
//! Measures the hot paths a host hits on every externally observable action:
//! opening a frame, pushing a few causes and a context value, snapshotting
//! the cause, and closing the frame.
//!
//! Run with: `cargo bench --bench stack_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use causeway_stack::prelude::*;

const SOURCE: ContextKey<u64> = ContextKey::new("source");

/// A stack with `depth` causes already pushed under the root.
fn stack_with_depth(depth: usize, config: StackConfig) -> CauseStack {
    let mut stack = CauseStack::with_root("server", config);
    for i in 0..depth {
        stack.push_cause(i as u64);
    }
    stack
}

fn bench_push_pop(c: &mut Criterion) {
    let mut stack = stack_with_depth(8, StackConfig::default());
    c.bench_function("push_pop_cause", |b| {
        b.iter(|| {
            stack.push_cause(black_box(42u64));
            black_box(stack.pop_cause().ok());
        })
    });
}

fn bench_frame_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_cycle");
    for depth in [1usize, 16, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut stack = stack_with_depth(depth, StackConfig::default());
            b.iter(|| {
                let mut frame = stack.frame();
                frame.push_cause(black_box(7u64));
                let _ = frame.add_context(&SOURCE, black_box(3));
                black_box(frame.current_cause().len());
            })
        });
    }
    group.finish();
}

fn bench_verified_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_neutral");
    for verify in [false, true] {
        let config = StackConfig {
            verify_neutrality: verify,
            ..StackConfig::default()
        };
        let mut stack = stack_with_depth(16, config);
        group.bench_function(if verify { "verified" } else { "unverified" }, |b| {
            b.iter(|| {
                let out = stack.run(neutral("bench", |s: &mut CauseStack| {
                    s.push_cause(1u64);
                    let depth = s.depth();
                    let _ = s.pop_cause();
                    depth
                }));
                black_box(out.ok());
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_frame_cycle, bench_verified_run);
criterion_main!(benches);
