//! Dispatch resolution benchmarks using criterion.
//!
//! Measures the exact, coercive and fallback paths, and how the exact path
//! scales with the number of declared candidates.
//!
//! Run with: cargo bench --bench dispatch_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use multidispatch::{fallback, overload, Ty, TypeBuilder, Value};

fn numeric() -> Ty {
    let mut b = TypeBuilder::new("Numeric");
    b.candidate("f", overload([Ty::int(), Ty::int()]).static_member().wrap(|_| Ok(Value::Int(0))))
        .unwrap();
    b.candidate(
        "f",
        overload([Ty::float(), Ty::float()]).static_member().wrap(|_| Ok(Value::Int(1))),
    )
    .unwrap();
    b.candidate("f", fallback().static_member().wrap(|_| Ok(Value::Int(2))))
        .unwrap();
    b.finish().unwrap()
}

/// Benchmark each resolution path on a small table
fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_paths");
    let ty = numeric();

    let exact = [Value::Int(3), Value::Int(4)];
    group.bench_function("exact", |b| {
        b.iter(|| black_box(ty.call_method("f", black_box(&exact))))
    });

    let coerced = [Value::Int(3), Value::float(4.0)];
    group.bench_function("coerced", |b| {
        b.iter(|| black_box(ty.call_method("f", black_box(&coerced))))
    });

    let unmatched = [Value::str("x")];
    group.bench_function("fallback", |b| {
        b.iter(|| black_box(ty.call_method("f", black_box(&unmatched))))
    });

    group.finish();
}

/// Benchmark the exact path when the match is the last of N candidates
fn bench_table_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_match_last_candidate");

    for n in [1usize, 8, 32, 128] {
        let mut b = TypeBuilder::new("Wide");
        for i in 0..n {
            // Arity i + 1, so only the last candidate matches n int arguments.
            let slots = vec![Ty::int(); i + 1];
            b.candidate("f", overload(slots).static_member().wrap(|_| Ok(Value::None)))
                .unwrap();
        }
        let ty = b.finish().unwrap();
        let args = vec![Value::Int(1); n];

        group.bench_with_input(BenchmarkId::from_parameter(n), &args, |bench, args| {
            bench.iter(|| black_box(ty.call_method("f", black_box(args))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_paths, bench_table_size);
criterion_main!(benches);
