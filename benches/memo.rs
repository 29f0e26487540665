//! Micro-benchmarks for the memo caches.
//!
//! Run with: `cargo bench --bench memo`
//!
//! Measures hit latency by argument count, miss-and-insert cost under
//! argument churn, bounded-cache lookups over a random key stream, and the
//! shallow single-slot memoizer.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use memokit::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const OPS: u64 = 10_000;
const KEY_UNIVERSE: u64 = 2_048;

fn handles(n: usize) -> Vec<Arc<u64>> {
    (0..n as u64).map(Arc::new).collect()
}

// ============================================================================
// Identity Tree
// ============================================================================

fn bench_tree_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_hit_ns");
    group.throughput(Throughput::Elements(OPS));

    for arity in [0usize, 1, 2, 3, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(arity), &arity, |b, &arity| {
            let owned = handles(arity);
            let args: Vec<Arg> = owned.iter().map(Arg::from).collect();
            let mut tree: IdentityMemoTree<u64> = IdentityMemoTree::new();
            tree.resolve(&args, || 1).unwrap();

            b.iter_custom(|iters| {
                let start = Instant::now();
                for _ in 0..iters {
                    for _ in 0..OPS {
                        black_box(tree.resolve(black_box(&args), || 0).unwrap());
                    }
                }
                start.elapsed()
            })
        });
    }
    group.finish();
}

fn bench_tree_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_churn_ns");
    group.throughput(Throughput::Elements(OPS));

    for interval in [0usize, 64, DEFAULT_PRUNE_INTERVAL] {
        group.bench_with_input(
            BenchmarkId::new("prune_interval", interval),
            &interval,
            |b, &interval| {
                let state = Arc::new(0u64);
                b.iter_custom(|iters| {
                    let mut tree: IdentityMemoTree<u64> =
                        IdentityMemoTree::with_prune_interval(interval);
                    let start = Instant::now();
                    for _ in 0..iters {
                        for i in 0..OPS {
                            let props = Arc::new(i);
                            black_box(
                                tree.resolve(&[Arg::from(&state), Arg::from(&props)], || i)
                                    .unwrap(),
                            );
                        }
                    }
                    start.elapsed()
                })
            },
        );
    }
    group.finish();
}

fn bench_memoized_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("memoized_call_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("hit_two_args", |b| {
        let memo = memoize(|args: &[Arg]| args.len());
        let (state, props) = (Arc::new(0u8), Arc::new(1u8));
        let args = args![&state, &props];
        memo.call(&args).unwrap();

        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..OPS {
                    black_box(memo.call(black_box(&args)).unwrap());
                }
            }
            start.elapsed()
        })
    });
    group.finish();
}

// ============================================================================
// Bounded Cache
// ============================================================================

fn bench_bounded(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounded_get_or_compute_ns");
    group.throughput(Throughput::Elements(OPS));

    for capacity in [64usize, DEFAULT_KEY_CAPACITY, 4_096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let mut rng = SmallRng::seed_from_u64(42);
                let keys: Vec<String> = (0..OPS)
                    .map(|_| format!("path.{}", rng.random_range(0..KEY_UNIVERSE)))
                    .collect();

                b.iter_custom(|iters| {
                    let mut cache: BoundedValueCache<String, usize> =
                        BoundedValueCache::new(capacity).unwrap();
                    let start = Instant::now();
                    for _ in 0..iters {
                        for key in &keys {
                            black_box(cache.get_or_compute(key.as_str(), || key.len()));
                        }
                    }
                    start.elapsed()
                })
            },
        );
    }
    group.finish();
}

// ============================================================================
// Shallow Memoizer
// ============================================================================

#[derive(Clone)]
struct Props {
    id: u64,
    label: &'static str,
}
impl_shallow_eq!(Props { id, label });

fn bench_shallow(c: &mut Criterion) {
    let mut group = c.benchmark_group("shallow_call_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("repeat_equal_props", |b| {
        let mut last = LastCall::new();
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..OPS {
                    let props = Props { id: 7, label: "row" };
                    black_box(last.call(props, |p| p.id * 2));
                }
            }
            start.elapsed()
        })
    });

    group.bench_function("alternating_props", |b| {
        let mut last = LastCall::new();
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    let props = Props { id: i % 2, label: "row" };
                    black_box(last.call(props, |p| p.id * 2));
                }
            }
            start.elapsed()
        })
    });
    group.finish();
}

// ============================================================================
// Normalization
// ============================================================================

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_ns");
    group.throughput(Throughput::Elements(OPS));

    let owned = handles(3);
    let shapes: [(&str, Vec<Arg>); 3] = [
        ("dense", owned.iter().map(Arg::from).collect()),
        ("gap", vec![Arg::from(&owned[0]), Arg::Unset, Arg::from(&owned[2])]),
        (
            "trailing_unset",
            vec![Arg::from(&owned[0]), Arg::Unset, Arg::Unset, Arg::Unset],
        ),
    ];

    for (name, args) in &shapes {
        group.bench_function(*name, |b| {
            b.iter(|| {
                for _ in 0..OPS {
                    black_box(normalize(black_box(args)));
                }
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_tree_hit,
    bench_tree_churn,
    bench_memoized_call,
    bench_bounded,
    bench_shallow,
    bench_normalize
);
criterion_main!(benches);
