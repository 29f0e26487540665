// ==============================================
// CONCURRENT MEMOIZATION TESTS (integration)
// ==============================================
//
// Memoizers are shared across threads behind an Arc. The wrapped function
// runs without the lock held, so concurrent misses on one slot may compute
// more than once; every caller must still observe the single stored value.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use memokit::prelude::*;

const THREADS: usize = 8;

// ==============================================
// One Canonical Value Per Slot
// ==============================================

mod canonical_value {
    use super::*;

    #[test]
    fn racing_identity_misses_agree_on_one_result() {
        for _ in 0..50 {
            let memo = Arc::new(memoize(|_: &[Arg]| Arc::new(0u64)));
            let state = Arc::new(0u8);
            let props = Arc::new(1u8);
            let barrier = Arc::new(Barrier::new(THREADS));

            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let memo = Arc::clone(&memo);
                    let state = Arc::clone(&state);
                    let props = Arc::clone(&props);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        memo.call(&args![&state, &props]).unwrap()
                    })
                })
                .collect();

            let results: Vec<Arc<u64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            for result in &results[1..] {
                assert!(
                    Arc::ptr_eq(&results[0], result),
                    "two callers observed different values for one slot"
                );
            }
            assert_eq!(memo.len(), 1);
        }
    }

    #[test]
    fn racing_bounded_misses_agree_on_one_result() {
        for _ in 0..50 {
            let cache = Arc::new(bounded_cache::<String, Arc<String>>(4).unwrap());
            let barrier = Arc::new(Barrier::new(THREADS));

            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let cache = Arc::clone(&cache);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        cache.get_or_compute("shared", || Arc::new(format!("thread {i}")))
                    })
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        }
    }

    #[test]
    fn racing_creators_share_one_instance() {
        let make = Arc::new(memoize_creator(|n: &u32| Arc::new(*n)));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let make = Arc::clone(&make);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    make.call(&7).unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(make.len(), 1);
    }
}

// ==============================================
// Bounds Under Contention
// ==============================================

mod contention {
    use super::*;

    #[test]
    fn bounded_capacity_holds_under_parallel_inserts() {
        let cache = Arc::new(bounded_cache::<String, usize>(16).unwrap());

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1_000 {
                        let key = format!("{t}:{i}");
                        cache.get_or_compute(&key, || i);
                        assert!(cache.len() <= 16);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 16);

        #[cfg(debug_assertions)]
        Arc::into_inner(cache)
            .expect("all threads joined")
            .into_cache()
            .check_invariants()
            .unwrap();
    }

    #[test]
    fn tree_stays_bounded_with_per_thread_churn() {
        let memo = Arc::new(
            MemoBuilder::new()
                .prune_interval(32)
                .memoize(|args: &[Arg]| args.len()),
        );
        let shared = Arc::new(0u8);

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let memo = Arc::clone(&memo);
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for i in 0..2_000u32 {
                        let local = Arc::new(i);
                        memo.call(&args![&shared, &local]).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        memo.prune();
        assert_eq!(memo.len(), 0);
        assert_eq!(memo.inspect(|tree| tree.node_count()), 2);
    }

    #[test]
    fn reentrant_compute_from_many_threads() {
        let inner = Arc::new(memoize(|args: &[Arg]| args.len() * 10));
        let inner_for_outer = Arc::clone(&inner);
        let outer = Arc::new(memoize(move |args: &[Arg]| {
            inner_for_outer.call(&args[..1]).unwrap() + 1
        }));
        let (a, b) = (Arc::new(0u8), Arc::new(1u8));
        let barrier = Arc::new(Barrier::new(THREADS));
        let computed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let outer = Arc::clone(&outer);
                let (a, b) = (Arc::clone(&a), Arc::clone(&b));
                let barrier = Arc::clone(&barrier);
                let computed = Arc::clone(&computed);
                thread::spawn(move || {
                    barrier.wait();
                    let value = outer.call(&args![&a, &b]).unwrap();
                    computed.fetch_add(value, Ordering::Relaxed);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(computed.load(Ordering::Relaxed), THREADS * 11);
        assert_eq!(inner.len(), 1);
        assert_eq!(outer.len(), 1);
    }
}
