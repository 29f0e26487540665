//! DHAT heap profiler for memokit.
//!
//! Run with: cargo run --bin dhat_profile --release --features dhat-heap
//! View results: Open dhat-heap.json in <https://nnethercote.github.io/dh_view/dh_view.html>

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::sync::Arc;

use memokit::arg::Arg;
use memokit::bounded::BoundedValueCache;
use memokit::builder::DEFAULT_KEY_CAPACITY;
use memokit::tree::IdentityMemoTree;

/// Simple XorShift64 RNG for deterministic workloads.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

/// Single-use props under one long-lived state: every call misses and its
/// argument is dropped right after.
fn argument_churn(tree: &mut IdentityMemoTree<Arc<u64>>, state: &Arc<u64>, operations: usize) {
    for i in 0..operations as u64 {
        let props = Arc::new(i);
        let _ = tree.resolve(&[Arg::from(state), Arg::from(&props)], || Arc::new(i * 2));
    }
}

/// Mix of long-lived and single-use extras at depth three.
fn mixed_depth(tree: &mut IdentityMemoTree<Arc<u64>>, state: &Arc<u64>, operations: usize, seed: u64) {
    let mut rng = XorShift64::new(seed);
    let kept: Vec<Arc<u64>> = (0..64).map(Arc::new).collect();
    for i in 0..operations as u64 {
        let extra = if rng.next_u64() % 4 == 0 {
            Arc::clone(&kept[(rng.next_u64() % 64) as usize])
        } else {
            Arc::new(i)
        };
        let _ = tree.resolve(
            &[Arg::from(state), Arg::Unset, Arg::from(&extra)],
            || Arc::new(i),
        );
    }
}

fn profile_tree(label: &str, prune_interval: usize) {
    println!("=== Profiling IdentityMemoTree ({label}) ===");
    let operations = 100_000;
    let state = Arc::new(0u64);

    let mut tree = IdentityMemoTree::with_prune_interval(prune_interval);

    argument_churn(&mut tree, &state, operations);
    println!("  After churn:       {} leaves, {} nodes", tree.len(), tree.node_count());

    mixed_depth(&mut tree, &state, operations, 42);
    println!("  After mixed depth: {} leaves, {} nodes", tree.len(), tree.node_count());

    let stats = tree.prune();
    println!(
        "  After prune:       {} leaves, {} nodes ({} nodes swept)",
        tree.len(),
        tree.node_count(),
        stats.nodes_removed
    );
}

fn profile_bounded() {
    println!("=== Profiling BoundedValueCache ===");
    let operations = 100_000;
    let universe = 16_384;
    let mut rng = XorShift64::new(7);

    let mut cache: BoundedValueCache<String, Arc<Vec<String>>> =
        BoundedValueCache::new(DEFAULT_KEY_CAPACITY).expect("non-zero capacity");

    for _ in 0..operations {
        let key = format!("entities.{}.name", rng.next_u64() % universe);
        let _ = cache.get_or_compute(key.as_str(), || {
            Arc::new(key.split('.').map(String::from).collect())
        });
    }

    println!("  Final size: {}", cache.len());
}

fn main() {
    let _profiler = dhat::Profiler::new_heap();

    println!("memokit DHAT Heap Profiling");
    println!("===========================\n");

    profile_tree("default sweeps", memokit::builder::DEFAULT_PRUNE_INTERVAL);
    profile_tree("manual prune only", 0);
    profile_bounded();

    println!("\n===========================");
    println!("Profiling complete. Results written to dhat-heap.json");
}
