//! Identity-keyed memo tree over variable-length argument lists.
//!
//! Resolves an argument list to one cache slot by walking one node per
//! argument, keyed by the argument's allocation identity. Edges hold
//! [`Weak`](std::sync::Weak) handles only: the tree never keeps an argument
//! value alive, and a branch whose argument has been dropped is reclaimed by
//! a sweep instead of an explicit delete.
//!
//! ## Architecture
//!
//! ```text
//!   nodes: SlotArena<MemoNode<V>>          (root owns everything below it)
//!
//!   root ── leaf: f()                      zero-argument slot
//!    │
//!    ├── &a ──► node ── leaf: f(a)         single argument: no marker
//!    │           │
//!    │           ├── &b ──► node ── leaf: f(a, b)       marker {a, b}
//!    │           │           │
//!    │           │           └── &c ──► node ── leaf: f(a, b, c)
//!    │           │                                      marker {a, b, c}
//!    │           └── Secondary ──► node
//!    │                              └── &x ──► node ── leaf: f(a, ∅, x)
//!    └── Primary ──► node
//!                    └── &p ──► node ── leaf: f(∅, p)
//! ```
//!
//! Every node may carry the leaf for the path that ends at it, so `(a, b)`
//! and `(a, b, c)` share two edges but never a leaf. Leaves of paths with two
//! or more positions also carry a [`PathMarker`] naming every participant,
//! checked on lookup and by [`check_invariants`](IdentityMemoTree::check_invariants).
//!
//! ## Reclamation
//!
//! A dead edge (its argument's last strong handle dropped) still pins the
//! argument's allocation, though not its value, so no live argument can
//! reuse that address before the edge is swept. Sweeps happen:
//!
//! - opportunistically, on the node that just gained a child, once its child
//!   count doubles since its previous sweep (amortized O(1) per insert);
//! - as a full [`prune`](IdentityMemoTree::prune) every `prune_interval`
//!   inserts, or whenever the owner calls it.
//!
//! Reclamation is explicit: an edge is only swept once its argument has no
//! strong handle left anywhere. Cached values are owned by the tree, so a
//! value that holds a strong handle to one of its own arguments (a
//! pass-through result such as `args[0].clone()`) keeps that argument, and
//! the whole branch, alive until [`clear`](IdentityMemoTree::clear). Return
//! values derived from the arguments, or hold self-references as
//! [`Weak`](std::sync::Weak).
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use memokit::arg::Arg;
//! use memokit::tree::IdentityMemoTree;
//!
//! let mut tree: IdentityMemoTree<usize> = IdentityMemoTree::new();
//! let state = Arc::new(vec![1, 2, 3]);
//! let mut calls = 0;
//!
//! for _ in 0..3 {
//!     let len = tree
//!         .resolve(&[Arg::from(&state)], || { calls += 1; state.len() })
//!         .unwrap();
//!     assert_eq!(len, 3);
//! }
//! assert_eq!(calls, 1);
//!
//! drop(state);
//! tree.prune();
//! assert!(tree.is_empty());
//! ```
//!
//! ## Thread Safety
//!
//! Not thread-safe. [`Memoized`](crate::memoize::Memoized) wraps a tree in a
//! mutex, computes with the lock released, and stores the result through
//! [`insert_if_absent`](IdentityMemoTree::insert_if_absent) so concurrent
//! first calls on one path agree on a single value.

use std::ops::AddAssign;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::arg::{Arg, Handle, WeakHandle, handle_addr};
use crate::builder::DEFAULT_PRUNE_INTERVAL;
use crate::ds::{SlotArena, SlotId};
use crate::error::MemoError;
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::MemoTreeMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::MemoTreeMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{
    CoreMetricsRecorder, MemoTreeMetricsReadRecorder, MemoTreeMetricsRecorder, MetricsReset,
    MetricsSnapshotProvider,
};
use crate::normalize::{Absent, KeyPart, NormalizedArgs, normalize};
use crate::traits::ReadOnlyCache;

/// Child count below which a node is never swept opportunistically.
const MIN_SWEEP_AT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EdgeKey {
    Ref(usize),
    Absent(Absent),
    Unset,
}

#[derive(Debug)]
struct KeyStep {
    edge: EdgeKey,
    handle: Option<Handle>,
}

/// A validated, normalized key path.
///
/// Holds strong handles to its arguments for as long as it lives, which is
/// what keeps a path alive between lookup and insert.
#[derive(Debug)]
pub struct MemoKey {
    steps: Vec<KeyStep>,
}

impl MemoKey {
    /// Normalizes `args` and validates every position for identity keying.
    ///
    /// # Errors
    ///
    /// [`MemoError::UnsupportedKeyKind`] for any scalar argument.
    pub fn new(args: &[Arg]) -> Result<Self, MemoError> {
        Self::from_normalized(normalize(args))
    }

    pub fn from_normalized(args: NormalizedArgs) -> Result<Self, MemoError> {
        let mut steps = Vec::with_capacity(args.len());
        for (position, part) in args.into_iter().enumerate() {
            let step = match part {
                KeyPart::Ref(handle) => KeyStep {
                    edge: EdgeKey::Ref(handle_addr(&handle)),
                    handle: Some(handle),
                },
                KeyPart::Absent(absent) => KeyStep {
                    edge: EdgeKey::Absent(absent),
                    handle: None,
                },
                KeyPart::Unset => KeyStep {
                    edge: EdgeKey::Unset,
                    handle: None,
                },
                KeyPart::Scalar(scalar) => {
                    return Err(MemoError::UnsupportedKeyKind {
                        position,
                        kind: scalar.kind(),
                    });
                },
            };
            steps.push(step);
        }
        Ok(Self { steps })
    }

    /// Number of positions in the normalized path.
    #[inline]
    pub fn arity(&self) -> usize {
        self.steps.len()
    }

    fn marker(&self) -> Option<PathMarker> {
        (self.arity() >= 2).then(|| PathMarker {
            participants: self
                .steps
                .iter()
                .map(|step| step.handle.as_ref().map(Arc::downgrade))
                .collect(),
        })
    }
}

/// Participants of a multi-position path, one entry per position
/// (`None` for sentinel positions).
#[derive(Debug)]
struct PathMarker {
    participants: Vec<Option<WeakHandle>>,
}

impl PathMarker {
    fn arity(&self) -> usize {
        self.participants.len()
    }
}

#[derive(Debug)]
struct Leaf<V> {
    value: V,
    marker: Option<PathMarker>,
}

impl<V> Leaf<V> {
    fn matches(&self, key: &MemoKey) -> bool {
        match &self.marker {
            Some(marker) => marker.arity() == key.arity(),
            None => key.arity() < 2,
        }
    }
}

#[derive(Debug)]
struct Edge {
    child: SlotId,
    /// `None` for sentinel edges, which never die.
    target: Option<WeakHandle>,
}

impl Edge {
    #[inline]
    fn is_live(&self) -> bool {
        self.target
            .as_ref()
            .is_none_or(|target| target.strong_count() > 0)
    }
}

#[derive(Debug)]
struct MemoNode<V> {
    children: FxHashMap<EdgeKey, Edge>,
    leaf: Option<Leaf<V>>,
    sweep_at: usize,
}

impl<V> MemoNode<V> {
    fn new() -> Self {
        Self {
            children: FxHashMap::default(),
            leaf: None,
            sweep_at: MIN_SWEEP_AT,
        }
    }
}

/// What a sweep removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub nodes_removed: usize,
    pub leaves_removed: usize,
}

impl AddAssign for SweepStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_removed += rhs.nodes_removed;
        self.leaves_removed += rhs.leaves_removed;
    }
}

/// Cache keyed by the identity of an ordered, variable-length argument list.
pub struct IdentityMemoTree<V> {
    nodes: SlotArena<MemoNode<V>>,
    root: SlotId,
    leaves: usize,
    prune_interval: usize,
    inserts_since_prune: usize,
    #[cfg(feature = "metrics")]
    metrics: MemoTreeMetrics,
}

impl<V> IdentityMemoTree<V> {
    /// Creates an empty tree that runs a full sweep every
    /// [`DEFAULT_PRUNE_INTERVAL`] inserts.
    pub fn new() -> Self {
        Self::with_prune_interval(DEFAULT_PRUNE_INTERVAL)
    }

    /// Creates an empty tree that runs a full sweep every `prune_interval`
    /// inserts; `0` leaves full sweeps to explicit [`prune`](Self::prune)
    /// calls.
    pub fn with_prune_interval(prune_interval: usize) -> Self {
        let mut nodes = SlotArena::new();
        let root = nodes.insert(MemoNode::new());
        Self {
            nodes,
            root,
            leaves: 0,
            prune_interval,
            inserts_since_prune: 0,
            #[cfg(feature = "metrics")]
            metrics: MemoTreeMetrics::default(),
        }
    }

    /// Builds the key for `args`, recording rejected keys.
    pub fn key_for(&mut self, args: &[Arg]) -> Result<MemoKey, MemoError> {
        let key = MemoKey::new(args);
        #[cfg(feature = "metrics")]
        if key.is_err() {
            self.metrics.record_unsupported_key();
        }
        key
    }

    /// Returns the value cached for `args`, if any, without computing.
    ///
    /// # Errors
    ///
    /// [`MemoError::UnsupportedKeyKind`] if any argument is a scalar.
    pub fn get(&self, args: &[Arg]) -> Result<Option<&V>, MemoError> {
        let key = MemoKey::new(args)?;
        Ok(self.peek(&key))
    }

    pub fn contains(&self, args: &[Arg]) -> Result<bool, MemoError> {
        self.get(args).map(|value| value.is_some())
    }

    /// Looks up a prepared key without touching hit/miss counters.
    pub fn peek(&self, key: &MemoKey) -> Option<&V> {
        #[cfg(feature = "metrics")]
        (&self.metrics).record_peek_call();

        let leaf = self
            .find_slot(key)
            .and_then(|slot| self.nodes[slot].leaf.as_ref())
            .filter(|leaf| leaf.matches(key))?;

        #[cfg(feature = "metrics")]
        (&self.metrics).record_peek_found();
        Some(&leaf.value)
    }

    /// Looks up a prepared key, counting a hit or a miss.
    pub fn lookup(&mut self, key: &MemoKey) -> Option<V>
    where
        V: Clone,
    {
        let found = self
            .find_slot(key)
            .and_then(|slot| self.nodes[slot].leaf.as_ref())
            .filter(|leaf| leaf.matches(key))
            .map(|leaf| leaf.value.clone());

        #[cfg(feature = "metrics")]
        match found {
            Some(_) => self.metrics.record_hit(),
            None => self.metrics.record_miss(),
        }
        if found.is_none() {
            trace!(arity = key.arity(), "memo tree miss");
        }
        found
    }

    /// Returns the value cached for `args`, computing and storing it on a
    /// miss.
    ///
    /// # Errors
    ///
    /// [`MemoError::UnsupportedKeyKind`] if any argument is a scalar;
    /// `compute` is not called in that case.
    pub fn resolve<F>(&mut self, args: &[Arg], compute: F) -> Result<V, MemoError>
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        self.try_resolve(args, || Ok::<V, MemoError>(compute()))
    }

    /// Fallible variant of [`resolve`](Self::resolve).
    ///
    /// A failing `compute` propagates unchanged and leaves no node or leaf
    /// behind: the path is only created once a value exists.
    pub fn try_resolve<F, E>(&mut self, args: &[Arg], compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
        E: From<MemoError>,
        V: Clone,
    {
        let key = self.key_for(args)?;
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }

        let value = match compute() {
            Ok(value) => value,
            Err(err) => {
                #[cfg(feature = "metrics")]
                self.metrics.record_compute_error();
                return Err(err);
            },
        };
        Ok(self.insert_if_absent(&key, value))
    }

    /// Stores `value` for `key` unless a leaf already exists, and returns the
    /// leaf's value (the existing one wins).
    pub fn insert_if_absent(&mut self, key: &MemoKey, value: V) -> V
    where
        V: Clone,
    {
        let slot = self.slot_for(key);
        let node = &mut self.nodes[slot];
        if let Some(leaf) = node.leaf.as_ref().filter(|leaf| leaf.matches(key)) {
            #[cfg(feature = "metrics")]
            self.metrics.record_insert_race_lost();
            trace!(arity = key.arity(), "memo slot already filled, keeping existing value");
            return leaf.value.clone();
        }

        let replaced = node.leaf.replace(Leaf {
            value: value.clone(),
            marker: key.marker(),
        });
        if replaced.is_none() {
            self.leaves += 1;
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_insert();

        self.inserts_since_prune += 1;
        if self.prune_interval > 0 && self.inserts_since_prune >= self.prune_interval {
            self.prune();
        }
        value
    }

    /// Sweeps every dead edge in the tree, freeing the branches below them.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use memokit::arg::Arg;
    /// use memokit::tree::IdentityMemoTree;
    ///
    /// let mut tree = IdentityMemoTree::with_prune_interval(0);
    /// let state = Arc::new(0u8);
    /// let props = Arc::new(1u8);
    /// tree.resolve(&[Arg::from(&state), Arg::from(&props)], || 1).unwrap();
    /// assert_eq!(tree.node_count(), 3);
    ///
    /// drop(props);
    /// let stats = tree.prune();
    /// assert_eq!(stats.leaves_removed, 1);
    /// assert_eq!(tree.node_count(), 2);
    /// ```
    pub fn prune(&mut self) -> SweepStats {
        let mut stats = SweepStats::default();
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let mut dead = Vec::new();
            let node = &mut self.nodes[id];
            node.children.retain(|_, edge| {
                if edge.is_live() {
                    stack.push(edge.child);
                    true
                } else {
                    dead.push(edge.child);
                    false
                }
            });
            node.sweep_at = next_sweep_at(node.children.len());
            for child in dead {
                stats += self.remove_subtree(child);
            }
        }

        self.inserts_since_prune = 0;
        #[cfg(feature = "metrics")]
        self.metrics
            .record_sweep(stats.nodes_removed, stats.leaves_removed);
        debug!(
            nodes_removed = stats.nodes_removed,
            leaves_removed = stats.leaves_removed,
            nodes = self.nodes.len(),
            leaves = self.leaves,
            "memo tree pruned"
        );
        stats
    }

    /// Number of cached values.
    #[inline]
    pub fn len(&self) -> usize {
        self.leaves
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.leaves == 0
    }

    /// Number of nodes, including the root.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn prune_interval(&self) -> usize {
        self.prune_interval
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.insert(MemoNode::new());
        self.leaves = 0;
        self.inserts_since_prune = 0;
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }

    fn find_slot(&self, key: &MemoKey) -> Option<SlotId> {
        let mut current = self.root;
        for step in &key.steps {
            let edge = self.nodes[current].children.get(&step.edge)?;
            if !edge.is_live() {
                return None;
            }
            current = edge.child;
        }
        Some(current)
    }

    fn slot_for(&mut self, key: &MemoKey) -> SlotId {
        let mut current = self.root;
        for step in &key.steps {
            current = self.child_or_insert(current, step);
        }
        current
    }

    fn child_or_insert(&mut self, parent: SlotId, step: &KeyStep) -> SlotId {
        if let Some(edge) = self.nodes[parent].children.get(&step.edge) {
            // The step's strong handle pins its address, and a dead edge pins
            // its own, so an edge found by address belongs to this argument.
            debug_assert!(edge.is_live(), "edge for a live argument reported dead");
            return edge.child;
        }

        let child = self.nodes.insert(MemoNode::new());
        let edge = Edge {
            child,
            target: step.handle.as_ref().map(Arc::downgrade),
        };
        self.nodes[parent].children.insert(step.edge, edge);
        self.maybe_sweep_children(parent);
        child
    }

    fn maybe_sweep_children(&mut self, id: SlotId) {
        let node = &mut self.nodes[id];
        if node.children.len() < node.sweep_at {
            return;
        }

        let mut dead = Vec::new();
        node.children.retain(|_, edge| {
            let live = edge.is_live();
            if !live {
                dead.push(edge.child);
            }
            live
        });
        node.sweep_at = next_sweep_at(node.children.len());

        let mut stats = SweepStats::default();
        for child in dead {
            stats += self.remove_subtree(child);
        }
        if stats.nodes_removed > 0 {
            #[cfg(feature = "metrics")]
            self.metrics
                .record_sweep(stats.nodes_removed, stats.leaves_removed);
            trace!(
                nodes_removed = stats.nodes_removed,
                leaves_removed = stats.leaves_removed,
                "swept dead siblings"
            );
        }
    }

    fn remove_subtree(&mut self, top: SlotId) -> SweepStats {
        let mut stats = SweepStats::default();
        let mut stack = vec![top];
        while let Some(id) = stack.pop() {
            let node = self.nodes.remove(id).expect("edge/arena out of sync");
            stats.nodes_removed += 1;
            if node.leaf.is_some() {
                stats.leaves_removed += 1;
            }
            stack.extend(node.children.into_values().map(|edge| edge.child));
        }
        self.leaves -= stats.leaves_removed;
        stats
    }

    /// Validates internal invariants (debug-only).
    ///
    /// Checks that every arena node is reachable from the root exactly once,
    /// that the leaf count is accurate, and that every leaf's marker names
    /// exactly the arguments on its path.
    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) -> Result<(), crate::error::InvariantError> {
        use crate::error::InvariantError;

        let mut visited: Vec<SlotId> = Vec::with_capacity(self.nodes.len());
        let mut leaves = 0usize;
        let mut stack: Vec<(SlotId, Vec<EdgeKey>)> = vec![(self.root, Vec::new())];

        while let Some((id, path)) = stack.pop() {
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| InvariantError::new(format!("stale SlotId {:?} on path {:?}", id, path)))?;
            visited.push(id);

            if let Some(leaf) = &node.leaf {
                leaves += 1;
                match (&leaf.marker, path.len()) {
                    (None, depth) if depth < 2 => {},
                    (Some(marker), depth) if depth >= 2 => {
                        if marker.arity() != depth {
                            return Err(InvariantError::new(format!(
                                "marker arity {} on path of depth {}",
                                marker.arity(),
                                depth
                            )));
                        }
                        for (position, (edge, participant)) in
                            path.iter().zip(&marker.participants).enumerate()
                        {
                            let consistent = match (edge, participant) {
                                (EdgeKey::Ref(addr), Some(weak)) => {
                                    weak.as_ptr() as *const () as usize == *addr
                                },
                                (EdgeKey::Ref(_), None) | (_, Some(_)) => false,
                                (_, None) => true,
                            };
                            if !consistent {
                                return Err(InvariantError::new(format!(
                                    "marker participant {} does not match path edge {:?}",
                                    position, edge
                                )));
                            }
                        }
                    },
                    (marker, depth) => {
                        return Err(InvariantError::new(format!(
                            "leaf at depth {} has marker present = {}",
                            depth,
                            marker.is_some()
                        )));
                    },
                }
            }

            for (edge_key, edge) in &node.children {
                if let (EdgeKey::Ref(addr), Some(target)) = (edge_key, &edge.target) {
                    if target.as_ptr() as *const () as usize != *addr {
                        return Err(InvariantError::new(format!(
                            "edge {:?} points at {:#x}",
                            edge_key,
                            target.as_ptr() as *const () as usize
                        )));
                    }
                }
                if !self.nodes.contains(edge.child) {
                    return Err(InvariantError::new(format!(
                        "edge {:?} on path {:?} points at freed node {:?}",
                        edge_key, path, edge.child
                    )));
                }
                let mut child_path = path.clone();
                child_path.push(*edge_key);
                stack.push((edge.child, child_path));
            }
        }

        visited.sort_unstable_by_key(|id| id.index());
        for pair in visited.windows(2) {
            if pair[0] == pair[1] {
                return Err(InvariantError::new(format!(
                    "node {:?} reachable by more than one edge",
                    pair[0]
                )));
            }
        }
        if let Some((orphan, _)) = self
            .nodes
            .iter()
            .find(|(id, _)| visited.binary_search_by_key(&id.index(), |v| v.index()).is_err())
        {
            return Err(InvariantError::new(format!(
                "arena node {:?} is not reachable from the root ({} reachable of {})",
                orphan,
                visited.len(),
                self.nodes.len()
            )));
        }
        if leaves != self.leaves {
            return Err(InvariantError::new(format!(
                "counted {} leaves but leaf count is {}",
                leaves, self.leaves
            )));
        }
        Ok(())
    }
}

fn next_sweep_at(live_children: usize) -> usize {
    (live_children * 2).max(MIN_SWEEP_AT)
}

impl<V> Default for IdentityMemoTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for IdentityMemoTree<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityMemoTree")
            .field("leaves", &self.leaves)
            .field("nodes", &self.nodes.len())
            .field("prune_interval", &self.prune_interval)
            .finish_non_exhaustive()
    }
}

impl<V> ReadOnlyCache for IdentityMemoTree<V> {
    #[inline]
    fn len(&self) -> usize {
        self.leaves
    }

    #[inline]
    fn capacity(&self) -> Option<usize> {
        None
    }
}

#[cfg(feature = "metrics")]
impl<V> MetricsSnapshotProvider<MemoTreeMetricsSnapshot> for IdentityMemoTree<V> {
    fn snapshot(&self) -> MemoTreeMetricsSnapshot {
        MemoTreeMetricsSnapshot {
            hits: self.metrics.hits,
            misses: self.metrics.misses,
            inserts: self.metrics.inserts,
            compute_errors: self.metrics.compute_errors,
            insert_races_lost: self.metrics.insert_races_lost,
            unsupported_keys: self.metrics.unsupported_keys,
            peek_calls: self.metrics.peek_calls.get(),
            peek_found: self.metrics.peek_found.get(),
            sweeps: self.metrics.sweeps,
            swept_nodes: self.metrics.swept_nodes,
            swept_leaves: self.metrics.swept_leaves,
            leaves: self.leaves,
            nodes: self.nodes.len(),
        }
    }
}

#[cfg(feature = "metrics")]
impl<V> MetricsReset for IdentityMemoTree<V> {
    fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}
