#![no_main]

use std::collections::HashMap;
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use memokit::arg::Arg;
use memokit::tree::IdentityMemoTree;

const POOL: usize = 6;

// Fuzz arbitrary operation sequences on IdentityMemoTree
//
// Arguments come from a small pool of handles that can be dropped and
// replaced. A model keyed by (slot, generation) tracks which argument lists
// must hit and which value they must return.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let interval = usize::from(data[0] % 4) * 8;
    let mut tree: IdentityMemoTree<u32> = IdentityMemoTree::with_prune_interval(interval);
    let mut pool: Vec<Arc<u8>> = (0..POOL as u8).map(Arc::new).collect();
    let mut generations = [0u32; POOL];
    let mut model: HashMap<Vec<Option<(usize, u32)>>, u32> = HashMap::new();
    let mut next_value = 0u32;

    let mut idx = 1;
    while idx + 1 < data.len() {
        let op = data[idx] % 5;
        let arg_bytes = data[idx + 1];

        match op {
            0 | 1 => {
                // resolve: low 3 bits = length, upper bits pick slots
                let len = usize::from(arg_bytes % 6);
                let mut args = Vec::with_capacity(len);
                let mut key = Vec::with_capacity(len);
                for position in 0..len {
                    let pick = usize::from(arg_bytes.rotate_left(position as u32 + 3)) % (POOL + 1);
                    if pick == POOL {
                        args.push(Arg::Unset);
                        key.push(None);
                    } else {
                        args.push(Arg::from(&pool[pick]));
                        key.push(Some((pick, generations[pick])));
                    }
                }
                while key.last() == Some(&None) {
                    key.pop();
                }

                let candidate = next_value;
                let got = tree.resolve(&args, || candidate).unwrap();
                match model.get(&key) {
                    Some(&expected) => assert_eq!(got, expected, "hit returned a different value"),
                    None => {
                        assert_eq!(got, candidate, "miss did not store the computed value");
                        model.insert(key, candidate);
                        next_value += 1;
                    }
                }
            }
            2 => {
                // drop and replace one handle
                let slot = usize::from(arg_bytes) % POOL;
                pool[slot] = Arc::new(arg_bytes);
                generations[slot] += 1;
                let dead = (slot, generations[slot] - 1);
                model.retain(|key, _| !key.contains(&Some(dead)));
            }
            3 => {
                // prune
                tree.prune();
                assert!(tree.len() <= model.len());
            }
            4 => {
                // clear
                tree.clear();
                model.clear();
                assert!(tree.is_empty());
                assert_eq!(tree.node_count(), 1);
            }
            _ => unreachable!(),
        }

        // every live cached list is still reachable
        assert!(tree.len() >= model.len());
        #[cfg(debug_assertions)]
        tree.check_invariants().unwrap();

        idx += 2;
    }

    tree.prune();
    assert_eq!(tree.len(), model.len());
});
