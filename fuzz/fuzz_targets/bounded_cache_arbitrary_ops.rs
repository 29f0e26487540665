#![no_main]

use std::collections::VecDeque;

use libfuzzer_sys::fuzz_target;
use memokit::bounded::BoundedValueCache;

// Fuzz arbitrary operation sequences on BoundedValueCache
//
// Checks FIFO eviction against a VecDeque model: hits never reorder, a miss
// appends, and overflow removes from the front.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let capacity = usize::from(data[0] % 16) + 1;
    let mut cache: BoundedValueCache<u8, u16> = BoundedValueCache::new(capacity).unwrap();
    let mut model: VecDeque<u8> = VecDeque::new();

    let mut idx = 1;
    while idx + 1 < data.len() {
        let op = data[idx] % 5;
        let key = data[idx + 1] % 32;

        match op {
            0 | 1 => {
                // get_or_compute
                let was_cached = model.contains(&key);
                let mut computed = false;
                let value = cache.get_or_compute(&key, || {
                    computed = true;
                    u16::from(key) * 3
                });
                assert_eq!(value, u16::from(key) * 3);
                assert_eq!(computed, !was_cached);
                if !was_cached {
                    model.push_back(key);
                    while model.len() > capacity {
                        model.pop_front();
                    }
                }
            }
            2 => {
                // failing compute never inserts
                let before = cache.len();
                let result = cache.try_get_or_compute(&key, || Err::<u16, ()>(()));
                if model.contains(&key) {
                    assert!(result.is_ok());
                } else {
                    assert!(result.is_err());
                    assert_eq!(cache.len(), before);
                }
            }
            3 => {
                // pop_oldest
                let popped = cache.pop_oldest().map(|(k, _)| k);
                assert_eq!(popped, model.pop_front());
            }
            4 => {
                // clear
                cache.clear();
                model.clear();
                assert!(cache.is_empty());
            }
            _ => unreachable!(),
        }

        assert!(cache.len() <= capacity);
        assert_eq!(cache.len(), model.len());
        assert!(cache.keys().copied().eq(model.iter().copied()));

        idx += 2;
    }
});
