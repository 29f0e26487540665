#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use memokit::arg::Arg;
use memokit::normalize::{KeyPart, normalize};

// Fuzz argument-list shapes through normalize
//
// Each byte is one position: 0 = unset, 1 = scalar, anything else picks one
// of four shared handles.
fuzz_target!(|data: &[u8]| {
    let pool: Vec<Arc<u8>> = (0..4u8).map(Arc::new).collect();
    let args: Vec<Arg> = data
        .iter()
        .take(32)
        .map(|&byte| match byte % 6 {
            0 => Arg::Unset,
            1 => Arg::from(i64::from(byte)),
            n => Arg::from(&pool[usize::from(n - 2)]),
        })
        .collect();

    let key = normalize(&args);
    let expected_len = args.iter().rposition(|arg| !arg.is_unset()).map_or(0, |i| i + 1);
    assert_eq!(key.len(), expected_len);

    for (position, part) in key.iter().enumerate() {
        match part {
            KeyPart::Absent(absent) => assert_eq!(absent.position(), position),
            KeyPart::Unset => assert!(position >= 3),
            KeyPart::Ref(_) | KeyPart::Scalar(_) => assert!(!args[position].is_unset()),
        }
    }

    let mut padded = args.clone();
    padded.push(Arg::Unset);
    assert!(normalize(&padded).same_key(&key));
});
