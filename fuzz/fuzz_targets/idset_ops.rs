#![no_main]
use compact_idset::{CompactIdSet, Error};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<u16>, Vec<u64>, Vec<u8>)| {
    let (gaps, queries, raw) = data;

    // Build from gaps so ids are ascending; a zero gap must be rejected.
    let mut set = CompactIdSet::new();
    let mut reference: Vec<u64> = Vec::new();
    let mut next = 0u64;
    for (i, &g) in gaps.iter().enumerate() {
        if i > 0 {
            next = match next.checked_add(u64::from(g)) {
                Some(n) => n,
                None => break,
            };
        }
        match set.push(next) {
            Ok(()) => reference.push(next),
            Err(Error::OutOfOrder { id, max }) => {
                assert_eq!(g, 0);
                assert_eq!(id, max);
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(set.count() as usize, reference.len());
    assert_eq!(set.to_vec(), reference);

    for &q in &queries {
        assert_eq!(set.contains(q), reference.binary_search(&q).is_ok());
    }

    let back = CompactIdSet::from_bytes(&set.to_bytes()).expect("roundtrip");
    assert_eq!(back, set);

    // Arbitrary bytes must either decode into a usable set or be rejected.
    if let Ok(other) = CompactIdSet::from_bytes(&raw) {
        // A valid run can legitimately claim billions of ids.
        if other.count() > 1 << 16 {
            return;
        }
        let ids = other.to_vec();
        assert_eq!(ids.len() as u64, other.count());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for &id in &ids {
            assert!(other.contains(id));
        }
    }
});
