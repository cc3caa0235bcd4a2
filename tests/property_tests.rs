use compact_idset::{Block, CompactIdSet, Error};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Ascending ids built from independent gaps: lumpy and sparse, rarely dense.
fn gapped_ids() -> impl Strategy<Value = Vec<u64>> {
    let gap = prop_oneof![
        6 => Just(1u64),
        3 => 1..8u64,
        2 => 8..200u64,
        1 => 200..100_000u64,
    ];
    (0..1_000u64, prop::collection::vec(gap, 0..600)).prop_map(|(start, gaps)| {
        let mut ids = vec![start];
        for g in gaps {
            let next = ids[ids.len() - 1] + g;
            ids.push(next);
        }
        ids
    })
}

/// Ascending ids built from whole stretches: a dense run long enough to
/// compact, a sprinkle of small gaps, then a jump of varying size.
fn segmented_ids() -> impl Strategy<Value = Vec<u64>> {
    let jump = prop_oneof![1..4u64, 4..300u64, 300..100_000u64];
    let segment = (
        200..700u64,
        prop::collection::vec(1..8u64, 0..20),
        jump,
    );
    (0..1_000u64, prop::collection::vec(segment, 1..5)).prop_map(|(start, segments)| {
        let mut ids = vec![start];
        let mut last = start;
        for (dense, gaps, jump) in segments {
            let steps = std::iter::repeat(1).take(dense as usize).chain(gaps).chain([jump]);
            for step in steps {
                last += step;
                ids.push(last);
            }
        }
        ids
    })
}

fn ascending_ids() -> impl Strategy<Value = Vec<u64>> {
    prop_oneof![gapped_ids(), segmented_ids()]
}

proptest! {
    #[test]
    fn test_roundtrip_property(ids in ascending_ids()) {
        let set = CompactIdSet::from_sorted(ids.iter().copied()).unwrap();
        prop_assert_eq!(set.to_vec(), ids.clone());
        prop_assert_eq!(set.count() as usize, ids.len());
        prop_assert_eq!(set.iter().size_hint(), (ids.len(), Some(ids.len())));
        prop_assert_eq!(set.first(), ids.first().copied());
        prop_assert_eq!(set.last(), ids.last().copied());
    }

    #[test]
    fn test_membership_property(ids in ascending_ids()) {
        let set = CompactIdSet::from_sorted(ids.iter().copied()).unwrap();
        let reference: BTreeSet<u64> = ids.iter().copied().collect();
        let max = *ids.last().unwrap();

        // Dense checks near the start, then a stride across the rest.
        let dense_end = max.min(ids[0] + 2_000);
        for id in 0..=dense_end {
            prop_assert_eq!(set.contains(id), reference.contains(&id), "id {}", id);
        }
        let stride = ((max - dense_end) / 4_000).max(1) as usize;
        for id in (dense_end..=max).step_by(stride) {
            prop_assert_eq!(set.contains(id), reference.contains(&id), "id {}", id);
        }
        for &id in &ids {
            prop_assert!(set.contains(id));
            prop_assert_eq!(set.contains(id + 1), reference.contains(&(id + 1)));
            if id > 0 {
                prop_assert_eq!(set.contains(id - 1), reference.contains(&(id - 1)));
            }
        }
        prop_assert!(!set.contains(max + 1));
    }

    #[test]
    fn test_out_of_order_property(ids in ascending_ids(), pick in any::<prop::sample::Index>()) {
        let mut set = CompactIdSet::from_sorted(ids.iter().copied()).unwrap();
        let before = set.clone();
        let max = *ids.last().unwrap();
        let bad = ids[pick.index(ids.len())];

        prop_assert_eq!(set.push(bad), Err(Error::OutOfOrder { id: bad, max }));
        prop_assert_eq!(set.push(max), Err(Error::OutOfOrder { id: max, max }));
        prop_assert_eq!(&set, &before);
        prop_assert_eq!(set.to_vec(), ids);
    }

    #[test]
    fn test_layout_invariants_property(ids in ascending_ids()) {
        let set = CompactIdSet::from_sorted(ids.iter().copied()).unwrap();
        let index = set.block_index();
        let buffer = set.buffer();

        prop_assert_eq!(index[0], 1);
        prop_assert!(index.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(buffer[0], ids.len() as u64);

        let mut total = 0u64;
        let mut prev: Option<u64> = None;
        for block in set.blocks() {
            if let Block::Bitmask { words, .. } = block {
                prop_assert_eq!(words[0] & 1, 1);
            }
            if let Some(p) = prev {
                prop_assert!(block.first() > p);
            }
            prop_assert_eq!(block.iter().next(), Some(block.first()));
            prev = block.last();
            prop_assert!(prev.is_some());
            total += block.len();
        }
        prop_assert_eq!(total, set.count());
    }

    #[test]
    fn test_serialization_property(ids in ascending_ids()) {
        let set = CompactIdSet::from_sorted(ids.iter().copied()).unwrap();

        let back = CompactIdSet::from_bytes(&set.to_bytes()).unwrap();
        prop_assert_eq!(&back, &set);

        let (index, buffer) = set.clone().into_parts();
        let back = CompactIdSet::from_parts(index, buffer).unwrap();
        prop_assert_eq!(back.to_vec(), ids);
    }

    #[test]
    fn test_dense_stretches_become_runs(
        segments in prop::collection::vec((256..700u64, any::<bool>(), 300..10_000u64), 1..5),
    ) {
        // Each stretch starts a fresh block. An anchored stretch has a lone id
        // 64 below it, so compaction splits a run off the anchor's bitmask.
        let mut ids = Vec::new();
        let mut next = 0u64;
        for &(dense, anchored, jump) in &segments {
            if anchored {
                ids.push(next);
                next += 64;
            }
            ids.extend(next..next + dense);
            next += dense + jump;
        }

        let set = CompactIdSet::from_sorted(ids.iter().copied()).unwrap();
        let blocks: Vec<Block<'_>> = set.blocks().collect();
        let anchors = segments.iter().filter(|s| s.1).count();
        prop_assert_eq!(blocks.len(), segments.len() + anchors);

        let runs: Vec<u64> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Run { len, .. } => Some(*len),
                _ => None,
            })
            .collect();
        let expected: Vec<u64> = segments.iter().map(|s| s.0).collect();
        prop_assert_eq!(runs, expected);
        prop_assert_eq!(set.to_vec(), ids);
    }

    #[test]
    fn test_from_bytes_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = CompactIdSet::from_bytes(&bytes);
    }
}

#[test]
fn test_consecutive_ids_compact() {
    let mut set = CompactIdSet::new();
    for id in 0..256 {
        set.push(id).unwrap();
    }
    assert_eq!(set.to_vec(), (0..256).collect::<Vec<_>>());
    assert!((0..256).all(|id| set.contains(id)));
    assert!(!set.contains(256));
    assert!(!set.contains(u64::MAX));

    // Same run shifted up, so there is room to query below it.
    let shifted = CompactIdSet::from_sorted(1_000..1_256).unwrap();
    assert!(!shifted.contains(999));
    assert!(shifted.contains(1_000));
    assert!(shifted.contains(1_255));
    assert!(!shifted.contains(1_256));
}

#[test]
fn test_long_dense_stream_stays_small() {
    let set = CompactIdSet::from_sorted(0..1_000_000).unwrap();
    assert_eq!(set.count(), 1_000_000);
    assert!(set.buffer().len() < 64);
    assert!(set.contains(999_999));
    assert!(!set.contains(1_000_000));
}

#[test]
fn test_sparse_ids_stay_small() {
    let set = CompactIdSet::from_sorted([0, 10_000, 20_000]).unwrap();
    assert_eq!(set.to_vec(), vec![0, 10_000, 20_000]);
    assert_eq!(set.buffer().len(), 4);
}
