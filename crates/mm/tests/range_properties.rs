//! Property tests for the range manager.

use cmapool_mm::{
    EvictionScan, Extent, InsertMode, NodeId, RangeAllocator, RangeManager, ScanOutcome,
    ScanParams,
};
use proptest::collection::vec;
use proptest::prelude::*;

const SIZE: u64 = 1 << 16;

fn check_layout(mm: &RangeManager, live: &[(NodeId, Extent)]) -> Result<(), TestCaseError> {
    let mut extents: Vec<Extent> = live.iter().map(|(_, e)| *e).collect();
    extents.sort_by_key(|e| e.start);

    for pair in extents.windows(2) {
        prop_assert!(pair[0].end() <= pair[1].start, "{} overlaps {}", pair[0], pair[1]);
    }
    for extent in &extents {
        prop_assert!(extent.end() <= SIZE);
    }

    let total: u64 = extents.iter().map(|e| e.size).sum();
    prop_assert_eq!(mm.used(), total);
    prop_assert_eq!(mm.node_count(), live.len());

    let holes: u64 = mm.holes().iter().map(|h| h.end - h.start).sum();
    prop_assert_eq!(holes + total, SIZE);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_extents_never_overlap(
        ops in vec((any::<bool>(), 1_u64..8192, 0_u32..4, any::<prop::sample::Index>()), 1..200),
    ) {
        let mut mm = RangeManager::new(0, SIZE).unwrap();
        let mut live: Vec<(NodeId, Extent)> = Vec::new();

        for (insert, size, align_shift, pick) in ops {
            if insert || live.is_empty() {
                let alignment = 1_u64 << (align_shift * 4);
                let mode = if size % 2 == 0 { InsertMode::BestFit } else { InsertMode::Low };

                match mm.insert(size, alignment, 0, mode) {
                    Ok(node) => {
                        let extent = mm.extent(node).unwrap();
                        prop_assert_eq!(extent.size, size);
                        prop_assert_eq!(extent.start % alignment, 0);
                        live.push((node, extent));
                    }
                    Err(e) => prop_assert!(e.is_no_space(), "unexpected {}", e),
                }
            } else {
                let (node, extent) = live.swap_remove(pick.index(live.len()));
                prop_assert_eq!(mm.remove(node).unwrap(), extent);
            }

            check_layout(&mm, &live)?;
        }
    }

    #[test]
    fn prop_feasible_scan_makes_room(
        sizes in vec(256_u64..4096, 4..48),
        request in 1024_u64..16384,
    ) {
        let mut mm = RangeManager::new(0, SIZE).unwrap();
        let mut nodes = Vec::new();
        for size in sizes {
            if let Ok(node) = mm.insert(size, 0, 0, InsertMode::BestFit) {
                nodes.push(node);
            }
        }

        let params = ScanParams::new(request, 0, mm.range());
        let mut scan = EvictionScan::begin(&mut mm, params).unwrap();
        for &node in &nodes {
            if scan.add(node, node).unwrap() {
                break;
            }
        }

        match scan.commit().unwrap() {
            ScanOutcome::Evict(victims) => {
                for node in victims {
                    mm.remove(node).unwrap();
                }
                prop_assert!(mm.insert(request, 0, 0, InsertMode::Evict).is_ok());
            }
            // Every node was offered and the request is smaller than the range
            ScanOutcome::Infeasible => {
                prop_assert!(nodes.is_empty());
            }
        }
        prop_assert!(!mm.scan_in_progress());
    }
}
