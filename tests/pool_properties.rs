//! Property tests for the pool invariants under random command sequences.

use std::collections::HashSet;

use cmapool::{Advice, BufferId, BufferPool, PoolConfig};
use proptest::collection::vec;
use proptest::prelude::*;

const POOL_SIZE: u64 = 4096;

#[derive(Debug, Clone)]
enum Op {
    Create { id: u8, size: u64, pinned: bool },
    Destroy(u8),
    AddUsecnt(u8),
    RemoveUsecnt(u8),
    Use(u8),
    Madvise(u8, bool),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0_u8..16, 1_u64..2048, prop::bool::weighted(0.1))
            .prop_map(|(id, size, pinned)| Op::Create { id, size, pinned }),
        1 => (0_u8..16).prop_map(Op::Destroy),
        1 => (0_u8..16).prop_map(Op::AddUsecnt),
        1 => (0_u8..16).prop_map(Op::RemoveUsecnt),
        3 => (0_u8..16).prop_map(Op::Use),
        1 => (0_u8..16, any::<bool>()).prop_map(|(id, dontneed)| Op::Madvise(id, dontneed)),
    ]
}

fn apply(pool: &mut BufferPool, op: &Op) -> cmapool::Result<()> {
    match *op {
        Op::Create { id, size, pinned } => pool.create(BufferId::new(id.into()), size, pinned),
        Op::Destroy(id) => pool.destroy(BufferId::new(id.into())),
        Op::AddUsecnt(id) => pool.add_usecnt(BufferId::new(id.into())),
        Op::RemoveUsecnt(id) => pool.remove_usecnt(BufferId::new(id.into())),
        Op::Use(id) => pool.use_buffer(BufferId::new(id.into())),
        Op::Madvise(id, dontneed) => {
            let advice = if dontneed {
                Advice::DontNeed
            } else {
                Advice::WillNeed
            };
            pool.set_advice(BufferId::new(id.into()), advice)
        }
    }
}

/// Paged-in buffers that neither purge nor eviction may touch.
fn protected(pool: &BufferPool) -> HashSet<BufferId> {
    pool.buffers()
        .filter(|b| b.is_paged_in() && (b.is_pinned() || b.is_in_use()))
        .map(|b| b.id())
        .collect()
}

fn destroyed_id(op: &Op) -> Option<BufferId> {
    match *op {
        Op::Destroy(id) => Some(BufferId::new(id.into())),
        _ => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_invariants_hold_for_random_sequences(ops in vec(op_strategy(), 1..128)) {
        let mut pool = BufferPool::new(PoolConfig::new(POOL_SIZE).with_alignment(1)).unwrap();

        for op in &ops {
            let before = protected(&pool);

            if let Err(e) = apply(&mut pool, op) {
                prop_assert!(!e.is_fatal(), "fatal error on {:?}: {}", op, e);
            }

            for buffer in pool.buffers() {
                prop_assert_eq!(buffer.is_paged_in(), pool.is_tracked(buffer.id()));
            }
            prop_assert!(pool.used_bytes() <= POOL_SIZE);
            prop_assert_eq!(pool.paged_in_count(), pool.mru_order().len());

            let destroyed = destroyed_id(op);
            for id in before {
                if Some(id) != destroyed {
                    prop_assert!(pool.is_paged_in(id), "protected buffer {} lost its extent", id);
                }
            }
        }

        prop_assert!(pool.shutdown().is_ok());
    }

    #[test]
    fn prop_purge_is_idempotent(ops in vec(op_strategy(), 1..64)) {
        let mut pool = BufferPool::new(PoolConfig::new(POOL_SIZE).with_alignment(1)).unwrap();
        for op in &ops {
            let _ = apply(&mut pool, op);
        }

        pool.purge().unwrap();
        let used = pool.used_bytes();
        let order = pool.mru_order();

        prop_assert_eq!(pool.purge().unwrap(), 0);
        prop_assert_eq!(pool.used_bytes(), used);
        prop_assert_eq!(pool.mru_order(), order);
    }
}
