use std::sync::Arc;
use std::thread;

use lumen_pages::{PageBlock, PagePool, PagePoolOptions, PAGE_SIZE};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Allocate,
    Deallocate(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Allocate), any::<usize>().prop_map(Op::Deallocate)]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn counters_track_outstanding_blocks(
        max_free in proptest::option::of(0usize..8),
        ops in proptest::collection::vec(op_strategy(), 1..128),
    ) {
        let pool = PagePool::new(PagePoolOptions { preallocate_pages: 2, max_free_pages: max_free });
        let mut held: Vec<PageBlock> = Vec::new();
        let mut peak = 0usize;

        for op in ops {
            match op {
                Op::Allocate => {
                    let block = pool.allocate();
                    prop_assert_eq!(block.len(), PAGE_SIZE);
                    held.push(block);
                    peak = peak.max(held.len());
                }
                Op::Deallocate(idx) => {
                    if !held.is_empty() {
                        let block = held.swap_remove(idx % held.len());
                        pool.deallocate(block);
                    }
                }
            }

            let stats = pool.stats();
            prop_assert_eq!(stats.live, held.len() as u64);
            if let Some(max) = max_free {
                prop_assert!(stats.free <= max as u64);
            }
        }

        let stats = pool.stats();
        prop_assert_eq!(stats.peak_live, peak as u64);
        prop_assert_eq!(stats.created, stats.live + stats.free + stats.released);
    }
}

#[test]
fn concurrent_recorders_share_one_pool() {
    let pool = Arc::new(PagePool::default());
    let threads: Vec<_> = (0..4u8)
        .map(|tag| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut blocks: Vec<PageBlock> = (0..3).map(|_| pool.allocate()).collect();
                    for block in &mut blocks {
                        block.fill(tag);
                    }
                    assert!(blocks.iter().all(|b| b.iter().all(|&x| x == tag)));
                    let mut guard = pool.lock();
                    for block in blocks {
                        guard.deallocate(block);
                    }
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }

    let stats = pool.stats();
    assert_eq!(stats.live, 0);
    assert_eq!(stats.allocated, 4 * 200 * 3);
    assert!(stats.peak_live <= 12);
}
