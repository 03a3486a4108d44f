use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::stats::{PagePoolStats, PoolCounters};

/// Size of every block handed out by [`PagePool`].
pub const PAGE_SIZE: usize = 4096;

/// One pool page. Always exactly [`PAGE_SIZE`] bytes.
pub type PageBlock = Box<[u8; PAGE_SIZE]>;

/// Tuning knobs for [`PagePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePoolOptions {
    /// Number of blocks allocated up front and parked on the free list.
    /// Clamped to `max_free_pages`.
    pub preallocate_pages: usize,
    /// Upper bound on the free list. Blocks returned beyond this are released
    /// to the system allocator. `None` keeps every returned block.
    pub max_free_pages: Option<usize>,
}

impl Default for PagePoolOptions {
    fn default() -> Self {
        Self {
            preallocate_pages: 0,
            max_free_pages: None,
        }
    }
}

struct FreeList {
    blocks: Vec<PageBlock>,
}

/// Thread-safe pool of [`PAGE_SIZE`] blocks.
///
/// `allocate`/`deallocate` acquire the pool lock for the duration of the call.
/// Callers returning or taking many blocks at once should hold a
/// [`PagePoolGuard`] instead so the lock is taken once.
pub struct PagePool {
    free: Mutex<FreeList>,
    options: PagePoolOptions,
    counters: PoolCounters,
}

impl Default for PagePool {
    fn default() -> Self {
        Self::new(PagePoolOptions::default())
    }
}

impl PagePool {
    pub fn new(options: PagePoolOptions) -> Self {
        let preallocated = options
            .max_free_pages
            .map_or(options.preallocate_pages, |max| options.preallocate_pages.min(max));
        let mut blocks = Vec::with_capacity(preallocated);
        blocks.resize_with(preallocated, new_block);

        let pool = Self {
            free: Mutex::new(FreeList { blocks }),
            options,
            counters: PoolCounters::default(),
        };
        pool.counters.add_created(preallocated as u64);
        tracing::debug!(
            preallocated,
            max_free = ?options.max_free_pages,
            "page pool created"
        );
        pool
    }

    pub fn options(&self) -> PagePoolOptions {
        self.options
    }

    /// Acquire the pool lock. Dropping the guard releases it.
    pub fn lock(&self) -> PagePoolGuard<'_> {
        let free = match self.free.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        PagePoolGuard { pool: self, free }
    }

    /// Take one block, locking the pool for the duration of the call.
    pub fn allocate(&self) -> PageBlock {
        self.lock().allocate()
    }

    /// Return one block, locking the pool for the duration of the call.
    pub fn deallocate(&self, block: PageBlock) {
        self.lock().deallocate(block)
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PagePoolStats {
        let free = self.lock().free_pages();
        self.counters.snapshot(free)
    }
}

impl fmt::Debug for PagePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagePool")
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Exclusive access to the pool's free list.
///
/// Operations through the guard never re-lock the pool.
pub struct PagePoolGuard<'a> {
    pool: &'a PagePool,
    free: MutexGuard<'a, FreeList>,
}

impl PagePoolGuard<'_> {
    pub fn allocate(&mut self) -> PageBlock {
        let block = match self.free.blocks.pop() {
            Some(block) => block,
            None => {
                self.pool.counters.add_created(1);
                new_block()
            }
        };
        self.pool.counters.on_allocate();
        block
    }

    pub fn deallocate(&mut self, block: PageBlock) {
        self.pool.counters.on_deallocate();
        let keep = match self.pool.options.max_free_pages {
            Some(max) => self.free.blocks.len() < max,
            None => true,
        };
        if keep {
            self.free.blocks.push(block);
        } else {
            self.pool.counters.add_released(1);
        }
    }

    /// Number of blocks currently parked on the free list.
    pub fn free_pages(&self) -> usize {
        self.free.blocks.len()
    }
}

fn new_block() -> PageBlock {
    Box::new([0u8; PAGE_SIZE])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_recycles_returned_blocks() {
        let pool = PagePool::default();
        let mut block = pool.allocate();
        block[0] = 0xAB;
        let addr = block.as_ptr();
        pool.deallocate(block);

        let again = pool.allocate();
        assert_eq!(again.as_ptr(), addr);
        // Recycled blocks are handed back untouched.
        assert_eq!(again[0], 0xAB);

        let stats = pool.stats();
        assert_eq!(stats.allocated, 2);
        assert_eq!(stats.deallocated, 1);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.live, 1);
    }

    #[test]
    fn preallocated_blocks_are_served_first() {
        let pool = PagePool::new(PagePoolOptions {
            preallocate_pages: 3,
            max_free_pages: None,
        });
        assert_eq!(pool.stats().free, 3);

        let blocks: Vec<_> = (0..3).map(|_| pool.allocate()).collect();
        let stats = pool.stats();
        assert_eq!(stats.created, 3);
        assert_eq!(stats.free, 0);
        assert_eq!(stats.live, 3);
        drop(blocks);
    }

    #[test]
    fn preallocation_respects_free_list_cap() {
        let pool = PagePool::new(PagePoolOptions {
            preallocate_pages: 8,
            max_free_pages: Some(2),
        });
        let stats = pool.stats();
        assert_eq!(stats.free, 2);
        assert_eq!(stats.created, 2);
    }

    #[test]
    fn free_list_is_capped() {
        let pool = PagePool::new(PagePoolOptions {
            preallocate_pages: 0,
            max_free_pages: Some(1),
        });
        let a = pool.allocate();
        let b = pool.allocate();
        {
            let mut guard = pool.lock();
            guard.deallocate(a);
            guard.deallocate(b);
            assert_eq!(guard.free_pages(), 1);
        }

        let stats = pool.stats();
        assert_eq!(stats.released, 1);
        assert_eq!(stats.live, 0);
        assert_eq!(stats.peak_live, 2);
    }

    #[test]
    fn guard_batches_operations_under_one_lock() {
        let pool = PagePool::default();
        let mut guard = pool.lock();
        let blocks: Vec<_> = (0..4).map(|_| guard.allocate()).collect();
        for block in blocks {
            guard.deallocate(block);
        }
        assert_eq!(guard.free_pages(), 4);
        drop(guard);

        assert_eq!(pool.stats().live, 0);
    }
}
