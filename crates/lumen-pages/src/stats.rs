use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of [`PagePool`](crate::PagePool) counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PagePoolStats {
    /// Blocks handed out by `allocate` (including recycled ones).
    pub allocated: u64,
    /// Blocks given back through `deallocate`.
    pub deallocated: u64,
    /// Blocks obtained from the system allocator.
    pub created: u64,
    /// Blocks dropped because the free list was full.
    pub released: u64,
    /// Blocks currently owned by callers.
    pub live: u64,
    /// Highest `live` value observed.
    pub peak_live: u64,
    /// Blocks parked on the free list.
    pub free: u64,
}

/// Lock-free counters; updated while the pool lock is held but readable
/// without it.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    allocated: AtomicU64,
    deallocated: AtomicU64,
    created: AtomicU64,
    released: AtomicU64,
    peak_live: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn on_allocate(&self) {
        let allocated = self.allocated.fetch_add(1, Ordering::Relaxed) + 1;
        let live = allocated.saturating_sub(self.deallocated.load(Ordering::Relaxed));
        self.peak_live.fetch_max(live, Ordering::Relaxed);
    }

    pub(crate) fn on_deallocate(&self) {
        self.deallocated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_created(&self, n: u64) {
        self.created.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_released(&self, n: u64) {
        self.released.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, free: usize) -> PagePoolStats {
        let allocated = self.allocated.load(Ordering::Relaxed);
        let deallocated = self.deallocated.load(Ordering::Relaxed);
        PagePoolStats {
            allocated,
            deallocated,
            created: self.created.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            live: allocated.saturating_sub(deallocated),
            peak_live: self.peak_live.load(Ordering::Relaxed),
            free: free as u64,
        }
    }
}
