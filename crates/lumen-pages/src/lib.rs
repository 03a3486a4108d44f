//! Fixed-size page pool shared by draw stream recorders.
//!
//! Every recorder carves its instruction bytes out of [`PageBlock`]s handed out
//! by a single [`PagePool`]. Blocks are always exactly [`PAGE_SIZE`] bytes; the
//! pool never hands out anything else. The pool is the only piece of shared
//! mutable state between recorders, so all of its bookkeeping happens behind
//! one lock (see [`PagePool::lock`] for batching several operations under a
//! single acquisition).
//!
//! [`HeapAllocator`] is the companion contract for deferred frees of
//! caller-owned memory recorded into a stream.

#![forbid(unsafe_code)]

mod heap;
mod pool;
mod stats;

pub use heap::{HeapAllocator, HeapBlock, SystemAllocator};
pub use pool::{PageBlock, PagePool, PagePoolGuard, PagePoolOptions, PAGE_SIZE};
pub use stats::PagePoolStats;
