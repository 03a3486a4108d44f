/// Caller-owned heap memory whose release is deferred into a draw stream.
pub type HeapBlock = Box<[u8]>;

/// Allocator that receives memory back when a recorded free executes.
///
/// Aligned and unaligned blocks are returned through separate entry points so
/// allocators that keep distinct arenas can route them.
pub trait HeapAllocator: Send + Sync {
    fn deallocate(&self, block: HeapBlock);

    fn deallocate_aligned(&self, block: HeapBlock) {
        self.deallocate(block)
    }
}

/// Hands blocks straight back to the global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl HeapAllocator for SystemAllocator {
    fn deallocate(&self, block: HeapBlock) {
        drop(block);
    }
}
