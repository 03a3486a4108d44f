//! Shared helpers for `lumen-draw-stream` integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lumen_draw_stream::{DrawStream, StreamContext};
use lumen_gpu::{Call, CallLog};
use lumen_pages::{HeapAllocator, HeapBlock, PagePool};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

pub fn context() -> Arc<StreamContext> {
    StreamContext::with_pool(Arc::new(PagePool::default()))
}

pub fn stream() -> DrawStream {
    DrawStream::new(context())
}

/// Runs `stream` against a fresh [`CallLog`] and returns the recorded calls.
pub fn replay(stream: &mut DrawStream) -> Vec<Call> {
    let mut log = CallLog::new();
    stream.run(&mut log);
    log.take()
}

/// Counts blocks handed back through each entry point.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    pub unaligned: AtomicUsize,
    pub aligned: AtomicUsize,
}

impl CountingAllocator {
    pub fn unaligned(&self) -> usize {
        self.unaligned.load(Ordering::SeqCst)
    }

    pub fn aligned(&self) -> usize {
        self.aligned.load(Ordering::SeqCst)
    }
}

impl HeapAllocator for CountingAllocator {
    fn deallocate(&self, _block: HeapBlock) {
        self.unaligned.fetch_add(1, Ordering::SeqCst);
    }

    fn deallocate_aligned(&self, _block: HeapBlock) {
        self.aligned.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn block(len: usize) -> HeapBlock {
    vec![0u8; len].into_boxed_slice()
}
