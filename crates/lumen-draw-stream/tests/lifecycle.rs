mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lumen_draw_stream::{Dirty, DrawStream, StreamContext, StreamError};
use lumen_gpu::{BufferHandle, Call, ProgramHandle};
use lumen_pages::{PagePool, PagePoolOptions};
use pretty_assertions::assert_eq;

use common::{block, context, replay, CountingAllocator};

fn fill_pages(s: &mut DrawStream, pages: usize) {
    while s.page_count() < pages {
        s.viewport(0, 0, 1, 1);
    }
}

#[test]
fn drop_returns_every_page_to_the_pool() {
    let pool = Arc::new(PagePool::default());
    let ctx = StreamContext::with_pool(Arc::clone(&pool));
    {
        let mut s = DrawStream::new(ctx);
        fill_pages(&mut s, 4);
        assert_eq!(pool.stats().live, 4);
    }
    let stats = pool.stats();
    assert_eq!(stats.live, 0);
    assert_eq!(stats.free, 4);
}

#[test]
fn reset_reuses_pooled_pages() {
    common::init_tracing();
    let pool = Arc::new(PagePool::default());
    let mut s = DrawStream::new(StreamContext::with_pool(Arc::clone(&pool)));
    fill_pages(&mut s, 3);
    s.draw_arrays(0, 3);
    let _ = replay(&mut s);
    assert!(s.is_executed());

    s.reset();
    assert!(!s.is_executed());
    assert_eq!(s.page_count(), 1);
    assert_eq!(pool.stats().live, 1);

    fill_pages(&mut s, 3);
    assert_eq!(pool.stats().created, 3, "pages should come from the free list");

    s.reset();
    s.draw_arrays(9, 3);
    assert_eq!(
        replay(&mut s),
        vec![Call::DrawArrays {
            offset: 9,
            count: 3
        }]
    );
}

#[test]
fn empty_recording_after_reset_replays_nothing() {
    let mut s = DrawStream::new(context());
    s.use_program(ProgramHandle(2));
    s.draw_arrays(0, 3);
    s.update_buffer(BufferHandle(1), vec![1u8, 2]);
    assert_eq!(replay(&mut s).len(), 3);

    s.reset();
    assert_eq!(replay(&mut s), Vec::<Call>::new());
}

#[test]
#[should_panic(expected = "cannot record into an executed draw stream")]
fn recording_after_run_panics() {
    let mut s = DrawStream::new(context());
    let _ = replay(&mut s);
    s.draw_arrays(0, 3);
}

#[test]
#[should_panic(expected = "cannot record into an executed draw stream")]
fn binding_after_run_panics() {
    let mut s = DrawStream::new(context());
    let _ = replay(&mut s);
    s.use_program(ProgramHandle(1));
}

#[test]
fn reset_discards_pending_binds() {
    let mut s = DrawStream::new(context());
    s.use_program(ProgramHandle(4));
    s.reset();
    assert_eq!(s.pending_binds(), Dirty::empty());
    s.draw_arrays(0, 3);
    assert_eq!(replay(&mut s).len(), 1);
}

#[test]
fn pool_free_list_cap_releases_surplus_pages() {
    let pool = Arc::new(PagePool::new(PagePoolOptions {
        max_free_pages: Some(1),
        ..PagePoolOptions::default()
    }));
    let mut s = DrawStream::new(StreamContext::with_pool(Arc::clone(&pool)));
    fill_pages(&mut s, 3);
    drop(s);

    let stats = pool.stats();
    assert_eq!(stats.free, 1);
    assert_eq!(stats.released, 2);
}

#[test]
fn executed_frees_reach_their_allocator() {
    let allocator = Arc::new(CountingAllocator::default());
    let mut s = DrawStream::new(context());
    s.free_memory(block(16), allocator.clone());
    s.free_aligned_memory(block(64), allocator.clone());
    s.free_aligned_memory(block(64), allocator.clone());

    assert!(replay(&mut s).is_empty());
    assert_eq!(allocator.unaligned(), 1);
    assert_eq!(allocator.aligned(), 2);
}

#[test]
fn unexecuted_stream_drops_side_payloads_without_calling_allocator() {
    let allocator = Arc::new(CountingAllocator::default());
    let called = Arc::new(AtomicBool::new(false));
    let pool = Arc::new(PagePool::default());
    let ctx = StreamContext::with_pool(Arc::clone(&pool));
    {
        let mut s = DrawStream::new(Arc::clone(&ctx));
        s.free_memory(block(32), allocator.clone());
        s.update_buffer(BufferHandle(1), vec![0u8; 128]);
        let flag = Arc::clone(&called);
        s.push_function(&[], move |_| flag.store(true, Ordering::SeqCst))
            .unwrap();

        let mut child = s.create_substream();
        fill_pages(&mut child, 2);
        s.push_substream(child);
        assert_eq!(pool.stats().live, 3);
    }

    assert_eq!(allocator.unaligned(), 0);
    assert!(!called.load(Ordering::SeqCst));
    assert_eq!(pool.stats().live, 0);
    assert_eq!(Arc::strong_count(&allocator), 1);
}

#[test]
fn reset_drops_side_payloads_of_unexecuted_stream() {
    let allocator = Arc::new(CountingAllocator::default());
    let mut s = DrawStream::new(context());
    s.free_memory(block(8), allocator.clone());
    let child = s.create_substream();
    s.push_substream(child);
    assert_eq!(s.side_payloads(), 2);

    s.reset();
    assert_eq!(s.side_payloads(), 0);
    assert_eq!(allocator.unaligned(), 0);
    assert_eq!(Arc::strong_count(&allocator), 1);
    assert!(replay(&mut s).is_empty());
}

#[test]
fn merge_appends_donor_and_leaves_it_usable() {
    let ctx = context();
    let mut a = DrawStream::new(Arc::clone(&ctx));
    let mut b = DrawStream::new(Arc::clone(&ctx));
    a.draw_arrays(0, 1);
    b.update_buffer(BufferHandle(2), vec![1u8, 2]);
    b.draw_arrays(1, 1);
    b.use_program(ProgramHandle(9));

    a.merge(&mut b);
    assert_eq!(b.page_count(), 1);
    assert_eq!(b.side_payloads(), 0);
    assert!(b.pending_binds().is_empty());

    b.draw_arrays(2, 1);
    assert_eq!(
        replay(&mut b),
        vec![Call::DrawArrays {
            offset: 2,
            count: 1
        }]
    );
    assert_eq!(
        replay(&mut a),
        vec![
            Call::DrawArrays {
                offset: 0,
                count: 1
            },
            Call::UpdateBuffer {
                buffer: BufferHandle(2),
                data: vec![1, 2]
            },
            Call::DrawArrays {
                offset: 1,
                count: 1
            },
        ]
    );
}

#[test]
fn merge_rejects_executed_streams_and_foreign_pools() {
    let ctx = context();
    let mut a = DrawStream::new(Arc::clone(&ctx));
    let mut b = DrawStream::new(Arc::clone(&ctx));
    let mut foreign = DrawStream::new(context());

    assert_eq!(a.try_merge(&mut foreign), Err(StreamError::PoolMismatch));

    let _ = replay(&mut b);
    assert_eq!(a.try_merge(&mut b), Err(StreamError::AlreadyExecuted));
    assert_eq!(b.try_merge(&mut a), Err(StreamError::AlreadyExecuted));
}

#[test]
#[should_panic(expected = "cannot merge draw streams")]
fn merge_panics_on_pool_mismatch() {
    let mut a = DrawStream::new(context());
    let mut b = DrawStream::new(context());
    a.merge(&mut b);
}

#[test]
fn draw_stream_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<DrawStream>();
    assert_send::<lumen_draw_stream::SubstreamSlot>();
}
