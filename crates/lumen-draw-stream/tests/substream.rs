mod common;

use std::sync::Arc;
use std::thread;

use lumen_draw_stream::{DrawStream, StreamContext};
use lumen_gpu::{BufferHandle, Call, ProgramHandle};
use lumen_pages::PagePool;
use pretty_assertions::assert_eq;

use common::{replay, stream};

fn draw(offset: u32) -> Call {
    Call::DrawArrays { offset, count: 3 }
}

#[test]
fn embedded_substream_runs_in_place_and_parent_continues() {
    let mut parent = stream();
    parent.draw_arrays(0, 3);

    let mut child = parent.create_substream();
    child.draw_arrays(1, 3);
    child.draw_arrays(2, 3);
    parent.push_substream(child);

    parent.draw_arrays(3, 3);
    parent.viewport(0, 0, 4, 4);

    assert_eq!(
        replay(&mut parent),
        vec![
            draw(0),
            draw(1),
            draw(2),
            draw(3),
            Call::Viewport {
                x: 0,
                y: 0,
                width: 4,
                height: 4
            },
        ]
    );
}

#[test]
fn substream_side_payloads_stay_with_the_substream() {
    let mut parent = stream();
    parent.update_buffer(BufferHandle(1), vec![1u8]);

    let mut child = parent.create_substream();
    child.update_buffer(BufferHandle(2), vec![2u8]);
    parent.push_substream(child);

    parent.update_buffer(BufferHandle(3), vec![3u8]);

    let buffers: Vec<_> = replay(&mut parent)
        .into_iter()
        .map(|call| match call {
            Call::UpdateBuffer { buffer, data } => (buffer, data),
            other => panic!("unexpected call {other:?}"),
        })
        .collect();
    assert_eq!(
        buffers,
        vec![
            (BufferHandle(1), vec![1]),
            (BufferHandle(2), vec![2]),
            (BufferHandle(3), vec![3]),
        ]
    );
}

#[test]
fn substream_bindings_do_not_leak_into_parent_cache() {
    let mut parent = stream();
    let mut child = parent.create_substream();
    child.use_program(ProgramHandle(5));
    child.draw_arrays(0, 3);
    parent.push_substream(child);
    parent.draw_arrays(1, 3);

    assert_eq!(
        replay(&mut parent),
        vec![Call::UseProgram(ProgramHandle(5)), draw(0), draw(1)]
    );
}

#[test]
fn nested_substreams_run_depth_first() {
    let mut root = stream();
    let mut mid = root.create_substream();
    let mut leaf = mid.create_substream();
    leaf.draw_arrays(2, 3);
    mid.draw_arrays(1, 3);
    mid.push_substream(leaf);
    mid.draw_arrays(3, 3);
    root.draw_arrays(0, 3);
    root.push_substream(mid);
    root.draw_arrays(4, 3);

    assert_eq!(
        replay(&mut root),
        vec![draw(0), draw(1), draw(2), draw(3), draw(4)]
    );
}

#[test]
fn reserved_substream_is_recorded_later_from_another_thread() {
    let mut parent = stream();
    parent.draw_arrays(0, 3);
    let slot = parent.reserve_substream();
    parent.draw_arrays(2, 3);

    let worker = slot.clone();
    thread::spawn(move || {
        worker.record(|s| s.draw_arrays(1, 3));
    })
    .join()
    .unwrap();

    assert_eq!(replay(&mut parent), vec![draw(0), draw(1), draw(2)]);
    assert!(slot.lock().is_executed());
}

#[test]
fn empty_reserved_substream_replays_nothing() {
    let mut parent = stream();
    let _slot = parent.reserve_substream();
    parent.draw_arrays(0, 3);

    assert_eq!(replay(&mut parent), vec![draw(0)]);
}

#[test]
#[should_panic(expected = "cannot embed an executed draw stream")]
fn executed_stream_cannot_be_embedded() {
    let mut parent = stream();
    let mut child = parent.create_substream();
    let _ = replay(&mut child);
    parent.push_substream(child);
}

#[test]
#[should_panic(expected = "cannot record into an executed draw stream")]
fn recording_into_slot_after_parent_ran_panics() {
    let mut parent = stream();
    let slot = parent.reserve_substream();
    let _ = replay(&mut parent);
    slot.record(|s| s.draw_arrays(5, 5));
}

#[test]
fn reserved_substream_pages_return_to_pool_after_replay() {
    let pool = Arc::new(PagePool::default());
    let mut parent = DrawStream::new(StreamContext::with_pool(Arc::clone(&pool)));
    let slot = parent.reserve_substream();
    slot.record(|s| s.draw_arrays(1, 3));
    assert_eq!(pool.stats().live, 2);

    assert_eq!(replay(&mut parent), vec![draw(1)]);
    assert_eq!(slot.lock().page_count(), 0);
    assert_eq!(pool.stats().live, 1);
}
