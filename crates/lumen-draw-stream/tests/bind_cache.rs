mod common;

use lumen_draw_stream::{Dirty, DrawStream, Instruction, Opcode, VertexBufferBinding};
use lumen_gpu::{BindGroupHandle, BufferHandle, Call, ClearFlags, DataType, ProgramHandle};
use pretty_assertions::assert_eq;

use common::{replay, stream};

fn opcodes(s: &DrawStream) -> Vec<Opcode> {
    s.instructions()
        .map(|i| i.expect("decodes").opcode())
        .collect()
}

#[test]
fn full_bind_set_is_coalesced_into_one_instruction() {
    let mut s = stream();
    s.use_program(ProgramHandle(1));
    s.bind_index_buffer(BufferHandle(2));
    s.bind_vertex_buffer(0, BufferHandle(3), 0, 16);
    s.bind_vertex_buffer(1, BufferHandle(4), 8, 4);
    s.bind(0, BindGroupHandle(5));
    assert_eq!(s.pending_binds(), Dirty::FULL_BIND);
    s.draw_arrays(0, 6);

    let decoded: Vec<_> = s.instructions().map(|i| i.unwrap()).collect();
    assert_eq!(decoded.len(), 2);
    let Instruction::Bind(cache) = decoded[0] else {
        panic!("expected Bind, got {:?}", decoded[0]);
    };
    assert_eq!(cache.program, ProgramHandle(1));
    assert_eq!(cache.bind_groups[0], BindGroupHandle(5));

    assert_eq!(
        replay(&mut s),
        vec![
            Call::UseProgram(ProgramHandle(1)),
            Call::BindIndexBuffer(BufferHandle(2)),
            Call::BindVertexBuffer {
                slot: 0,
                buffer: BufferHandle(3),
                offset: 0,
                stride: 16
            },
            Call::BindVertexBuffer {
                slot: 1,
                buffer: BufferHandle(4),
                offset: 8,
                stride: 4
            },
            Call::Bind {
                index: 0,
                group: BindGroupHandle(5)
            },
            Call::DrawArrays {
                offset: 0,
                count: 6
            },
        ]
    );
}

#[test]
fn partial_change_replays_only_changed_bindings() {
    let mut s = stream();
    s.use_program(ProgramHandle(1));
    s.bind(1, BindGroupHandle(7));
    s.dispatch(1, 1, 1);

    let decoded: Vec<_> = s.instructions().map(|i| i.unwrap()).collect();
    let Instruction::DirtyCache(update) = decoded[0] else {
        panic!("expected DirtyCache, got {:?}", decoded[0]);
    };
    assert_eq!(update.dirty, Dirty::PROGRAM | Dirty::BIND_GROUP1);
    assert_eq!(update.program, Some(ProgramHandle(1)));
    assert_eq!(update.index_buffer, None);
    assert_eq!(update.bind_groups, [None, Some(BindGroupHandle(7))]);

    assert_eq!(
        replay(&mut s),
        vec![
            Call::UseProgram(ProgramHandle(1)),
            Call::Bind {
                index: 1,
                group: BindGroupHandle(7)
            },
            Call::Dispatch {
                groups_x: 1,
                groups_y: 1,
                groups_z: 1
            },
        ]
    );
}

#[test]
fn program_and_second_vertex_buffer_share_one_dirty_update() {
    let mut s = stream();
    s.use_program(ProgramHandle(1));
    s.bind_vertex_buffer(1, BufferHandle(9), 16, 12);
    s.draw_arrays(0, 3);

    assert_eq!(opcodes(&s), vec![Opcode::DirtyCache, Opcode::DrawArrays]);
    let decoded: Vec<_> = s.instructions().map(|i| i.unwrap()).collect();
    let Instruction::DirtyCache(update) = decoded[0] else {
        panic!("expected DirtyCache, got {:?}", decoded[0]);
    };
    assert_eq!(update.dirty, Dirty::PROGRAM | Dirty::VERTEX_BUFFER1);
    assert_eq!(update.program, Some(ProgramHandle(1)));
    assert_eq!(
        update.vertex_buffers,
        [
            None,
            Some(VertexBufferBinding {
                buffer: BufferHandle(9),
                offset: 16,
                stride: 12
            })
        ]
    );

    assert_eq!(
        replay(&mut s),
        vec![
            Call::UseProgram(ProgramHandle(1)),
            Call::BindVertexBuffer {
                slot: 1,
                buffer: BufferHandle(9),
                offset: 16,
                stride: 12
            },
            Call::DrawArrays {
                offset: 0,
                count: 3
            },
        ]
    );
}

#[test]
fn full_set_plus_extra_slot_uses_dirty_encoding() {
    let mut s = stream();
    s.use_program(ProgramHandle(1));
    s.bind_index_buffer(BufferHandle(2));
    s.bind_vertex_buffer(0, BufferHandle(3), 0, 16);
    s.bind_vertex_buffer(1, BufferHandle(4), 0, 16);
    s.bind(0, BindGroupHandle(5));
    s.bind_indirect_buffer(BufferHandle(6));
    s.draw_indirect(DataType::U16, 0);

    assert_eq!(opcodes(&s), vec![Opcode::DirtyCache, Opcode::DrawIndirect]);
    assert_eq!(replay(&mut s)[2], Call::BindIndirectBuffer(BufferHandle(6)));
}

#[test]
fn unchanged_bindings_are_not_re_emitted() {
    let mut s = stream();
    s.bind_vertex_buffer(0, BufferHandle(3), 0, 12);
    s.draw_arrays(0, 3);
    s.draw_arrays(3, 3);
    assert!(s.pending_binds().is_empty());

    // Rebinding the same value still counts as a change.
    s.bind_vertex_buffer(0, BufferHandle(3), 0, 12);
    assert_eq!(s.pending_binds(), Dirty::VERTEX_BUFFER0);
    s.draw_arrays(6, 3);

    let calls = replay(&mut s);
    let binds = calls
        .iter()
        .filter(|c| matches!(c, Call::BindVertexBuffer { .. }))
        .count();
    assert_eq!(binds, 2);
    assert_eq!(calls.len(), 5);
}

#[test]
fn non_draw_commands_do_not_flush() {
    let mut s = stream();
    s.use_program(ProgramHandle(1));
    s.viewport(0, 0, 8, 8);
    s.clear(ClearFlags::COLOR, [0.0; 4], 1.0);

    assert_eq!(s.pending_binds(), Dirty::PROGRAM);
    let calls = replay(&mut s);
    assert!(!calls.contains(&Call::UseProgram(ProgramHandle(1))));
}

#[test]
#[should_panic(expected = "vertex buffer slot 2 out of range")]
fn vertex_buffer_slot_beyond_cache_panics() {
    stream().bind_vertex_buffer(2, BufferHandle(1), 0, 0);
}

#[test]
#[should_panic(expected = "bind group index 2 out of range")]
fn bind_group_index_beyond_cache_panics() {
    stream().bind(2, BindGroupHandle(1));
}
