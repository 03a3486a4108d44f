//! Shadow of the bindings consumed by draws and dispatches.
//!
//! Binding calls only touch the shadow. The next draw flushes whatever changed
//! as a single `Bind` (when exactly [`Dirty::FULL_BIND`] changed) or
//! `DirtyCache` instruction. `DirtyCache` carries the change set followed by
//! the changed fields in a fixed order: program, index buffer, indirect buffer,
//! vertex buffer 0, vertex buffer 1, bind group 0, bind group 1.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use lumen_gpu::{Backend, BindGroupHandle, BufferHandle, ProgramHandle};

use crate::codec::{ByteReader, ByteWriter};
use crate::error::DecodeError;

pub const VERTEX_BUFFER_SLOTS: usize = 2;
pub const BIND_GROUP_SLOTS: usize = 2;

bitflags! {
    /// Cached bindings changed since the last flush.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Dirty: u8 {
        const PROGRAM = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const INDIRECT_BUFFER = 1 << 2;
        const VERTEX_BUFFER0 = 1 << 3;
        const VERTEX_BUFFER1 = 1 << 4;
        const BIND_GROUP0 = 1 << 5;
        const BIND_GROUP1 = 1 << 6;

        /// The common per-draw combination, encoded as one `Bind` instruction.
        const FULL_BIND = Self::PROGRAM.bits()
            | Self::INDEX_BUFFER.bits()
            | Self::VERTEX_BUFFER0.bits()
            | Self::VERTEX_BUFFER1.bits()
            | Self::BIND_GROUP0.bits();
    }
}

impl Dirty {
    pub const fn vertex_buffer(slot: usize) -> Self {
        match slot {
            0 => Self::VERTEX_BUFFER0,
            _ => Self::VERTEX_BUFFER1,
        }
    }

    pub const fn bind_group(index: usize) -> Self {
        match index {
            0 => Self::BIND_GROUP0,
            _ => Self::BIND_GROUP1,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct VertexBufferBinding {
    pub buffer: BufferHandle,
    pub offset: u32,
    pub stride: u32,
}

/// Last value written to every cached binding slot.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BindCache {
    pub program: ProgramHandle,
    pub index_buffer: BufferHandle,
    pub indirect_buffer: BufferHandle,
    pub vertex_buffers: [VertexBufferBinding; VERTEX_BUFFER_SLOTS],
    pub bind_groups: [BindGroupHandle; BIND_GROUP_SLOTS],
}

const _: () = assert!(core::mem::size_of::<BindCache>() == 44);

impl BindCache {
    /// Size of the fields selected by `dirty`, excluding the change-set byte.
    pub(crate) fn fields_len(dirty: Dirty) -> usize {
        const HANDLE: usize = core::mem::size_of::<u32>();
        const VB: usize = core::mem::size_of::<VertexBufferBinding>();

        let mut len = 0;
        for (flag, size) in [
            (Dirty::PROGRAM, HANDLE),
            (Dirty::INDEX_BUFFER, HANDLE),
            (Dirty::INDIRECT_BUFFER, HANDLE),
            (Dirty::VERTEX_BUFFER0, VB),
            (Dirty::VERTEX_BUFFER1, VB),
            (Dirty::BIND_GROUP0, HANDLE),
            (Dirty::BIND_GROUP1, HANDLE),
        ] {
            if dirty.contains(flag) {
                len += size;
            }
        }
        len
    }

    pub(crate) fn write_fields(&self, dirty: Dirty, w: &mut ByteWriter<'_>) {
        if dirty.contains(Dirty::PROGRAM) {
            w.write_pod(&self.program);
        }
        if dirty.contains(Dirty::INDEX_BUFFER) {
            w.write_pod(&self.index_buffer);
        }
        if dirty.contains(Dirty::INDIRECT_BUFFER) {
            w.write_pod(&self.indirect_buffer);
        }
        for (slot, vb) in self.vertex_buffers.iter().enumerate() {
            if dirty.contains(Dirty::vertex_buffer(slot)) {
                w.write_pod(vb);
            }
        }
        for (index, group) in self.bind_groups.iter().enumerate() {
            if dirty.contains(Dirty::bind_group(index)) {
                w.write_pod(group);
            }
        }
    }

    /// Replays a `Bind` instruction.
    pub fn replay<B: Backend + ?Sized>(&self, backend: &mut B) {
        backend.use_program(self.program);
        backend.bind_index_buffer(self.index_buffer);
        for (slot, vb) in self.vertex_buffers.iter().enumerate() {
            backend.bind_vertex_buffer(slot as u32, vb.buffer, vb.offset, vb.stride);
        }
        backend.bind(0, self.bind_groups[0]);
    }
}

/// Decoded `DirtyCache` instruction: only the fields named by `dirty` are set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyUpdate {
    pub dirty: Dirty,
    pub program: Option<ProgramHandle>,
    pub index_buffer: Option<BufferHandle>,
    pub indirect_buffer: Option<BufferHandle>,
    pub vertex_buffers: [Option<VertexBufferBinding>; VERTEX_BUFFER_SLOTS],
    pub bind_groups: [Option<BindGroupHandle>; BIND_GROUP_SLOTS],
}

impl DirtyUpdate {
    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let bits = r.read_u8()?;
        let dirty = match Dirty::from_bits(bits) {
            Some(dirty) if !dirty.is_empty() => dirty,
            _ => return Err(DecodeError::InvalidBindSlot(bits)),
        };

        let mut update = Self {
            dirty,
            ..Self::default()
        };
        if dirty.contains(Dirty::PROGRAM) {
            update.program = Some(r.read_pod()?);
        }
        if dirty.contains(Dirty::INDEX_BUFFER) {
            update.index_buffer = Some(r.read_pod()?);
        }
        if dirty.contains(Dirty::INDIRECT_BUFFER) {
            update.indirect_buffer = Some(r.read_pod()?);
        }
        for slot in 0..VERTEX_BUFFER_SLOTS {
            if dirty.contains(Dirty::vertex_buffer(slot)) {
                update.vertex_buffers[slot] = Some(r.read_pod()?);
            }
        }
        for index in 0..BIND_GROUP_SLOTS {
            if dirty.contains(Dirty::bind_group(index)) {
                update.bind_groups[index] = Some(r.read_pod()?);
            }
        }
        Ok(update)
    }

    pub fn replay<B: Backend + ?Sized>(&self, backend: &mut B) {
        if let Some(program) = self.program {
            backend.use_program(program);
        }
        if let Some(buffer) = self.index_buffer {
            backend.bind_index_buffer(buffer);
        }
        if let Some(buffer) = self.indirect_buffer {
            backend.bind_indirect_buffer(buffer);
        }
        for (slot, vb) in self.vertex_buffers.iter().enumerate() {
            if let Some(vb) = vb {
                backend.bind_vertex_buffer(slot as u32, vb.buffer, vb.offset, vb.stride);
            }
        }
        for (index, group) in self.bind_groups.iter().enumerate() {
            if let Some(group) = group {
                backend.bind(index as u32, *group);
            }
        }
    }
}

/// Recorder-side cache state.
#[derive(Debug, Default)]
pub(crate) struct BindState {
    pub(crate) cache: BindCache,
    dirty: Dirty,
}

impl BindState {
    pub(crate) fn set_program(&mut self, program: ProgramHandle) {
        self.cache.program = program;
        self.dirty |= Dirty::PROGRAM;
    }

    pub(crate) fn set_index_buffer(&mut self, buffer: BufferHandle) {
        self.cache.index_buffer = buffer;
        self.dirty |= Dirty::INDEX_BUFFER;
    }

    pub(crate) fn set_indirect_buffer(&mut self, buffer: BufferHandle) {
        self.cache.indirect_buffer = buffer;
        self.dirty |= Dirty::INDIRECT_BUFFER;
    }

    pub(crate) fn set_vertex_buffer(&mut self, slot: usize, binding: VertexBufferBinding) {
        assert!(
            slot < VERTEX_BUFFER_SLOTS,
            "vertex buffer slot {slot} out of range (0..{VERTEX_BUFFER_SLOTS})"
        );
        self.cache.vertex_buffers[slot] = binding;
        self.dirty |= Dirty::vertex_buffer(slot);
    }

    pub(crate) fn set_bind_group(&mut self, index: usize, group: BindGroupHandle) {
        assert!(
            index < BIND_GROUP_SLOTS,
            "bind group index {index} out of range (0..{BIND_GROUP_SLOTS})"
        );
        self.cache.bind_groups[index] = group;
        self.dirty |= Dirty::bind_group(index);
    }

    pub(crate) fn dirty(&self) -> Dirty {
        self.dirty
    }

    /// Returns the pending change set and clears it. Cached values are kept.
    pub(crate) fn take_dirty(&mut self) -> Dirty {
        core::mem::take(&mut self.dirty)
    }
}
