use std::collections::VecDeque;
use std::fmt;
use std::mem::size_of;
use std::sync::Arc;

use bytemuck::Pod;
use lumen_gpu::{
    BarrierType, BindGroupEntry, BindGroupHandle, BufferFlags, BufferHandle, ClearFlags, DataType,
    FramebufferFlags, NullProfiler, ProgramDesc, ProgramHandle, Profiler, ShaderBufferFlags,
    TextureDesc, TextureFormat, TextureHandle, TextureRegion,
};
use lumen_pages::{HeapAllocator, HeapBlock, PagePool};
use tracing::debug;

use crate::bind_cache::{BindCache, BindState, Dirty, VertexBufferBinding};
use crate::codec::{len_u32, ByteWriter};
use crate::error::StreamError;
use crate::instruction::Instructions;
use crate::opcode::Opcode;
use crate::page::Page;
use crate::payload::*;
use crate::side::{SidePayload, SubstreamSlot};

/// Shared by every stream recorded for one renderer: the page pool and the
/// profiler that `BeginProfileBlock`/`EndProfileBlock` report to.
pub struct StreamContext {
    pool: Arc<PagePool>,
    profiler: Arc<dyn Profiler>,
}

impl StreamContext {
    pub fn new(pool: Arc<PagePool>, profiler: Arc<dyn Profiler>) -> Arc<Self> {
        Arc::new(Self { pool, profiler })
    }

    /// Context without profiling.
    pub fn with_pool(pool: Arc<PagePool>) -> Arc<Self> {
        Self::new(pool, Arc::new(NullProfiler))
    }

    pub fn pool(&self) -> &Arc<PagePool> {
        &self.pool
    }

    pub fn profiler(&self) -> &dyn Profiler {
        &*self.profiler
    }
}

impl Default for StreamContext {
    fn default() -> Self {
        Self {
            pool: Arc::new(PagePool::default()),
            profiler: Arc::new(NullProfiler),
        }
    }
}

impl fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamContext")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

/// Deferred GPU command recorder.
///
/// Recording appends instructions to pool pages; [`DrawStream::run`] replays
/// them against a [`Backend`](lumen_gpu::Backend) once. Bindings of program,
/// index/indirect buffers, vertex buffer slots and bind groups are cached and
/// only emitted before the next draw or dispatch.
///
/// Every recording method panics once the stream has been executed; call
/// [`DrawStream::reset`] to record again.
pub struct DrawStream {
    pub(crate) ctx: Arc<StreamContext>,
    pub(crate) pages: Vec<Page>,
    pub(crate) side: VecDeque<SidePayload>,
    pub(crate) binds: BindState,
    pub(crate) executed: bool,
}

impl DrawStream {
    pub fn new(ctx: Arc<StreamContext>) -> Self {
        let page = Page::new(ctx.pool.allocate());
        Self {
            ctx,
            pages: vec![page],
            side: VecDeque::new(),
            binds: BindState::default(),
            executed: false,
        }
    }

    pub fn context(&self) -> &Arc<StreamContext> {
        &self.ctx
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Bytes used in each page, in chain order.
    pub fn page_usage(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages.iter().map(Page::used)
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Bindings changed since the last draw or dispatch.
    pub fn pending_binds(&self) -> Dirty {
        self.binds.dirty()
    }

    pub fn bind_cache(&self) -> &BindCache {
        &self.binds.cache
    }

    /// Number of queued out-of-line payloads.
    pub fn side_payloads(&self) -> usize {
        self.side.len()
    }

    /// Decodes the recorded instructions without executing them.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions::new(&self.pages)
    }

    fn alloc(&mut self, size: usize) -> &mut [u8] {
        self.assert_recording();
        assert!(
            size <= Page::CAPACITY,
            "instruction of {size} bytes does not fit in a page ({} bytes)",
            Page::CAPACITY
        );
        if !self.pages.last().is_some_and(|page| page.fits(size)) {
            self.pages.push(Page::new(self.ctx.pool.allocate()));
            debug!(pages = self.pages.len(), "draw stream page allocated");
        }
        let last = self.pages.len() - 1;
        self.pages[last].alloc(size)
    }

    fn assert_recording(&self) {
        assert!(!self.executed, "cannot record into an executed draw stream");
    }

    fn binds_mut(&mut self) -> &mut BindState {
        self.assert_recording();
        &mut self.binds
    }

    /// Returns every page to the pool. The stream must not record again
    /// until it is reset.
    pub(crate) fn release_pages(&mut self) {
        // Dropping embedded streams locks the pool, so release them first.
        self.side.clear();

        let mut pool = self.ctx.pool.lock();
        for page in self.pages.drain(..) {
            pool.deallocate(page.into_block());
        }
    }

    fn write_op(&mut self, opcode: Opcode) {
        self.alloc(1)[0] = opcode as u8;
    }

    fn write<T: Pod>(&mut self, opcode: Opcode, payload: &T) {
        let mut w = ByteWriter::new(self.alloc(1 + size_of::<T>()));
        w.write_u8(opcode as u8);
        w.write_pod(payload);
    }

    /// `opcode`, a fixed payload, then a length-prefixed byte string.
    fn write_with_bytes<T: Pod>(&mut self, opcode: Opcode, payload: &T, bytes: &[u8]) {
        let mut w = ByteWriter::new(self.alloc(1 + size_of::<T>() + 4 + bytes.len()));
        w.write_u8(opcode as u8);
        w.write_pod(payload);
        w.write_len_prefixed(bytes);
    }

    /// `opcode`, a fixed payload, then `items` (count already in the payload).
    fn write_with_slice<T: Pod, U: Pod>(&mut self, opcode: Opcode, payload: &T, items: &[U]) {
        let mut w =
            ByteWriter::new(self.alloc(1 + size_of::<T>() + size_of::<U>() * items.len()));
        w.write_u8(opcode as u8);
        w.write_pod(payload);
        w.write_pod_slice(items);
    }

    fn push_side(&mut self, payload: SidePayload) {
        self.side.push_back(payload);
    }

    /// Emits pending bindings as one `Bind` or `DirtyCache` instruction.
    fn flush_binds(&mut self) {
        let dirty = self.binds.take_dirty();
        if dirty.is_empty() {
            return;
        }

        let cache = self.binds.cache;
        if dirty == Dirty::FULL_BIND {
            self.write(Opcode::Bind, &cache);
            return;
        }

        let mut w = ByteWriter::new(self.alloc(2 + BindCache::fields_len(dirty)));
        w.write_u8(Opcode::DirtyCache as u8);
        w.write_u8(dirty.bits());
        cache.write_fields(dirty, &mut w);
    }

    // Resources.

    pub fn create_texture(&mut self, handle: TextureHandle, desc: &TextureDesc, debug_name: &str) {
        let payload = CreateTexturePayload {
            handle,
            width: desc.width,
            height: desc.height,
            depth: desc.depth,
            format: desc.format as u32,
            flags: desc.flags.bits(),
        };
        self.write_with_bytes(Opcode::CreateTexture, &payload, debug_name.as_bytes());
    }

    /// `data`, when given, is handed to the backend as the initial contents.
    pub fn create_buffer(
        &mut self,
        handle: BufferHandle,
        flags: BufferFlags,
        size: u64,
        data: Option<Arc<[u8]>>,
        debug_name: &str,
    ) {
        let payload = CreateBufferPayload {
            size,
            handle,
            flags: flags.bits(),
            has_data: u32::from(data.is_some()),
            _pad: 0,
        };
        self.write_with_bytes(Opcode::CreateBuffer, &payload, debug_name.as_bytes());
        if let Some(data) = data {
            self.push_side(SidePayload::Data(data));
        }
    }

    pub fn create_program(&mut self, handle: ProgramHandle, desc: ProgramDesc) {
        self.write(Opcode::CreateProgram, &handle);
        self.push_side(SidePayload::Program(Box::new(desc)));
    }

    pub fn create_bind_group(&mut self, handle: BindGroupHandle, entries: &[BindGroupEntry]) {
        let raw: Vec<BindGroupEntryRaw> = entries.iter().map(BindGroupEntryRaw::encode).collect();
        let payload = CreateBindGroupPayload {
            handle,
            count: len_u32(raw.len()),
        };
        self.write_with_slice(Opcode::CreateBindGroup, &payload, &raw);
    }

    pub fn create_texture_view(
        &mut self,
        view: TextureHandle,
        texture: TextureHandle,
        layer: u32,
        mip: u32,
    ) {
        let payload = CreateTextureViewPayload {
            view,
            texture,
            layer,
            mip,
        };
        self.write(Opcode::CreateTextureView, &payload);
    }

    pub fn destroy_texture(&mut self, handle: TextureHandle) {
        if handle.is_valid() {
            self.write(Opcode::DestroyTexture, &handle);
        }
    }

    pub fn destroy_buffer(&mut self, handle: BufferHandle) {
        if handle.is_valid() {
            self.write(Opcode::DestroyBuffer, &handle);
        }
    }

    pub fn destroy_program(&mut self, handle: ProgramHandle) {
        if handle.is_valid() {
            self.write(Opcode::DestroyProgram, &handle);
        }
    }

    pub fn destroy_bind_group(&mut self, handle: BindGroupHandle) {
        if handle.is_valid() {
            self.write(Opcode::DestroyBindGroup, &handle);
        }
    }

    pub fn set_texture_debug_name(&mut self, texture: TextureHandle, name: &str) {
        self.write_with_bytes(Opcode::SetTextureDebugName, &texture, name.as_bytes());
    }

    // Cached bindings.

    pub fn use_program(&mut self, program: ProgramHandle) {
        self.binds_mut().set_program(program);
    }

    pub fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        self.binds_mut().set_index_buffer(buffer);
    }

    /// # Panics
    ///
    /// Panics unless `slot` is 0 or 1.
    pub fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u32, stride: u32) {
        self.binds_mut().set_vertex_buffer(
            slot as usize,
            VertexBufferBinding {
                buffer,
                offset,
                stride,
            },
        );
    }

    pub fn bind_indirect_buffer(&mut self, buffer: BufferHandle) {
        self.binds_mut().set_indirect_buffer(buffer);
    }

    /// # Panics
    ///
    /// Panics unless `index` is 0 or 1.
    pub fn bind(&mut self, index: u32, group: BindGroupHandle) {
        self.binds_mut().set_bind_group(index as usize, group);
    }

    // Direct bindings.

    pub fn bind_uniform_buffer(&mut self, index: u32, buffer: BufferHandle, offset: u32, size: u32) {
        let payload = BindUniformBufferPayload {
            index,
            buffer,
            offset,
            size,
        };
        self.write(Opcode::BindUniformBuffer, &payload);
    }

    pub fn bind_shader_buffer(&mut self, buffer: BufferHandle, binding: u32, flags: ShaderBufferFlags) {
        let payload = BindShaderBufferPayload {
            buffer,
            binding,
            flags: flags.bits(),
        };
        self.write(Opcode::BindShaderBuffer, &payload);
    }

    pub fn bind_image_texture(&mut self, texture: TextureHandle, unit: u32) {
        self.write(Opcode::BindImageTexture, &BindImageTexturePayload { texture, unit });
    }

    pub fn bind_textures(&mut self, offset: u32, textures: &[TextureHandle]) {
        let payload = BindTexturesPayload {
            offset,
            count: len_u32(textures.len()),
        };
        self.write_with_slice(Opcode::BindTextures, &payload, textures);
    }

    // Draws. Each flushes pending bindings first.

    pub fn draw_arrays(&mut self, offset: u32, count: u32) {
        self.flush_binds();
        self.write(Opcode::DrawArrays, &DrawArraysPayload { offset, count });
    }

    pub fn draw_indexed(&mut self, offset: u32, count: u32, index_type: DataType) {
        self.flush_binds();
        let payload = DrawIndexedPayload {
            offset,
            count,
            index_type: index_type as u32,
        };
        self.write(Opcode::DrawIndexed, &payload);
    }

    pub fn draw_arrays_instanced(&mut self, indices_count: u32, instances_count: u32) {
        self.flush_binds();
        let payload = DrawArraysInstancedPayload {
            indices_count,
            instances_count,
        };
        self.write(Opcode::DrawArraysInstanced, &payload);
    }

    pub fn draw_indexed_instanced(
        &mut self,
        indices_count: u32,
        instances_count: u32,
        index_type: DataType,
    ) {
        self.flush_binds();
        let payload = DrawIndexedInstancedPayload {
            indices_count,
            instances_count,
            index_type: index_type as u32,
        };
        self.write(Opcode::DrawIndexedInstanced, &payload);
    }

    pub fn draw_indirect(&mut self, index_type: DataType, indirect_buffer_offset: u32) {
        self.flush_binds();
        let payload = DrawIndirectPayload {
            index_type: index_type as u32,
            indirect_buffer_offset,
        };
        self.write(Opcode::DrawIndirect, &payload);
    }

    pub fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        self.flush_binds();
        let payload = DispatchPayload {
            groups_x,
            groups_y,
            groups_z,
        };
        self.write(Opcode::Dispatch, &payload);
    }

    // Pass state.

    pub fn clear(&mut self, flags: ClearFlags, color: [f32; 4], depth: f32) {
        let payload = ClearPayload {
            color,
            depth,
            flags: flags.bits(),
        };
        self.write(Opcode::Clear, &payload);
    }

    pub fn set_framebuffer(
        &mut self,
        attachments: &[TextureHandle],
        depth_stencil: TextureHandle,
        flags: FramebufferFlags,
    ) {
        let payload = SetFramebufferPayload {
            count: len_u32(attachments.len()),
            depth_stencil,
            flags: flags.bits(),
        };
        self.write_with_slice(Opcode::SetFramebuffer, &payload, attachments);
    }

    pub fn set_framebuffer_cube(&mut self, cube: TextureHandle, face: u32, mip: u32) {
        self.write(
            Opcode::SetFramebufferCube,
            &SetFramebufferCubePayload { cube, face, mip },
        );
    }

    pub fn viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let payload = RectPayload {
            x,
            y,
            width,
            height,
        };
        self.write(Opcode::Viewport, &payload);
    }

    pub fn scissor(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let payload = RectPayload {
            x,
            y,
            width,
            height,
        };
        self.write(Opcode::Scissor, &payload);
    }

    // Transfers.

    pub fn copy_texture(&mut self, dst: TextureHandle, src: TextureHandle, dst_x: u32, dst_y: u32) {
        let payload = CopyTexturePayload {
            dst,
            src,
            dst_x,
            dst_y,
        };
        self.write(Opcode::CopyTexture, &payload);
    }

    pub fn copy_buffer(
        &mut self,
        dst: BufferHandle,
        src: BufferHandle,
        dst_offset: u32,
        src_offset: u32,
        size: u32,
    ) {
        let payload = CopyBufferPayload {
            dst,
            src,
            dst_offset,
            src_offset,
            size,
        };
        self.write(Opcode::CopyBuffer, &payload);
    }

    pub fn copy_texture_to_buffer(&mut self, dst: BufferHandle, src: TextureHandle) {
        self.write(
            Opcode::CopyTextureToBuffer,
            &CopyTextureToBufferPayload { dst, src },
        );
    }

    /// `callback` receives the texel data once the backend has read it back.
    pub fn read_texture(
        &mut self,
        texture: TextureHandle,
        callback: impl FnOnce(&[u8]) + Send + 'static,
    ) {
        self.write(Opcode::ReadTexture, &texture);
        self.push_side(SidePayload::ReadCallback(Box::new(callback)));
    }

    pub fn generate_mipmaps(&mut self, texture: TextureHandle) {
        self.write(Opcode::GenerateMipmaps, &texture);
    }

    pub fn update_texture(
        &mut self,
        texture: TextureHandle,
        region: TextureRegion,
        format: TextureFormat,
        data: impl Into<Arc<[u8]>>,
    ) {
        let payload = UpdateTexturePayload {
            texture,
            region,
            format: format as u32,
        };
        self.write(Opcode::UpdateTexture, &payload);
        self.push_side(SidePayload::Data(data.into()));
    }

    pub fn update_buffer(&mut self, buffer: BufferHandle, data: impl Into<Arc<[u8]>>) {
        self.write(Opcode::UpdateBuffer, &buffer);
        self.push_side(SidePayload::Data(data.into()));
    }

    // Synchronization.

    pub fn memory_barrier(&mut self, buffer: BufferHandle) {
        self.write(Opcode::MemoryBarrier, &buffer);
    }

    pub fn memory_barrier_texture(&mut self, texture: TextureHandle) {
        self.write(Opcode::MemoryBarrierTexture, &texture);
    }

    pub fn barrier(&mut self, buffer: BufferHandle, ty: BarrierType) {
        let payload = BarrierPayload {
            handle: buffer.0,
            ty: ty as u32,
        };
        self.write(Opcode::Barrier, &payload);
    }

    pub fn barrier_texture(&mut self, texture: TextureHandle, ty: BarrierType) {
        let payload = BarrierPayload {
            handle: texture.0,
            ty: ty as u32,
        };
        self.write(Opcode::BarrierTexture, &payload);
    }

    // Debugging and profiling.

    pub fn push_debug_group(&mut self, label: &str) {
        let mut w = ByteWriter::new(self.alloc(1 + 4 + label.len()));
        w.write_u8(Opcode::PushDebugGroup as u8);
        w.write_len_prefixed(label.as_bytes());
    }

    pub fn pop_debug_group(&mut self) {
        self.write_op(Opcode::PopDebugGroup);
    }

    pub fn start_capture(&mut self) {
        self.write_op(Opcode::StartCapture);
    }

    pub fn stop_capture(&mut self) {
        self.write_op(Opcode::StopCapture);
    }

    /// `link` ties the GPU block to a CPU profiler block; `0` for none.
    pub fn begin_profile_block(&mut self, name: &str, link: i64) {
        self.write_with_bytes(Opcode::BeginProfileBlock, &link, name.as_bytes());
    }

    pub fn end_profile_block(&mut self) {
        self.write_op(Opcode::EndProfileBlock);
    }

    // Memory.

    /// Returns `block` to `allocator` when replay reaches this point.
    ///
    /// A stream dropped or reset without running drops the block instead.
    pub fn free_memory(&mut self, block: HeapBlock, allocator: Arc<dyn HeapAllocator>) {
        self.write_op(Opcode::FreeMemory);
        self.push_side(SidePayload::Free { block, allocator });
    }

    /// Like [`DrawStream::free_memory`], through [`HeapAllocator::deallocate_aligned`].
    pub fn free_aligned_memory(&mut self, block: HeapBlock, allocator: Arc<dyn HeapAllocator>) {
        self.write_op(Opcode::FreeAlignedMemory);
        self.push_side(SidePayload::Free { block, allocator });
    }

    // Escape hatches.

    /// Reserves `size` opaque bytes in the stream for the caller to fill.
    ///
    /// Replay skips the region; [`DrawStream::instructions`] yields it back as
    /// [`Instruction::UserAlloc`](crate::Instruction::UserAlloc).
    pub fn user_alloc(&mut self, size: usize) -> Result<&mut [u8], StreamError> {
        const HEADER: usize = 1 + 4;
        let capacity = Page::CAPACITY - HEADER;
        if size > capacity {
            return Err(StreamError::PayloadTooLarge { size, capacity });
        }

        let region = self.alloc(HEADER + size);
        let (header, body) = region.split_at_mut(HEADER);
        let mut w = ByteWriter::new(header);
        w.write_u8(Opcode::UserAlloc as u8);
        w.write_u32(len_u32(size));
        Ok(body)
    }

    /// Runs `f` with a copy of `payload` when replay reaches this point.
    ///
    /// `payload` is stored inline, so it must fit in one page alongside its
    /// header.
    pub fn push_function(
        &mut self,
        payload: &[u8],
        f: impl FnOnce(&[u8]) + Send + 'static,
    ) -> Result<(), StreamError> {
        const HEADER: usize = 1 + 4;
        let capacity = Page::CAPACITY - HEADER;
        if payload.len() > capacity {
            return Err(StreamError::PayloadTooLarge {
                size: payload.len(),
                capacity,
            });
        }

        let mut w = ByteWriter::new(self.alloc(HEADER + payload.len()));
        w.write_u8(Opcode::Function as u8);
        w.write_len_prefixed(payload);
        self.push_side(SidePayload::Function(Box::new(f)));
        Ok(())
    }

    /// A new, empty stream sharing this stream's context.
    pub fn create_substream(&self) -> DrawStream {
        DrawStream::new(Arc::clone(&self.ctx))
    }

    /// Embeds `child`; it runs in place when this stream runs.
    ///
    /// # Panics
    ///
    /// Panics if `child` has already been executed.
    pub fn push_substream(&mut self, child: DrawStream) {
        assert!(!child.executed, "cannot embed an executed draw stream");
        self.write_op(Opcode::Substream);
        self.push_side(SidePayload::Substream(Box::new(child)));
    }

    /// Reserves a sub-stream at the current position to be recorded later,
    /// possibly from another thread.
    pub fn reserve_substream(&mut self) -> SubstreamSlot {
        let slot = SubstreamSlot::new(self.create_substream());
        self.write_op(Opcode::Substream);
        self.push_side(SidePayload::Deferred(slot.clone()));
        slot
    }

    // Lifecycle.

    /// Appends `other`'s instructions after this stream's.
    ///
    /// `other` is left empty and may keep recording. Its pending bindings are
    /// discarded.
    ///
    /// # Panics
    ///
    /// Panics if either stream has been executed or they use different pools.
    pub fn merge(&mut self, other: &mut DrawStream) {
        if let Err(err) = self.try_merge(other) {
            panic!("cannot merge draw streams: {err}");
        }
    }

    pub fn try_merge(&mut self, other: &mut DrawStream) -> Result<(), StreamError> {
        if self.executed || other.executed {
            return Err(StreamError::AlreadyExecuted);
        }
        if !Arc::ptr_eq(&self.ctx.pool, &other.ctx.pool) {
            return Err(StreamError::PoolMismatch);
        }

        let fresh = Page::new(other.ctx.pool.allocate());
        let donor_pages = std::mem::replace(&mut other.pages, vec![fresh]);
        let donor_page_count = donor_pages.len();
        self.pages.extend(donor_pages);
        self.side.append(&mut other.side);
        other.binds = BindState::default();

        debug!(
            donor_pages = donor_page_count,
            pages = self.pages.len(),
            "draw streams merged"
        );
        Ok(())
    }

    /// Returns every page to the pool and starts a new recording session.
    ///
    /// Queued side payloads are dropped; deferred frees never reach their
    /// allocator.
    pub fn reset(&mut self) {
        let released = self.pages.len();
        self.release_pages();
        self.pages.push(Page::new(self.ctx.pool.allocate()));

        self.binds = BindState::default();
        self.executed = false;
        debug!(released, "draw stream reset");
    }
}

impl Drop for DrawStream {
    fn drop(&mut self) {
        self.release_pages();
    }
}

impl fmt::Debug for DrawStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawStream")
            .field("pages", &self.pages.len())
            .field("side", &self.side)
            .field("pending_binds", &self.binds.dirty())
            .field("executed", &self.executed)
            .finish()
    }
}
