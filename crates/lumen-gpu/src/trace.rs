//! Recording backend and profiler used to observe replay.

use std::sync::Mutex;

use crate::backend::{Backend, TextureReadCallback};
use crate::handle::{BindGroupHandle, BufferHandle, ProgramHandle, TextureHandle};
use crate::profiler::Profiler;
use crate::program::ProgramDesc;
use crate::types::{
    BarrierType, BindGroupEntry, BufferFlags, ClearFlags, DataType, FramebufferFlags,
    ShaderBufferFlags, TextureDesc, TextureFormat, TextureRegion,
};

/// One backend call with its arguments, owned.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateTexture {
        handle: TextureHandle,
        desc: TextureDesc,
        debug_name: String,
    },
    CreateBuffer {
        handle: BufferHandle,
        flags: BufferFlags,
        size: u64,
        data: Option<Vec<u8>>,
        debug_name: String,
    },
    CreateProgram {
        handle: ProgramHandle,
        desc: ProgramDesc,
    },
    CreateBindGroup {
        handle: BindGroupHandle,
        entries: Vec<BindGroupEntry>,
    },
    CreateTextureView {
        view: TextureHandle,
        texture: TextureHandle,
        layer: u32,
        mip: u32,
    },
    DestroyTexture(TextureHandle),
    DestroyBuffer(BufferHandle),
    DestroyProgram(ProgramHandle),
    DestroyBindGroup(BindGroupHandle),
    SetDebugName {
        texture: TextureHandle,
        name: String,
    },

    UseProgram(ProgramHandle),
    BindIndexBuffer(BufferHandle),
    BindVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
        offset: u32,
        stride: u32,
    },
    BindIndirectBuffer(BufferHandle),
    Bind {
        index: u32,
        group: BindGroupHandle,
    },
    BindUniformBuffer {
        index: u32,
        buffer: BufferHandle,
        offset: u32,
        size: u32,
    },
    BindShaderBuffer {
        buffer: BufferHandle,
        binding: u32,
        flags: ShaderBufferFlags,
    },
    BindImageTexture {
        texture: TextureHandle,
        unit: u32,
    },
    BindTextures {
        offset: u32,
        textures: Vec<TextureHandle>,
    },

    DrawArrays {
        offset: u32,
        count: u32,
    },
    DrawIndexed {
        offset: u32,
        count: u32,
        index_type: DataType,
    },
    DrawArraysInstanced {
        indices_count: u32,
        instances_count: u32,
    },
    DrawIndexedInstanced {
        indices_count: u32,
        instances_count: u32,
        index_type: DataType,
    },
    DrawIndirect {
        index_type: DataType,
        indirect_buffer_offset: u32,
    },
    Dispatch {
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    },

    Clear {
        flags: ClearFlags,
        color: [f32; 4],
        depth: f32,
    },
    SetFramebuffer {
        attachments: Vec<TextureHandle>,
        depth_stencil: TextureHandle,
        flags: FramebufferFlags,
    },
    SetFramebufferCube {
        cube: TextureHandle,
        face: u32,
        mip: u32,
    },
    Viewport {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    Scissor {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    CopyTexture {
        dst: TextureHandle,
        src: TextureHandle,
        dst_x: u32,
        dst_y: u32,
    },
    CopyBuffer {
        dst: BufferHandle,
        src: BufferHandle,
        dst_offset: u32,
        src_offset: u32,
        size: u32,
    },
    CopyTextureToBuffer {
        dst: BufferHandle,
        src: TextureHandle,
    },
    ReadTexture(TextureHandle),
    GenerateMipmaps(TextureHandle),
    UpdateTexture {
        texture: TextureHandle,
        region: TextureRegion,
        format: TextureFormat,
        data: Vec<u8>,
    },
    UpdateBuffer {
        buffer: BufferHandle,
        data: Vec<u8>,
    },

    MemoryBarrierBuffer(BufferHandle),
    MemoryBarrierTexture(TextureHandle),
    BarrierBuffer {
        buffer: BufferHandle,
        ty: BarrierType,
    },
    BarrierTexture {
        texture: TextureHandle,
        ty: BarrierType,
    },

    PushDebugGroup(String),
    PopDebugGroup,
    StartCapture,
    StopCapture,
}

/// Backend that appends every call to [`CallLog::calls`].
///
/// Read-back callbacks are invoked immediately with [`CallLog::readback`].
#[derive(Debug, Default)]
pub struct CallLog {
    pub calls: Vec<Call>,
    pub readback: Vec<u8>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readback(readback: Vec<u8>) -> Self {
        Self {
            calls: Vec::new(),
            readback,
        }
    }

    pub fn take(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    fn push(&mut self, call: Call) {
        self.calls.push(call);
    }
}

impl Backend for CallLog {
    fn create_texture(&mut self, handle: TextureHandle, desc: &TextureDesc, debug_name: &str) {
        self.push(Call::CreateTexture {
            handle,
            desc: *desc,
            debug_name: debug_name.to_owned(),
        });
    }

    fn create_buffer(
        &mut self,
        handle: BufferHandle,
        flags: BufferFlags,
        size: u64,
        data: Option<&[u8]>,
        debug_name: &str,
    ) {
        self.push(Call::CreateBuffer {
            handle,
            flags,
            size,
            data: data.map(<[u8]>::to_vec),
            debug_name: debug_name.to_owned(),
        });
    }

    fn create_program(&mut self, handle: ProgramHandle, desc: &ProgramDesc) {
        self.push(Call::CreateProgram {
            handle,
            desc: desc.clone(),
        });
    }

    fn create_bind_group(&mut self, handle: BindGroupHandle, entries: &[BindGroupEntry]) {
        self.push(Call::CreateBindGroup {
            handle,
            entries: entries.to_vec(),
        });
    }

    fn create_texture_view(&mut self, view: TextureHandle, texture: TextureHandle, layer: u32, mip: u32) {
        self.push(Call::CreateTextureView {
            view,
            texture,
            layer,
            mip,
        });
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        self.push(Call::DestroyTexture(handle));
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        self.push(Call::DestroyBuffer(handle));
    }

    fn destroy_program(&mut self, handle: ProgramHandle) {
        self.push(Call::DestroyProgram(handle));
    }

    fn destroy_bind_group(&mut self, handle: BindGroupHandle) {
        self.push(Call::DestroyBindGroup(handle));
    }

    fn set_debug_name(&mut self, texture: TextureHandle, name: &str) {
        self.push(Call::SetDebugName {
            texture,
            name: name.to_owned(),
        });
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.push(Call::UseProgram(program));
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        self.push(Call::BindIndexBuffer(buffer));
    }

    fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u32, stride: u32) {
        self.push(Call::BindVertexBuffer {
            slot,
            buffer,
            offset,
            stride,
        });
    }

    fn bind_indirect_buffer(&mut self, buffer: BufferHandle) {
        self.push(Call::BindIndirectBuffer(buffer));
    }

    fn bind(&mut self, index: u32, group: BindGroupHandle) {
        self.push(Call::Bind { index, group });
    }

    fn bind_uniform_buffer(&mut self, index: u32, buffer: BufferHandle, offset: u32, size: u32) {
        self.push(Call::BindUniformBuffer {
            index,
            buffer,
            offset,
            size,
        });
    }

    fn bind_shader_buffer(&mut self, buffer: BufferHandle, binding: u32, flags: ShaderBufferFlags) {
        self.push(Call::BindShaderBuffer {
            buffer,
            binding,
            flags,
        });
    }

    fn bind_image_texture(&mut self, texture: TextureHandle, unit: u32) {
        self.push(Call::BindImageTexture { texture, unit });
    }

    fn bind_textures(&mut self, offset: u32, textures: &[TextureHandle]) {
        self.push(Call::BindTextures {
            offset,
            textures: textures.to_vec(),
        });
    }

    fn draw_arrays(&mut self, offset: u32, count: u32) {
        self.push(Call::DrawArrays { offset, count });
    }

    fn draw_indexed(&mut self, offset: u32, count: u32, index_type: DataType) {
        self.push(Call::DrawIndexed {
            offset,
            count,
            index_type,
        });
    }

    fn draw_arrays_instanced(&mut self, indices_count: u32, instances_count: u32) {
        self.push(Call::DrawArraysInstanced {
            indices_count,
            instances_count,
        });
    }

    fn draw_indexed_instanced(&mut self, indices_count: u32, instances_count: u32, index_type: DataType) {
        self.push(Call::DrawIndexedInstanced {
            indices_count,
            instances_count,
            index_type,
        });
    }

    fn draw_indirect(&mut self, index_type: DataType, indirect_buffer_offset: u32) {
        self.push(Call::DrawIndirect {
            index_type,
            indirect_buffer_offset,
        });
    }

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        self.push(Call::Dispatch {
            groups_x,
            groups_y,
            groups_z,
        });
    }

    fn clear(&mut self, flags: ClearFlags, color: [f32; 4], depth: f32) {
        self.push(Call::Clear {
            flags,
            color,
            depth,
        });
    }

    fn set_framebuffer(
        &mut self,
        attachments: &[TextureHandle],
        depth_stencil: TextureHandle,
        flags: FramebufferFlags,
    ) {
        self.push(Call::SetFramebuffer {
            attachments: attachments.to_vec(),
            depth_stencil,
            flags,
        });
    }

    fn set_framebuffer_cube(&mut self, cube: TextureHandle, face: u32, mip: u32) {
        self.push(Call::SetFramebufferCube { cube, face, mip });
    }

    fn viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.push(Call::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn scissor(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.push(Call::Scissor {
            x,
            y,
            width,
            height,
        });
    }

    fn copy_texture(&mut self, dst: TextureHandle, src: TextureHandle, dst_x: u32, dst_y: u32) {
        self.push(Call::CopyTexture {
            dst,
            src,
            dst_x,
            dst_y,
        });
    }

    fn copy_buffer(
        &mut self,
        dst: BufferHandle,
        src: BufferHandle,
        dst_offset: u32,
        src_offset: u32,
        size: u32,
    ) {
        self.push(Call::CopyBuffer {
            dst,
            src,
            dst_offset,
            src_offset,
            size,
        });
    }

    fn copy_texture_to_buffer(&mut self, dst: BufferHandle, src: TextureHandle) {
        self.push(Call::CopyTextureToBuffer { dst, src });
    }

    fn read_texture(&mut self, texture: TextureHandle, callback: TextureReadCallback) {
        self.push(Call::ReadTexture(texture));
        callback(self.readback.as_slice());
    }

    fn generate_mipmaps(&mut self, texture: TextureHandle) {
        self.push(Call::GenerateMipmaps(texture));
    }

    fn update_texture(
        &mut self,
        texture: TextureHandle,
        region: &TextureRegion,
        format: TextureFormat,
        data: &[u8],
    ) {
        self.push(Call::UpdateTexture {
            texture,
            region: *region,
            format,
            data: data.to_vec(),
        });
    }

    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) {
        self.push(Call::UpdateBuffer {
            buffer,
            data: data.to_vec(),
        });
    }

    fn memory_barrier_buffer(&mut self, buffer: BufferHandle) {
        self.push(Call::MemoryBarrierBuffer(buffer));
    }

    fn memory_barrier_texture(&mut self, texture: TextureHandle) {
        self.push(Call::MemoryBarrierTexture(texture));
    }

    fn barrier_buffer(&mut self, buffer: BufferHandle, ty: BarrierType) {
        self.push(Call::BarrierBuffer { buffer, ty });
    }

    fn barrier_texture(&mut self, texture: TextureHandle, ty: BarrierType) {
        self.push(Call::BarrierTexture { texture, ty });
    }

    fn push_debug_group(&mut self, label: &str) {
        self.push(Call::PushDebugGroup(label.to_owned()));
    }

    fn pop_debug_group(&mut self) {
        self.push(Call::PopDebugGroup);
    }

    fn start_capture(&mut self) {
        self.push(Call::StartCapture);
    }

    fn stop_capture(&mut self) {
        self.push(Call::StopCapture);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileEvent {
    Begin { name: String, link: i64 },
    End,
}

/// Profiler that records block boundaries in order.
#[derive(Debug, Default)]
pub struct ProfileLog {
    events: Mutex<Vec<ProfileEvent>>,
}

impl ProfileLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProfileEvent> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ProfileEvent>> {
        match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Profiler for ProfileLog {
    fn begin_block(&self, name: &str, link: i64) {
        self.lock().push(ProfileEvent::Begin {
            name: name.to_owned(),
            link,
        });
    }

    fn end_block(&self) {
        self.lock().push(ProfileEvent::End);
    }
}
