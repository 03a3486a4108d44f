use crate::handle::{BindGroupHandle, BufferHandle, ProgramHandle, TextureHandle};
use crate::program::ProgramDesc;
use crate::types::{
    BarrierType, BindGroupEntry, BufferFlags, ClearFlags, DataType, FramebufferFlags,
    ShaderBufferFlags, TextureDesc, TextureFormat, TextureRegion,
};

/// Invoked with the texel data once a texture read-back completes.
pub type TextureReadCallback = Box<dyn FnOnce(&[u8]) + Send>;

/// A graphics API as seen by draw stream replay.
///
/// Every method corresponds to exactly one replayed call. Implementations own
/// failure handling; replay never inspects results.
pub trait Backend {
    // Resources.
    fn create_texture(&mut self, handle: TextureHandle, desc: &TextureDesc, debug_name: &str);
    fn create_buffer(
        &mut self,
        handle: BufferHandle,
        flags: BufferFlags,
        size: u64,
        data: Option<&[u8]>,
        debug_name: &str,
    );
    fn create_program(&mut self, handle: ProgramHandle, desc: &ProgramDesc);
    fn create_bind_group(&mut self, handle: BindGroupHandle, entries: &[BindGroupEntry]);
    fn create_texture_view(
        &mut self,
        view: TextureHandle,
        texture: TextureHandle,
        layer: u32,
        mip: u32,
    );
    fn destroy_texture(&mut self, handle: TextureHandle);
    fn destroy_buffer(&mut self, handle: BufferHandle);
    fn destroy_program(&mut self, handle: ProgramHandle);
    fn destroy_bind_group(&mut self, handle: BindGroupHandle);
    fn set_debug_name(&mut self, texture: TextureHandle, name: &str);

    // Bindings.
    fn use_program(&mut self, program: ProgramHandle);
    fn bind_index_buffer(&mut self, buffer: BufferHandle);
    fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u32, stride: u32);
    fn bind_indirect_buffer(&mut self, buffer: BufferHandle);
    fn bind(&mut self, index: u32, group: BindGroupHandle);
    fn bind_uniform_buffer(&mut self, index: u32, buffer: BufferHandle, offset: u32, size: u32);
    fn bind_shader_buffer(&mut self, buffer: BufferHandle, binding: u32, flags: ShaderBufferFlags);
    fn bind_image_texture(&mut self, texture: TextureHandle, unit: u32);
    fn bind_textures(&mut self, offset: u32, textures: &[TextureHandle]);

    // Draws.
    fn draw_arrays(&mut self, offset: u32, count: u32);
    fn draw_indexed(&mut self, offset: u32, count: u32, index_type: DataType);
    fn draw_arrays_instanced(&mut self, indices_count: u32, instances_count: u32);
    fn draw_indexed_instanced(
        &mut self,
        indices_count: u32,
        instances_count: u32,
        index_type: DataType,
    );
    fn draw_indirect(&mut self, index_type: DataType, indirect_buffer_offset: u32);
    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32);

    // Pass state.
    fn clear(&mut self, flags: ClearFlags, color: [f32; 4], depth: f32);
    fn set_framebuffer(
        &mut self,
        attachments: &[TextureHandle],
        depth_stencil: TextureHandle,
        flags: FramebufferFlags,
    );
    fn set_framebuffer_cube(&mut self, cube: TextureHandle, face: u32, mip: u32);
    fn viewport(&mut self, x: u32, y: u32, width: u32, height: u32);
    fn scissor(&mut self, x: u32, y: u32, width: u32, height: u32);

    // Transfers.
    fn copy_texture(&mut self, dst: TextureHandle, src: TextureHandle, dst_x: u32, dst_y: u32);
    fn copy_buffer(
        &mut self,
        dst: BufferHandle,
        src: BufferHandle,
        dst_offset: u32,
        src_offset: u32,
        size: u32,
    );
    fn copy_texture_to_buffer(&mut self, dst: BufferHandle, src: TextureHandle);
    fn read_texture(&mut self, texture: TextureHandle, callback: TextureReadCallback);
    fn generate_mipmaps(&mut self, texture: TextureHandle);
    fn update_texture(
        &mut self,
        texture: TextureHandle,
        region: &TextureRegion,
        format: TextureFormat,
        data: &[u8],
    );
    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]);

    // Synchronization.
    fn memory_barrier_buffer(&mut self, buffer: BufferHandle);
    fn memory_barrier_texture(&mut self, texture: TextureHandle);
    fn barrier_buffer(&mut self, buffer: BufferHandle, ty: BarrierType);
    fn barrier_texture(&mut self, texture: TextureHandle, ty: BarrierType);

    // Debugging.
    fn push_debug_group(&mut self, label: &str);
    fn pop_debug_group(&mut self);
    fn start_capture(&mut self);
    fn stop_capture(&mut self);
}

/// Discards every call. Read-back callbacks are dropped without being invoked.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl Backend for NullBackend {
    fn create_texture(&mut self, _: TextureHandle, _: &TextureDesc, _: &str) {}
    fn create_buffer(&mut self, _: BufferHandle, _: BufferFlags, _: u64, _: Option<&[u8]>, _: &str) {}
    fn create_program(&mut self, _: ProgramHandle, _: &ProgramDesc) {}
    fn create_bind_group(&mut self, _: BindGroupHandle, _: &[BindGroupEntry]) {}
    fn create_texture_view(&mut self, _: TextureHandle, _: TextureHandle, _: u32, _: u32) {}
    fn destroy_texture(&mut self, _: TextureHandle) {}
    fn destroy_buffer(&mut self, _: BufferHandle) {}
    fn destroy_program(&mut self, _: ProgramHandle) {}
    fn destroy_bind_group(&mut self, _: BindGroupHandle) {}
    fn set_debug_name(&mut self, _: TextureHandle, _: &str) {}

    fn use_program(&mut self, _: ProgramHandle) {}
    fn bind_index_buffer(&mut self, _: BufferHandle) {}
    fn bind_vertex_buffer(&mut self, _: u32, _: BufferHandle, _: u32, _: u32) {}
    fn bind_indirect_buffer(&mut self, _: BufferHandle) {}
    fn bind(&mut self, _: u32, _: BindGroupHandle) {}
    fn bind_uniform_buffer(&mut self, _: u32, _: BufferHandle, _: u32, _: u32) {}
    fn bind_shader_buffer(&mut self, _: BufferHandle, _: u32, _: ShaderBufferFlags) {}
    fn bind_image_texture(&mut self, _: TextureHandle, _: u32) {}
    fn bind_textures(&mut self, _: u32, _: &[TextureHandle]) {}

    fn draw_arrays(&mut self, _: u32, _: u32) {}
    fn draw_indexed(&mut self, _: u32, _: u32, _: DataType) {}
    fn draw_arrays_instanced(&mut self, _: u32, _: u32) {}
    fn draw_indexed_instanced(&mut self, _: u32, _: u32, _: DataType) {}
    fn draw_indirect(&mut self, _: DataType, _: u32) {}
    fn dispatch(&mut self, _: u32, _: u32, _: u32) {}

    fn clear(&mut self, _: ClearFlags, _: [f32; 4], _: f32) {}
    fn set_framebuffer(&mut self, _: &[TextureHandle], _: TextureHandle, _: FramebufferFlags) {}
    fn set_framebuffer_cube(&mut self, _: TextureHandle, _: u32, _: u32) {}
    fn viewport(&mut self, _: u32, _: u32, _: u32, _: u32) {}
    fn scissor(&mut self, _: u32, _: u32, _: u32, _: u32) {}

    fn copy_texture(&mut self, _: TextureHandle, _: TextureHandle, _: u32, _: u32) {}
    fn copy_buffer(&mut self, _: BufferHandle, _: BufferHandle, _: u32, _: u32, _: u32) {}
    fn copy_texture_to_buffer(&mut self, _: BufferHandle, _: TextureHandle) {}
    fn read_texture(&mut self, _: TextureHandle, _: TextureReadCallback) {}
    fn generate_mipmaps(&mut self, _: TextureHandle) {}
    fn update_texture(&mut self, _: TextureHandle, _: &TextureRegion, _: TextureFormat, _: &[u8]) {}
    fn update_buffer(&mut self, _: BufferHandle, _: &[u8]) {}

    fn memory_barrier_buffer(&mut self, _: BufferHandle) {}
    fn memory_barrier_texture(&mut self, _: TextureHandle) {}
    fn barrier_buffer(&mut self, _: BufferHandle, _: BarrierType) {}
    fn barrier_texture(&mut self, _: TextureHandle, _: BarrierType) {}

    fn push_debug_group(&mut self, _: &str) {}
    fn pop_debug_group(&mut self) {}
    fn start_capture(&mut self) {}
    fn stop_capture(&mut self) {}
}
