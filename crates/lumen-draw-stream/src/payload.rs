//! Fixed-size instruction payloads.
//!
//! Every struct is `#[repr(C)]` without implicit padding so it can be copied in
//! and out of page bytes with `bytemuck`.

use bytemuck::{Pod, Zeroable};
use lumen_gpu::{BindGroupEntry, BindGroupHandle, BufferHandle, TextureHandle, TextureRegion};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct CreateTexturePayload {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: u32,
    pub flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct CreateBufferPayload {
    pub size: u64,
    pub handle: BufferHandle,
    pub flags: u32,
    pub has_data: u32,
    pub _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct CreateBindGroupPayload {
    pub handle: BindGroupHandle,
    pub count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct BindGroupEntryRaw {
    pub kind: u32,
    pub handle: u32,
    pub bind_point: u32,
    pub offset: u32,
    pub size: u32,
}

impl BindGroupEntryRaw {
    pub const KIND_TEXTURE: u32 = 0;
    pub const KIND_UNIFORM_BUFFER: u32 = 1;

    pub fn encode(entry: &BindGroupEntry) -> Self {
        match *entry {
            BindGroupEntry::Texture {
                texture,
                bind_point,
            } => Self {
                kind: Self::KIND_TEXTURE,
                handle: texture.0,
                bind_point,
                offset: 0,
                size: 0,
            },
            BindGroupEntry::UniformBuffer {
                buffer,
                bind_point,
                offset,
                size,
            } => Self {
                kind: Self::KIND_UNIFORM_BUFFER,
                handle: buffer.0,
                bind_point,
                offset,
                size,
            },
        }
    }

    /// Kinds are validated when the instruction is decoded.
    pub fn decode(self) -> BindGroupEntry {
        if self.kind == Self::KIND_TEXTURE {
            BindGroupEntry::Texture {
                texture: TextureHandle(self.handle),
                bind_point: self.bind_point,
            }
        } else {
            BindGroupEntry::UniformBuffer {
                buffer: BufferHandle(self.handle),
                bind_point: self.bind_point,
                offset: self.offset,
                size: self.size,
            }
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct CreateTextureViewPayload {
    pub view: TextureHandle,
    pub texture: TextureHandle,
    pub layer: u32,
    pub mip: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct BindUniformBufferPayload {
    pub index: u32,
    pub buffer: BufferHandle,
    pub offset: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct BindShaderBufferPayload {
    pub buffer: BufferHandle,
    pub binding: u32,
    pub flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct BindImageTexturePayload {
    pub texture: TextureHandle,
    pub unit: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct BindTexturesPayload {
    pub offset: u32,
    pub count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct DrawArraysPayload {
    pub offset: u32,
    pub count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct DrawIndexedPayload {
    pub offset: u32,
    pub count: u32,
    pub index_type: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct DrawArraysInstancedPayload {
    pub indices_count: u32,
    pub instances_count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct DrawIndexedInstancedPayload {
    pub indices_count: u32,
    pub instances_count: u32,
    pub index_type: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct DrawIndirectPayload {
    pub index_type: u32,
    pub indirect_buffer_offset: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct DispatchPayload {
    pub groups_x: u32,
    pub groups_y: u32,
    pub groups_z: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct ClearPayload {
    pub color: [f32; 4],
    pub depth: f32,
    pub flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct SetFramebufferPayload {
    pub count: u32,
    pub depth_stencil: TextureHandle,
    pub flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct SetFramebufferCubePayload {
    pub cube: TextureHandle,
    pub face: u32,
    pub mip: u32,
}

/// Viewport and scissor rectangles.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct RectPayload {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct CopyTexturePayload {
    pub dst: TextureHandle,
    pub src: TextureHandle,
    pub dst_x: u32,
    pub dst_y: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct CopyBufferPayload {
    pub dst: BufferHandle,
    pub src: BufferHandle,
    pub dst_offset: u32,
    pub src_offset: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct CopyTextureToBufferPayload {
    pub dst: BufferHandle,
    pub src: TextureHandle,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct UpdateTexturePayload {
    pub texture: TextureHandle,
    pub region: TextureRegion,
    pub format: u32,
}

/// Buffer/texture barrier; `handle` is interpreted by the opcode.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct BarrierPayload {
    pub handle: u32,
    pub ty: u32,
}

const _: () = assert!(core::mem::size_of::<CreateBufferPayload>() == 24);
const _: () = assert!(core::mem::size_of::<ClearPayload>() == 24);
const _: () = assert!(core::mem::size_of::<UpdateTexturePayload>() == 32);
