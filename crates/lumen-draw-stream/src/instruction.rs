//! Typed view of recorded instructions.

use std::fmt;
use std::marker::PhantomData;

use bytemuck::Pod;
use lumen_gpu::{
    BarrierType, BindGroupEntry, BindGroupHandle, BufferFlags, BufferHandle, ClearFlags, DataType,
    FramebufferFlags, ProgramHandle, ShaderBufferFlags, TextureDesc, TextureFlags, TextureFormat,
    TextureHandle, TextureRegion,
};

use crate::bind_cache::{BindCache, DirtyUpdate};
use crate::codec::ByteReader;
use crate::error::DecodeError;
use crate::opcode::Opcode;
use crate::page::Page;
use crate::payload::*;

/// Borrowed array of plain-old-data elements stored unaligned in a page.
#[derive(Clone, Copy)]
pub struct PodList<'a, T> {
    bytes: &'a [u8],
    _marker: PhantomData<T>,
}

impl<'a, T: Pod> PodList<'a, T> {
    fn read(r: &mut ByteReader<'a>, count: u32) -> Result<Self, DecodeError> {
        let size = (count as usize)
            .checked_mul(core::mem::size_of::<T>())
            .ok_or(DecodeError::InvalidValue {
                field: "element count",
                value: count.into(),
            })?;
        Ok(Self {
            bytes: r.read_bytes(size)?,
            _marker: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / core::mem::size_of::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        let size = core::mem::size_of::<T>();
        let start = index.checked_mul(size)?;
        let end = start.checked_add(size)?;
        self.bytes.get(start..end).map(bytemuck::pod_read_unaligned)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        let bytes: &'a [u8] = self.bytes;
        bytes
            .chunks_exact(core::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
    }

    /// Replaces the contents of `out` with the elements.
    pub fn copy_into(&self, out: &mut Vec<T>) {
        out.clear();
        out.extend(self.iter());
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for PodList<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Bind group entries of a `CreateBindGroup` instruction.
#[derive(Clone, Copy)]
pub struct BindGroupEntries<'a> {
    raw: PodList<'a, BindGroupEntryRaw>,
}

impl<'a> BindGroupEntries<'a> {
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = BindGroupEntry> + 'a {
        self.raw.iter().map(BindGroupEntryRaw::decode)
    }

    pub fn to_vec(&self) -> Vec<BindGroupEntry> {
        self.iter().collect()
    }
}

impl fmt::Debug for BindGroupEntries<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// One decoded instruction, borrowing variable-length data from its page.
///
/// Instructions that carry out-of-line data (program descriptions, uploads,
/// callbacks, frees, functions, sub-streams) expose only their inline part.
#[derive(Clone, Copy, Debug)]
pub enum Instruction<'a> {
    Bind(BindCache),
    DirtyCache(DirtyUpdate),

    CreateTexture {
        handle: TextureHandle,
        desc: TextureDesc,
        debug_name: &'a str,
    },
    CreateBuffer {
        handle: BufferHandle,
        flags: BufferFlags,
        size: u64,
        has_data: bool,
        debug_name: &'a str,
    },
    CreateProgram(ProgramHandle),
    CreateBindGroup {
        handle: BindGroupHandle,
        entries: BindGroupEntries<'a>,
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
    SetTextureDebugName {
        texture: TextureHandle,
        name: &'a str,
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
        textures: PodList<'a, TextureHandle>,
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
        attachments: PodList<'a, TextureHandle>,
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
    },
    UpdateBuffer(BufferHandle),

    MemoryBarrier(BufferHandle),
    MemoryBarrierTexture(TextureHandle),
    Barrier {
        buffer: BufferHandle,
        ty: BarrierType,
    },
    BarrierTexture {
        texture: TextureHandle,
        ty: BarrierType,
    },

    PushDebugGroup(&'a str),
    PopDebugGroup,
    StartCapture,
    StopCapture,
    BeginProfileBlock {
        name: &'a str,
        link: i64,
    },
    EndProfileBlock,

    FreeMemory,
    FreeAlignedMemory,
    /// Opaque bytes reserved with `user_alloc`; replay skips them.
    UserAlloc(&'a [u8]),
    Function(&'a [u8]),
    Substream,
}

fn data_type(v: u32) -> Result<DataType, DecodeError> {
    DataType::from_u32(v).ok_or(DecodeError::InvalidValue {
        field: "index type",
        value: v.into(),
    })
}

fn barrier_type(v: u32) -> Result<BarrierType, DecodeError> {
    BarrierType::from_u32(v).ok_or(DecodeError::InvalidValue {
        field: "barrier type",
        value: v.into(),
    })
}

fn texture_format(v: u32) -> Result<TextureFormat, DecodeError> {
    TextureFormat::from_u32(v).ok_or(DecodeError::InvalidValue {
        field: "texture format",
        value: v.into(),
    })
}

impl<'a> Instruction<'a> {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Bind(_) => Opcode::Bind,
            Self::DirtyCache(_) => Opcode::DirtyCache,
            Self::CreateTexture { .. } => Opcode::CreateTexture,
            Self::CreateBuffer { .. } => Opcode::CreateBuffer,
            Self::CreateProgram(_) => Opcode::CreateProgram,
            Self::CreateBindGroup { .. } => Opcode::CreateBindGroup,
            Self::CreateTextureView { .. } => Opcode::CreateTextureView,
            Self::DestroyTexture(_) => Opcode::DestroyTexture,
            Self::DestroyBuffer(_) => Opcode::DestroyBuffer,
            Self::DestroyProgram(_) => Opcode::DestroyProgram,
            Self::DestroyBindGroup(_) => Opcode::DestroyBindGroup,
            Self::SetTextureDebugName { .. } => Opcode::SetTextureDebugName,
            Self::BindUniformBuffer { .. } => Opcode::BindUniformBuffer,
            Self::BindShaderBuffer { .. } => Opcode::BindShaderBuffer,
            Self::BindImageTexture { .. } => Opcode::BindImageTexture,
            Self::BindTextures { .. } => Opcode::BindTextures,
            Self::DrawArrays { .. } => Opcode::DrawArrays,
            Self::DrawIndexed { .. } => Opcode::DrawIndexed,
            Self::DrawArraysInstanced { .. } => Opcode::DrawArraysInstanced,
            Self::DrawIndexedInstanced { .. } => Opcode::DrawIndexedInstanced,
            Self::DrawIndirect { .. } => Opcode::DrawIndirect,
            Self::Dispatch { .. } => Opcode::Dispatch,
            Self::Clear { .. } => Opcode::Clear,
            Self::SetFramebuffer { .. } => Opcode::SetFramebuffer,
            Self::SetFramebufferCube { .. } => Opcode::SetFramebufferCube,
            Self::Viewport { .. } => Opcode::Viewport,
            Self::Scissor { .. } => Opcode::Scissor,
            Self::CopyTexture { .. } => Opcode::CopyTexture,
            Self::CopyBuffer { .. } => Opcode::CopyBuffer,
            Self::CopyTextureToBuffer { .. } => Opcode::CopyTextureToBuffer,
            Self::ReadTexture(_) => Opcode::ReadTexture,
            Self::GenerateMipmaps(_) => Opcode::GenerateMipmaps,
            Self::UpdateTexture { .. } => Opcode::UpdateTexture,
            Self::UpdateBuffer(_) => Opcode::UpdateBuffer,
            Self::MemoryBarrier(_) => Opcode::MemoryBarrier,
            Self::MemoryBarrierTexture(_) => Opcode::MemoryBarrierTexture,
            Self::Barrier { .. } => Opcode::Barrier,
            Self::BarrierTexture { .. } => Opcode::BarrierTexture,
            Self::PushDebugGroup(_) => Opcode::PushDebugGroup,
            Self::PopDebugGroup => Opcode::PopDebugGroup,
            Self::StartCapture => Opcode::StartCapture,
            Self::StopCapture => Opcode::StopCapture,
            Self::BeginProfileBlock { .. } => Opcode::BeginProfileBlock,
            Self::EndProfileBlock => Opcode::EndProfileBlock,
            Self::FreeMemory => Opcode::FreeMemory,
            Self::FreeAlignedMemory => Opcode::FreeAlignedMemory,
            Self::UserAlloc(_) => Opcode::UserAlloc,
            Self::Function(_) => Opcode::Function,
            Self::Substream => Opcode::Substream,
        }
    }

    /// Decodes the instruction at the reader's position.
    ///
    /// Returns `Ok(None)` on the page terminator.
    pub(crate) fn decode(r: &mut ByteReader<'a>) -> Result<Option<Self>, DecodeError> {
        let offset = r.position();
        let byte = r.read_u8()?;
        let opcode =
            Opcode::from_u8(byte).ok_or(DecodeError::UnknownOpcode { opcode: byte, offset })?;

        let instruction = match opcode {
            Opcode::End => return Ok(None),
            Opcode::Bind => Self::Bind(r.read_pod()?),
            Opcode::DirtyCache => Self::DirtyCache(DirtyUpdate::decode(r)?),

            Opcode::CreateTexture => {
                let p: CreateTexturePayload = r.read_pod()?;
                Self::CreateTexture {
                    handle: p.handle,
                    desc: TextureDesc {
                        width: p.width,
                        height: p.height,
                        depth: p.depth,
                        format: texture_format(p.format)?,
                        flags: TextureFlags::from_bits_retain(p.flags),
                    },
                    debug_name: r.read_str()?,
                }
            }
            Opcode::CreateBuffer => {
                let p: CreateBufferPayload = r.read_pod()?;
                Self::CreateBuffer {
                    handle: p.handle,
                    flags: BufferFlags::from_bits_retain(p.flags),
                    size: p.size,
                    has_data: p.has_data != 0,
                    debug_name: r.read_str()?,
                }
            }
            Opcode::CreateProgram => Self::CreateProgram(r.read_pod()?),
            Opcode::CreateBindGroup => {
                let p: CreateBindGroupPayload = r.read_pod()?;
                let raw = PodList::<BindGroupEntryRaw>::read(r, p.count)?;
                if let Some(bad) = raw.iter().find(|e| {
                    e.kind != BindGroupEntryRaw::KIND_TEXTURE
                        && e.kind != BindGroupEntryRaw::KIND_UNIFORM_BUFFER
                }) {
                    return Err(DecodeError::InvalidValue {
                        field: "bind group entry kind",
                        value: bad.kind.into(),
                    });
                }
                Self::CreateBindGroup {
                    handle: p.handle,
                    entries: BindGroupEntries { raw },
                }
            }
            Opcode::CreateTextureView => {
                let p: CreateTextureViewPayload = r.read_pod()?;
                Self::CreateTextureView {
                    view: p.view,
                    texture: p.texture,
                    layer: p.layer,
                    mip: p.mip,
                }
            }
            Opcode::DestroyTexture => Self::DestroyTexture(r.read_pod()?),
            Opcode::DestroyBuffer => Self::DestroyBuffer(r.read_pod()?),
            Opcode::DestroyProgram => Self::DestroyProgram(r.read_pod()?),
            Opcode::DestroyBindGroup => Self::DestroyBindGroup(r.read_pod()?),
            Opcode::SetTextureDebugName => Self::SetTextureDebugName {
                texture: r.read_pod()?,
                name: r.read_str()?,
            },

            Opcode::BindUniformBuffer => {
                let p: BindUniformBufferPayload = r.read_pod()?;
                Self::BindUniformBuffer {
                    index: p.index,
                    buffer: p.buffer,
                    offset: p.offset,
                    size: p.size,
                }
            }
            Opcode::BindShaderBuffer => {
                let p: BindShaderBufferPayload = r.read_pod()?;
                Self::BindShaderBuffer {
                    buffer: p.buffer,
                    binding: p.binding,
                    flags: ShaderBufferFlags::from_bits_retain(p.flags),
                }
            }
            Opcode::BindImageTexture => {
                let p: BindImageTexturePayload = r.read_pod()?;
                Self::BindImageTexture {
                    texture: p.texture,
                    unit: p.unit,
                }
            }
            Opcode::BindTextures => {
                let p: BindTexturesPayload = r.read_pod()?;
                Self::BindTextures {
                    offset: p.offset,
                    textures: PodList::read(r, p.count)?,
                }
            }

            Opcode::DrawArrays => {
                let p: DrawArraysPayload = r.read_pod()?;
                Self::DrawArrays {
                    offset: p.offset,
                    count: p.count,
                }
            }
            Opcode::DrawIndexed => {
                let p: DrawIndexedPayload = r.read_pod()?;
                Self::DrawIndexed {
                    offset: p.offset,
                    count: p.count,
                    index_type: data_type(p.index_type)?,
                }
            }
            Opcode::DrawArraysInstanced => {
                let p: DrawArraysInstancedPayload = r.read_pod()?;
                Self::DrawArraysInstanced {
                    indices_count: p.indices_count,
                    instances_count: p.instances_count,
                }
            }
            Opcode::DrawIndexedInstanced => {
                let p: DrawIndexedInstancedPayload = r.read_pod()?;
                Self::DrawIndexedInstanced {
                    indices_count: p.indices_count,
                    instances_count: p.instances_count,
                    index_type: data_type(p.index_type)?,
                }
            }
            Opcode::DrawIndirect => {
                let p: DrawIndirectPayload = r.read_pod()?;
                Self::DrawIndirect {
                    index_type: data_type(p.index_type)?,
                    indirect_buffer_offset: p.indirect_buffer_offset,
                }
            }
            Opcode::Dispatch => {
                let p: DispatchPayload = r.read_pod()?;
                Self::Dispatch {
                    groups_x: p.groups_x,
                    groups_y: p.groups_y,
                    groups_z: p.groups_z,
                }
            }

            Opcode::Clear => {
                let p: ClearPayload = r.read_pod()?;
                Self::Clear {
                    flags: ClearFlags::from_bits_retain(p.flags),
                    color: p.color,
                    depth: p.depth,
                }
            }
            Opcode::SetFramebuffer => {
                let p: SetFramebufferPayload = r.read_pod()?;
                Self::SetFramebuffer {
                    attachments: PodList::read(r, p.count)?,
                    depth_stencil: p.depth_stencil,
                    flags: FramebufferFlags::from_bits_retain(p.flags),
                }
            }
            Opcode::SetFramebufferCube => {
                let p: SetFramebufferCubePayload = r.read_pod()?;
                Self::SetFramebufferCube {
                    cube: p.cube,
                    face: p.face,
                    mip: p.mip,
                }
            }
            Opcode::Viewport => {
                let p: RectPayload = r.read_pod()?;
                Self::Viewport {
                    x: p.x,
                    y: p.y,
                    width: p.width,
                    height: p.height,
                }
            }
            Opcode::Scissor => {
                let p: RectPayload = r.read_pod()?;
                Self::Scissor {
                    x: p.x,
                    y: p.y,
                    width: p.width,
                    height: p.height,
                }
            }

            Opcode::CopyTexture => {
                let p: CopyTexturePayload = r.read_pod()?;
                Self::CopyTexture {
                    dst: p.dst,
                    src: p.src,
                    dst_x: p.dst_x,
                    dst_y: p.dst_y,
                }
            }
            Opcode::CopyBuffer => {
                let p: CopyBufferPayload = r.read_pod()?;
                Self::CopyBuffer {
                    dst: p.dst,
                    src: p.src,
                    dst_offset: p.dst_offset,
                    src_offset: p.src_offset,
                    size: p.size,
                }
            }
            Opcode::CopyTextureToBuffer => {
                let p: CopyTextureToBufferPayload = r.read_pod()?;
                Self::CopyTextureToBuffer { dst: p.dst, src: p.src }
            }
            Opcode::ReadTexture => Self::ReadTexture(r.read_pod()?),
            Opcode::GenerateMipmaps => Self::GenerateMipmaps(r.read_pod()?),
            Opcode::UpdateTexture => {
                let p: UpdateTexturePayload = r.read_pod()?;
                Self::UpdateTexture {
                    texture: p.texture,
                    region: p.region,
                    format: texture_format(p.format)?,
                }
            }
            Opcode::UpdateBuffer => Self::UpdateBuffer(r.read_pod()?),

            Opcode::MemoryBarrier => Self::MemoryBarrier(r.read_pod()?),
            Opcode::MemoryBarrierTexture => Self::MemoryBarrierTexture(r.read_pod()?),
            Opcode::Barrier => {
                let p: BarrierPayload = r.read_pod()?;
                Self::Barrier {
                    buffer: BufferHandle(p.handle),
                    ty: barrier_type(p.ty)?,
                }
            }
            Opcode::BarrierTexture => {
                let p: BarrierPayload = r.read_pod()?;
                Self::BarrierTexture {
                    texture: TextureHandle(p.handle),
                    ty: barrier_type(p.ty)?,
                }
            }

            Opcode::PushDebugGroup => Self::PushDebugGroup(r.read_str()?),
            Opcode::PopDebugGroup => Self::PopDebugGroup,
            Opcode::StartCapture => Self::StartCapture,
            Opcode::StopCapture => Self::StopCapture,
            Opcode::BeginProfileBlock => {
                let link: i64 = r.read_pod()?;
                Self::BeginProfileBlock {
                    name: r.read_str()?,
                    link,
                }
            }
            Opcode::EndProfileBlock => Self::EndProfileBlock,

            Opcode::FreeMemory => Self::FreeMemory,
            Opcode::FreeAlignedMemory => Self::FreeAlignedMemory,
            Opcode::UserAlloc => Self::UserAlloc(r.read_len_prefixed()?),
            Opcode::Function => Self::Function(r.read_len_prefixed()?),
            Opcode::Substream => Self::Substream,
        };
        Ok(Some(instruction))
    }
}

/// Iterator over the instructions of a stream, page by page.
///
/// Yields at most one error, after which it is exhausted.
pub struct Instructions<'a> {
    pages: &'a [Page],
    reader: Option<ByteReader<'a>>,
}

impl<'a> Instructions<'a> {
    pub(crate) fn new(pages: &'a [Page]) -> Self {
        Self {
            pages,
            reader: None,
        }
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.reader.is_none() {
                let (page, rest) = self.pages.split_first()?;
                self.pages = rest;
                self.reader = Some(ByteReader::new(page.bytes()));
            }
            let Some(reader) = self.reader.as_mut() else {
                return None;
            };
            match Instruction::decode(reader) {
                Ok(Some(instruction)) => return Some(Ok(instruction)),
                Ok(None) => self.reader = None,
                Err(err) => {
                    self.reader = None;
                    self.pages = &[];
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ByteWriter;

    #[test]
    fn pod_list_reads_unaligned_elements() {
        let mut buf = [0u8; 1 + 12];
        let mut w = ByteWriter::new(&mut buf);
        w.write_u8(0xEE);
        w.write_pod_slice(&[TextureHandle(1), TextureHandle(2), TextureHandle(3)]);

        let mut r = ByteReader::new(&buf);
        r.read_u8().unwrap();
        let list = PodList::<TextureHandle>::read(&mut r, 3).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(1), Some(TextureHandle(2)));
        assert_eq!(list.get(3), None);
        assert_eq!(
            list.to_vec(),
            vec![TextureHandle(1), TextureHandle(2), TextureHandle(3)]
        );
    }

    #[test]
    fn decode_rejects_unknown_opcode() {
        let buf = [0xF0u8];
        let err = Instruction::decode(&mut ByteReader::new(&buf)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownOpcode {
                opcode: 0xF0,
                offset: 0
            }
        );
    }

    #[test]
    fn decode_rejects_bad_index_type() {
        let mut buf = [0u8; 1 + 12];
        let mut w = ByteWriter::new(&mut buf);
        w.write_u8(Opcode::DrawIndexed as u8);
        w.write_pod(&DrawIndexedPayload {
            offset: 0,
            count: 3,
            index_type: 7,
        });
        let err = Instruction::decode(&mut ByteReader::new(&buf)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidValue {
                field: "index type",
                value: 7
            }
        );
    }

    #[test]
    fn end_decodes_to_none() {
        let buf = [Opcode::End as u8];
        assert!(Instruction::decode(&mut ByteReader::new(&buf))
            .unwrap()
            .is_none());
    }
}
