use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::handle::{BufferHandle, TextureHandle};

/// Texel formats. Discriminants are stable; recorded streams store them as `u32`.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8 = 0,
    Rg8 = 1,
    D32 = 2,
    D24S8 = 3,
    Rgba8 = 4,
    Rgba16 = 5,
    Rgba16F = 6,
    Rgba32F = 7,
    Bgra8 = 8,
    R16F = 9,
    R16 = 10,
    R32F = 11,
    Rg32F = 12,
    Srgb = 13,
    Srgba = 14,
    Bc1 = 15,
    Bc2 = 16,
    Bc3 = 17,
    Bc4 = 18,
    Bc5 = 19,
    R11G11B10F = 20,
    Rgb32F = 21,
    Rg16 = 22,
    Rg16F = 23,
}

impl TextureFormat {
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::R8),
            1 => Some(Self::Rg8),
            2 => Some(Self::D32),
            3 => Some(Self::D24S8),
            4 => Some(Self::Rgba8),
            5 => Some(Self::Rgba16),
            6 => Some(Self::Rgba16F),
            7 => Some(Self::Rgba32F),
            8 => Some(Self::Bgra8),
            9 => Some(Self::R16F),
            10 => Some(Self::R16),
            11 => Some(Self::R32F),
            12 => Some(Self::Rg32F),
            13 => Some(Self::Srgb),
            14 => Some(Self::Srgba),
            15 => Some(Self::Bc1),
            16 => Some(Self::Bc2),
            17 => Some(Self::Bc3),
            18 => Some(Self::Bc4),
            19 => Some(Self::Bc5),
            20 => Some(Self::R11G11B10F),
            21 => Some(Self::Rgb32F),
            22 => Some(Self::Rg16),
            23 => Some(Self::Rg16F),
            _ => None,
        }
    }

    pub const fn is_depth(self) -> bool {
        matches!(self, Self::D32 | Self::D24S8)
    }

    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::Bc1 | Self::Bc2 | Self::Bc3 | Self::Bc4 | Self::Bc5)
    }
}

/// Index element type.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    U16 = 0,
    U32 = 1,
}

impl DataType {
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::U16),
            1 => Some(Self::U32),
            _ => None,
        }
    }

    pub const fn size_bytes(self) -> u32 {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderType {
    Vertex = 0,
    Fragment = 1,
    Compute = 2,
}

impl ShaderType {
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Vertex),
            1 => Some(Self::Fragment),
            2 => Some(Self::Compute),
            _ => None,
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Triangles = 0,
    TriangleStrip = 1,
    Lines = 2,
    Points = 3,
    #[default]
    None = 4,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
    U8 = 0,
    Float = 1,
    I16 = 2,
    I8 = 3,
}

impl AttributeType {
    pub const fn size_bytes(self) -> u32 {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::I16 => 2,
            Self::Float => 4,
        }
    }
}

/// Access kind for explicit resource barriers.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BarrierType {
    Read = 0,
    Write = 1,
    Common = 2,
}

impl BarrierType {
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Read),
            1 => Some(Self::Write),
            2 => Some(Self::Common),
            _ => None,
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u32 {
        const NO_MIPS = 1 << 1;
        const SRGB = 1 << 2;
        const READBACK = 1 << 3;
        const IS_3D = 1 << 4;
        const IS_CUBE = 1 << 5;
        const COMPUTE_WRITE = 1 << 6;
        const RENDER_TARGET = 1 << 7;
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BufferFlags: u32 {
        const IMMUTABLE = 1 << 0;
        const SHADER_BUFFER = 1 << 1;
        const MAPPABLE = 1 << 2;
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FramebufferFlags: u32 {
        const SRGB = 1 << 0;
        const READONLY_DEPTH = 1 << 1;
        const READONLY_STENCIL = 1 << 2;
        const READONLY_DEPTH_STENCIL = Self::READONLY_DEPTH.bits() | Self::READONLY_STENCIL.bits();
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ShaderBufferFlags: u32 {
        const WRITE = 1 << 0;
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttributeFlags: u8 {
        const NORMALIZED = 1 << 0;
        const AS_INT = 1 << 1;
        const INSTANCED = 1 << 2;
    }

    /// Fixed-function pipeline state baked into a program.
    ///
    /// Bits above `DEPTH_WRITE` carry packed blend and stencil state and are
    /// preserved verbatim.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StateFlags: u64 {
        const WIREFRAME = 1 << 0;
        const DEPTH_FN_GREATER = 1 << 1;
        const DEPTH_FN_EQUAL = 1 << 2;
        const DEPTH_FUNCTION = Self::DEPTH_FN_GREATER.bits() | Self::DEPTH_FN_EQUAL.bits();
        const CULL_FRONT = 1 << 3;
        const CULL_BACK = 1 << 4;
        const DEPTH_WRITE = 1 << 5;

        const _ = !0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: TextureFormat,
    pub flags: TextureFlags,
}

impl TextureDesc {
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, flags: TextureFlags) -> Self {
        Self {
            width,
            height,
            depth: 1,
            format,
            flags,
        }
    }
}

/// Destination rectangle of a texture upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TextureRegion {
    pub mip: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindGroupEntry {
    Texture {
        texture: TextureHandle,
        bind_point: u32,
    },
    UniformBuffer {
        buffer: BufferHandle,
        bind_point: u32,
        offset: u32,
        size: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_format_discriminants_round_trip() {
        for v in 0..=23u32 {
            let format = TextureFormat::from_u32(v).expect("format in range");
            assert_eq!(format as u32, v);
        }
        assert_eq!(TextureFormat::from_u32(24), None);
    }

    #[test]
    fn state_flags_keep_packed_bits() {
        let packed = StateFlags::from_bits_retain(0xAB << 23) | StateFlags::CULL_BACK;
        assert_eq!(StateFlags::from_bits_retain(packed.bits()), packed);
        assert!(packed.contains(StateFlags::CULL_BACK));
    }

    #[test]
    fn depth_formats() {
        assert!(TextureFormat::D24S8.is_depth());
        assert!(!TextureFormat::Rgba8.is_depth());
        assert!(TextureFormat::Bc3.is_compressed());
    }
}
