/// Leading byte of every recorded instruction.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Terminates a page.
    End = 0,
    Bind = 1,
    DirtyCache = 2,

    CreateTexture = 3,
    CreateBuffer = 4,
    CreateProgram = 5,
    CreateBindGroup = 6,
    CreateTextureView = 7,
    DestroyTexture = 8,
    DestroyBuffer = 9,
    DestroyProgram = 10,
    DestroyBindGroup = 11,
    SetTextureDebugName = 12,

    BindUniformBuffer = 13,
    BindShaderBuffer = 14,
    BindImageTexture = 15,
    BindTextures = 16,

    DrawArrays = 17,
    DrawIndexed = 18,
    DrawArraysInstanced = 19,
    DrawIndexedInstanced = 20,
    DrawIndirect = 21,
    Dispatch = 22,

    Clear = 23,
    SetFramebuffer = 24,
    SetFramebufferCube = 25,
    Viewport = 26,
    Scissor = 27,

    CopyTexture = 28,
    CopyBuffer = 29,
    CopyTextureToBuffer = 30,
    ReadTexture = 31,
    GenerateMipmaps = 32,
    UpdateTexture = 33,
    UpdateBuffer = 34,

    MemoryBarrier = 35,
    MemoryBarrierTexture = 36,
    Barrier = 37,
    BarrierTexture = 38,

    PushDebugGroup = 39,
    PopDebugGroup = 40,
    StartCapture = 41,
    StopCapture = 42,
    BeginProfileBlock = 43,
    EndProfileBlock = 44,

    FreeMemory = 45,
    FreeAlignedMemory = 46,
    UserAlloc = 47,
    Function = 48,
    Substream = 49,
}

impl Opcode {
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::End),
            1 => Some(Self::Bind),
            2 => Some(Self::DirtyCache),
            3 => Some(Self::CreateTexture),
            4 => Some(Self::CreateBuffer),
            5 => Some(Self::CreateProgram),
            6 => Some(Self::CreateBindGroup),
            7 => Some(Self::CreateTextureView),
            8 => Some(Self::DestroyTexture),
            9 => Some(Self::DestroyBuffer),
            10 => Some(Self::DestroyProgram),
            11 => Some(Self::DestroyBindGroup),
            12 => Some(Self::SetTextureDebugName),
            13 => Some(Self::BindUniformBuffer),
            14 => Some(Self::BindShaderBuffer),
            15 => Some(Self::BindImageTexture),
            16 => Some(Self::BindTextures),
            17 => Some(Self::DrawArrays),
            18 => Some(Self::DrawIndexed),
            19 => Some(Self::DrawArraysInstanced),
            20 => Some(Self::DrawIndexedInstanced),
            21 => Some(Self::DrawIndirect),
            22 => Some(Self::Dispatch),
            23 => Some(Self::Clear),
            24 => Some(Self::SetFramebuffer),
            25 => Some(Self::SetFramebufferCube),
            26 => Some(Self::Viewport),
            27 => Some(Self::Scissor),
            28 => Some(Self::CopyTexture),
            29 => Some(Self::CopyBuffer),
            30 => Some(Self::CopyTextureToBuffer),
            31 => Some(Self::ReadTexture),
            32 => Some(Self::GenerateMipmaps),
            33 => Some(Self::UpdateTexture),
            34 => Some(Self::UpdateBuffer),
            35 => Some(Self::MemoryBarrier),
            36 => Some(Self::MemoryBarrierTexture),
            37 => Some(Self::Barrier),
            38 => Some(Self::BarrierTexture),
            39 => Some(Self::PushDebugGroup),
            40 => Some(Self::PopDebugGroup),
            41 => Some(Self::StartCapture),
            42 => Some(Self::StopCapture),
            43 => Some(Self::BeginProfileBlock),
            44 => Some(Self::EndProfileBlock),
            45 => Some(Self::FreeMemory),
            46 => Some(Self::FreeAlignedMemory),
            47 => Some(Self::UserAlloc),
            48 => Some(Self::Function),
            49 => Some(Self::Substream),
            _ => None,
        }
    }
}
