//! Graphics backend contract consumed by draw stream replay.
//!
//! This crate only describes the *shape* of a backend: opaque resource
//! handles, the enum/flag vocabulary shared with recorded instructions, and the
//! [`Backend`] trait whose methods map 1:1 onto replayed calls. Creation
//! semantics, shader compilation and surfaces belong to implementations.
//!
//! [`CallLog`] is a backend that records every call as a [`Call`] value; it is
//! what the draw stream tests assert against.

#![forbid(unsafe_code)]

mod backend;
mod handle;
mod profiler;
mod program;
mod trace;
mod types;

pub use backend::{Backend, NullBackend, TextureReadCallback};
pub use handle::{BindGroupHandle, BufferHandle, ProgramHandle, TextureHandle};
pub use profiler::{NullProfiler, Profiler};
pub use program::{Attribute, ProgramDesc, ShaderSource, VertexDecl, MAX_ATTRIBUTES};
pub use trace::{Call, CallLog, ProfileEvent, ProfileLog};
pub use types::{
    AttributeFlags, AttributeType, BarrierType, BindGroupEntry, BufferFlags, ClearFlags, DataType,
    FramebufferFlags, PrimitiveType, ShaderBufferFlags, ShaderType, StateFlags, TextureDesc,
    TextureFlags, TextureFormat, TextureRegion,
};
