//! Deferred GPU command recording.
//!
//! A [`DrawStream`] records resource, binding, draw and transfer commands into
//! fixed-size pages borrowed from a shared [`PagePool`](lumen_pages::PagePool),
//! then replays them once against a [`Backend`](lumen_gpu::Backend) on the
//! render thread. Data that cannot live in page bytes (uploads, program
//! descriptions, callbacks, embedded streams) travels in an ordered side queue
//! owned by the stream.
#![forbid(unsafe_code)]

mod bind_cache;
mod codec;
mod error;
mod execute;
mod instruction;
mod opcode;
mod page;
mod payload;
mod side;
mod stream;

pub use bind_cache::{
    BindCache, Dirty, DirtyUpdate, VertexBufferBinding, BIND_GROUP_SLOTS, VERTEX_BUFFER_SLOTS,
};
pub use error::{DecodeError, StreamError};
pub use instruction::{BindGroupEntries, Instruction, Instructions, PodList};
pub use opcode::Opcode;
pub use side::{StreamFunction, SubstreamSlot};
pub use stream::{DrawStream, StreamContext};
