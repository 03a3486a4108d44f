use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use lumen_gpu::{ProgramDesc, TextureReadCallback};
use lumen_pages::{HeapAllocator, HeapBlock};

use crate::stream::DrawStream;

/// Closure recorded with [`DrawStream::push_function`], called with its inline payload.
pub type StreamFunction = Box<dyn FnOnce(&[u8]) + Send>;

/// Out-of-line data for instructions whose payload cannot live in page bytes.
///
/// Queued in instruction order and popped one per carrying instruction during
/// replay. Entries of a stream that never runs are dropped with it.
pub(crate) enum SidePayload {
    Data(Arc<[u8]>),
    Program(Box<ProgramDesc>),
    ReadCallback(TextureReadCallback),
    Free {
        block: HeapBlock,
        allocator: Arc<dyn HeapAllocator>,
    },
    Function(StreamFunction),
    Substream(Box<DrawStream>),
    Deferred(SubstreamSlot),
}

impl SidePayload {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Program(_) => "program",
            Self::ReadCallback(_) => "read callback",
            Self::Free { .. } => "free",
            Self::Function(_) => "function",
            Self::Substream(_) => "substream",
            Self::Deferred(_) => "deferred substream",
        }
    }
}

impl fmt::Debug for SidePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(data) => write!(f, "Data({} bytes)", data.len()),
            Self::Free { block, .. } => write!(f, "Free({} bytes)", block.len()),
            other => f.write_str(other.kind()),
        }
    }
}

/// A sub-stream position reserved in a parent, recorded into later.
///
/// The slot can be cloned and handed to another producer. Whatever has been
/// recorded when the parent replays the slot's position is run in place; the
/// slot's stream is executed exactly once.
#[derive(Clone)]
pub struct SubstreamSlot {
    inner: Arc<Mutex<DrawStream>>,
}

impl SubstreamSlot {
    pub(crate) fn new(stream: DrawStream) -> Self {
        Self {
            inner: Arc::new(Mutex::new(stream)),
        }
    }

    /// Exclusive access to the reserved stream.
    pub fn lock(&self) -> MutexGuard<'_, DrawStream> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Records into the reserved stream.
    pub fn record<R>(&self, f: impl FnOnce(&mut DrawStream) -> R) -> R {
        f(&mut self.lock())
    }
}

impl fmt::Debug for SubstreamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstreamSlot")
            .field("holders", &Arc::strong_count(&self.inner))
            .finish()
    }
}
