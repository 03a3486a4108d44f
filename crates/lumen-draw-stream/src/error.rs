use thiserror::Error;

use crate::opcode::Opcode;

/// Recoverable misuse of the recording API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("draw stream has already been executed")]
    AlreadyExecuted,
    #[error("draw streams were recorded against different page pools")]
    PoolMismatch,
    #[error("payload of {size} bytes does not fit in a page ({capacity} bytes available)")]
    PayloadTooLarge { size: usize, capacity: usize },
}

/// Malformed instruction bytes.
///
/// Streams are only ever produced by the recorder, so during `run` these are
/// contract violations and abort replay. [`Instructions`](crate::Instructions)
/// reports them instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("truncated payload at offset {offset}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("invalid {field} value {value}")]
    InvalidValue { field: &'static str, value: u64 },
    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },
    #[error("invalid bind change set {0:#010b}")]
    InvalidBindSlot(u8),
    #[error("no side payload queued for {0:?}")]
    MissingSidePayload(Opcode),
}
