//! Crate-wide error type.
//!
//! Every subsystem surfaces failures through [`EngineError`]; callers decide
//! whether a failure is fatal (transport setup) or droppable (a single bad
//! packet).

use thiserror::Error;

/// All engine failure kinds
#[derive(Debug, Error)]
pub enum EngineError {
    /// A packet buffer ended before the field being read
    #[error("packet truncated: needed {needed} more bytes, {remaining} remaining")]
    PacketTruncated { needed: usize, remaining: usize },

    /// The leading tag byte is not a known packet id
    #[error("unknown packet tag {tag:#04x}")]
    UnknownTag { tag: u8 },

    /// An element count claims more data than the buffer holds
    #[error("count {count} overflows buffer ({remaining} bytes remaining)")]
    CountOverflow { count: u32, remaining: usize },

    /// A float field decoded to NaN or infinity
    #[error("non-finite float in {field}")]
    NonFiniteFloat { field: &'static str },

    /// A decoded packet was valid but not legal in this context
    #[error("unexpected {kind} packet")]
    UnexpectedPacket { kind: &'static str },

    /// A length-prefixed frame exceeds the protocol limit
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Could not establish a connection to a peer
    #[error("connection to {addr} failed: {source}")]
    ConnectionFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// A GPU-adjacent buffer pool ran out of room; the caller must report
    /// this rather than silently dropping data
    #[error("{resource} pool out of space")]
    OutOfSpace { resource: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
