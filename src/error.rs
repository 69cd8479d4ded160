//! Error types for the compressed swap cache.
//!
//! Rejections (see [`Rejection`]) are the expected, counted outcome of a
//! failed `store` — the caller falls through to the real swap device, no
//! corruption is possible because nothing was published. `Error::Corruption`
//! exists only to carry a message into a `panic!`; invariant violations are
//! never returned to a caller as a recoverable `Result` (spec §7.3).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every reason a `store` can be turned away, one counter apiece in
/// [`crate::stats`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("no device registered for this swap type")]
    NoDevice,
    #[error("failed to allocate an entry record")]
    EntryAlloc,
    #[error("codec failed to compress the page")]
    Codec,
    #[error("compressed size exceeds the maximum compression ratio")]
    PoorCompression,
    #[error("spare scratch buffer pool is exhausted")]
    SpareBufferExhausted,
    #[error("compressed object store has no space")]
    NoSpace,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("store rejected: {0}")]
    Rejected(#[from] Rejection),

    /// An invariant the design treats as fatal was violated. Per spec §7.3
    /// the engine crashes on these rather than limp along with corrupted
    /// memory; callers should not try to recover from one.
    #[error("invariant violation: {0}")]
    Corruption(&'static str),
}
