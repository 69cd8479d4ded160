//! The only surface the crate consumes *from* the host (spec §6): an
//! opaque swap-cache page lookup/allocator and an asynchronous writepage
//! routine. Modeled as a trait so the engine can be driven and tested
//! without a real VM subsystem underneath it, grounded on the teacher's
//! `DiskManager` trait boundary (`storage/disk.rs`) between the buffer
//! pool and its backing store.

use crate::entry::{SwapOffset, SwapType};
use std::sync::Arc;

/// A page handed to the writeback engine to decompress into, matching the
/// "newly-allocated-locked" outcome of §4.9 step 3.
pub struct HostPage {
    pub data: Vec<u8>,
}

impl HostPage {
    pub fn zeroed(size: usize) -> Self {
        Self { data: vec![0u8; size] }
    }
}

/// The three outcomes of asking the host for the swap-cache page backing
/// `(type, offset)`, spec §4.9 step 3.
pub enum HostPageOutcome {
    /// A concurrent fault is already servicing this offset.
    Found,
    /// A fresh, locked page ready to receive the decompressed bytes.
    NewLocked(HostPage),
    /// The host could not allocate a page at all.
    OutOfMemory,
}

/// Invoked by the host once a submitted writepage completes, so the
/// engine can decrement its in-flight counter (spec §4.9 step 3: "the
/// host's asynchronous completion callback decrements the in-flight
/// count").
pub trait WritebackCompletion: Send {
    fn complete(self: Box<Self>);
}

/// The host-side collaborator the writeback engine drives. Implementations
/// own the real swap cache and bio submission path; this crate only calls
/// through the trait.
pub trait SwapHost: Send + Sync {
    fn lookup_or_alloc(&self, swap_type: SwapType, offset: SwapOffset) -> HostPageOutcome;

    /// Submit `page` (already decompressed and marked up-to-date/reclaim
    /// by the caller) to the real writeback path. `on_complete` must be
    /// invoked exactly once, synchronously or asynchronously, regardless
    /// of whether submission itself succeeds — callers decrement the
    /// in-flight counter from it either way.
    fn submit_writepage(&self, swap_type: SwapType, offset: SwapOffset, page: HostPage, on_complete: Box<dyn WritebackCompletion>);
}

pub type DynSwapHost = Arc<dyn SwapHost>;
