//! C3 — Scratch Buffers.
//!
//! Each worker that may execute the store path holds a pinned destination
//! buffer for compression output, sized `2 * PAGE_SIZE` per spec §4.3 (the
//! codec's worst case is assumed to never exceed 2x expansion). Rust has no
//! notion of the host's "non-preemptible worker" outside of an OS thread,
//! so — matching the teacher's per-core sharding idiom in
//! `buffer/frame_manager.rs` — an OS thread stands in for a worker via
//! `thread_local!`.
//!
//! The spare pool exists so the store path can release its per-worker
//! buffer across the blocking writeback retry in §4.6 step 6 without
//! losing the compressed bytes already produced. Spec §4.3: "Spare-pool
//! exhaustion is a rejection, not a wait" — `ScratchPool::borrow_spare`
//! never blocks.

use crate::config::PAGE_SIZE;
use parking_lot::Mutex;
use std::cell::RefCell;

const SCRATCH_CAPACITY: usize = 2 * PAGE_SIZE;

thread_local! {
    static WORKER_SCRATCH: RefCell<Vec<u8>> = RefCell::new(vec![0u8; SCRATCH_CAPACITY]);
}

/// Run `f` with exclusive access to this worker's pinned compression
/// buffer. Models the non-sleepable pinned window of spec §5: callers must
/// not block inside `f`.
pub fn with_worker_scratch<R>(f: impl FnOnce(&mut [u8]) -> R) -> R {
    WORKER_SCRATCH.with(|buf| f(&mut buf.borrow_mut()))
}

/// The small fixed pool of spare buffers, shared across all workers and
/// swap types (spec §5: "the spare-buffer pool ... [is] cross-Index shared
/// state").
pub struct SparePool {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl SparePool {
    pub fn new(count: usize) -> Self {
        Self { buffers: Mutex::new((0..count).map(|_| vec![0u8; SCRATCH_CAPACITY]).collect()) }
    }

    /// Borrow a spare buffer, copying `src` into it. `None` means the pool
    /// is exhausted — the caller counts this as `Rejection::SpareBufferExhausted`,
    /// it never waits (spec §4.3).
    pub fn borrow_with(&self, src: &[u8]) -> Option<SpareBuffer<'_>> {
        let mut buf = self.buffers.lock().pop()?;
        buf[..src.len()].copy_from_slice(src);
        Some(SpareBuffer { pool: self, buf: Some(buf), len: src.len() })
    }
}

/// A borrowed spare buffer. Ownership is returned to the pool on drop —
/// spec §5 calls this a "scoped acquisition released on all exit paths".
pub struct SpareBuffer<'a> {
    pool: &'a SparePool,
    buf: Option<Vec<u8>>,
    len: usize,
}

impl SpareBuffer<'_> {
    pub fn bytes(&self) -> &[u8] {
        &self.buf.as_ref().unwrap()[..self.len]
    }
}

impl Drop for SpareBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.buffers.lock().push(buf);
        }
    }
}
