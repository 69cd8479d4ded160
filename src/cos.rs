//! C1 — Compressed Object Store.
//!
//! Allocates/frees variable-sized compressed blobs and hands back opaque,
//! stable handles. One instance per swap type (spec §4.1: "no cross-instance
//! guarantees"). Backed page-for-page by [`PagePool`], so COS allocation
//! failure is really pool-occupancy failure — the signal the admission path
//! reacts to in step 6 of §4.6.
//!
//! Grounded on the teacher's slab-of-slots pattern in
//! `buffer/page_cache.rs` (`FrameId` indexing a pre-allocated array) rather
//! than a `HashMap<Handle, Vec<u8>>`: handles are slot indices, freed slots
//! go on a free list, so `alloc`/`free` never touch a hash function.

use crate::config::PAGE_SIZE;
use crate::page_pool::PagePool;
use parking_lot::Mutex;
use std::sync::Arc;

/// Opaque, stable token identifying a compressed blob. Never reused while
/// the object it names is live (generation-tagged the way
/// [`crate::entry::EntryKey`] is, to catch stale-handle bugs rather than
/// silently handing back someone else's bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosHandle {
    slot: u32,
    generation: u32,
}

struct Slot {
    data: Vec<u8>,
    pages: u64,
    generation: u32,
    live: bool,
}

struct Inner {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

pub struct Cos {
    inner: Mutex<Inner>,
    pool: Arc<PagePool>,
}

fn pages_for(size: usize) -> u64 {
    ((size + PAGE_SIZE - 1) / PAGE_SIZE) as u64
}

#[cfg(test)]
impl CosHandle {
    pub(crate) fn for_test(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }
}

impl Cos {
    pub fn new(pool: Arc<PagePool>) -> Self {
        Self {
            inner: Mutex::new(Inner { slots: Vec::new(), free: Vec::new() }),
            pool,
        }
    }

    /// Acquire storage for `size` compressed bytes. Reserves `size`'s
    /// worth of pool pages up front and releases them all on failure —
    /// spec §4.6 step 6 treats this as a single atomic "do we have room"
    /// check, not a partial reservation.
    pub fn alloc(&self, size: usize) -> Option<CosHandle> {
        let pages = pages_for(size);
        let mut reserved = 0u64;
        while reserved < pages {
            if !self.pool.get() {
                for _ in 0..reserved {
                    self.pool.put();
                }
                return None;
            }
            reserved += 1;
        }

        let mut inner = self.inner.lock();
        let data = vec![0u8; size];
        if let Some(slot_idx) = inner.free.pop() {
            let slot = &mut inner.slots[slot_idx as usize];
            slot.data = data;
            slot.pages = pages;
            slot.generation = slot.generation.wrapping_add(1);
            slot.live = true;
            Some(CosHandle { slot: slot_idx, generation: slot.generation })
        } else {
            let slot_idx = inner.slots.len() as u32;
            inner.slots.push(Slot { data, pages, generation: 0, live: true });
            Some(CosHandle { slot: slot_idx, generation: 0 })
        }
    }

    pub fn free(&self, handle: CosHandle) {
        let pages = {
            let mut inner = self.inner.lock();
            let slot = &mut inner.slots[handle.slot as usize];
            debug_assert!(slot.live && slot.generation == handle.generation);
            slot.live = false;
            slot.data = Vec::new();
            let pages = slot.pages;
            slot.pages = 0;
            inner.free.push(handle.slot);
            pages
        };
        for _ in 0..pages {
            self.pool.put();
        }
    }

    pub fn map_read(&self, handle: CosHandle) -> parking_lot::MappedMutexGuard<'_, [u8]> {
        parking_lot::MutexGuard::map(self.inner.lock(), |inner| {
            let slot = &mut inner.slots[handle.slot as usize];
            debug_assert!(slot.live && slot.generation == handle.generation);
            slot.data.as_mut_slice()
        })
    }

    pub fn map_write(&self, handle: CosHandle) -> parking_lot::MappedMutexGuard<'_, [u8]> {
        self.map_read(handle)
    }
}
