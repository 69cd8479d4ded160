//! C4 — the per-swap-type Entry Index: an ordered map keyed by offset plus
//! an approximate-LRU list, both behind a single mutex (spec §4.4).
//!
//! Entries live in a slab (`Vec<Option<Entry>>`) rather than being
//! individually heap-allocated and linked by pointer — the spec's own
//! design notes (§9) call this out as the natural safe-Rust realization of
//! a "moved-by-owner" doubly-linked list: slot indices stand in for
//! pointers, and a freed slot goes on a free list instead of being
//! deallocated. Grounded on the teacher's `FrameId`-indexes-an-array
//! convention in `buffer/page_cache.rs`.
//!
//! Resolves one ambiguity in the source spec: §3 describes the LRU as
//! "head = most recent", but §4.4 and the writeback walk (§4.9, and the
//! scenario-5 test in §8) both require "insert at tail, evict from head" —
//! i.e. head is the *oldest* entry. This module follows the operational
//! description: `lru_head` is the next writeback victim, `lru_tail` is the
//! most recently touched entry.

use crate::cos::Cos;
use crate::entry::{Entry, SwapOffset, SwapType};
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A per-swap-type Index: the map/LRU pair above, its own [`Cos`] instance,
/// and the swap-type identifier the writeback engine needs to reconstruct
/// a full swap entry (spec §3).
pub struct Index {
    pub swap_type: SwapType,
    pub cos: Arc<Cos>,
    inner: Mutex<IndexInner>,
}

impl Index {
    pub fn new(swap_type: SwapType, cos: Arc<Cos>) -> Self {
        Self { swap_type, cos, inner: Mutex::new(IndexInner::default()) }
    }

    pub fn lock(&self) -> MutexGuard<'_, IndexInner> {
        self.inner.lock()
    }
}

#[derive(Default)]
pub struct IndexInner {
    map: BTreeMap<SwapOffset, u32>,
    slab: Vec<Option<Entry>>,
    free: Vec<u32>,
    lru_head: Option<u32>,
    lru_tail: Option<u32>,
}

impl IndexInner {
    pub fn lookup(&self, offset: SwapOffset) -> Option<u32> {
        self.map.get(&offset).copied()
    }

    pub fn entry(&self, slot: u32) -> &Entry {
        self.slab[slot as usize].as_ref().expect("stale slab slot")
    }

    pub fn entry_mut(&mut self, slot: u32) -> &mut Entry {
        self.slab[slot as usize].as_mut().expect("stale slab slot")
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Allocate a slab slot for `entry` and link it at the LRU tail (the
    /// "freshest" end). Does not touch the map — callers publish into the
    /// map separately so the duplicate-check-then-insert sequence in spec
    /// §4.6 step 8 stays explicit at the call site.
    pub fn publish_new(&mut self, mut entry: Entry) -> u32 {
        entry.in_lru = false;
        let slot = if let Some(slot) = self.free.pop() {
            self.slab[slot as usize] = Some(entry);
            slot
        } else {
            let slot = self.slab.len() as u32;
            self.slab.push(Some(entry));
            slot
        };
        self.lru_push_tail(slot);
        slot
    }

    pub fn map_insert(&mut self, offset: SwapOffset, slot: u32) {
        self.map.insert(offset, slot);
    }

    /// Remove `offset` from the map only. The slab slot and LRU linkage
    /// are untouched — invariant 2 allows an entry to be temporarily
    /// absent from the LRU while still map-reachable, and several call
    /// sites (invalidate racing writeback) need the slot to keep existing
    /// after this call.
    pub fn map_remove(&mut self, offset: SwapOffset) -> Option<u32> {
        self.map.remove(&offset)
    }

    pub fn lru_push_tail(&mut self, slot: u32) {
        let old_tail = self.lru_tail;
        let e = self.entry_mut(slot);
        debug_assert!(!e.in_lru);
        e.in_lru = true;
        e.lru_prev = old_tail;
        e.lru_next = None;
        match self.lru_tail {
            Some(old_tail) => self.entry_mut(old_tail).lru_next = Some(slot),
            None => self.lru_head = Some(slot),
        }
        self.lru_tail = Some(slot);
    }

    pub fn lru_unlink(&mut self, slot: u32) {
        let (prev, next, was_in_lru) = {
            let e = self.entry(slot);
            (e.lru_prev, e.lru_next, e.in_lru)
        };
        if !was_in_lru {
            return;
        }
        match prev {
            Some(p) => self.entry_mut(p).lru_next = next,
            None => self.lru_head = next,
        }
        match next {
            Some(n) => self.entry_mut(n).lru_prev = prev,
            None => self.lru_tail = prev,
        }
        let e = self.entry_mut(slot);
        e.lru_prev = None;
        e.lru_next = None;
        e.in_lru = false;
    }

    /// Dequeue the oldest LRU entry (the writeback victim) without
    /// touching the map — it remains reachable by offset (invariant 2)
    /// while the writeback engine services it.
    pub fn lru_pop_head(&mut self) -> Option<u32> {
        let slot = self.lru_head?;
        self.lru_unlink(slot);
        Some(slot)
    }

    /// Tear a slot down entirely: removes it from the slab and the free
    /// list claims it for reuse. Caller must already have removed the
    /// slot from the map and the LRU (or never added it), and must free
    /// the COS handle itself — freeing is always "COS free, then release
    /// the entry record" (spec §4.5), and this only does the latter.
    pub fn destroy_slot(&mut self, slot: u32) -> Entry {
        self.lru_unlink(slot);
        let entry = self.slab[slot as usize].take().expect("double free of slab slot");
        self.free.push(slot);
        entry
    }

    /// Whole-area invalidate (spec §4.8): drain every live entry,
    /// returning them so the caller can free their COS handles, then
    /// reset map, LRU, and slab. The caller (host swap teardown) holds the
    /// exclusion that makes this safe against concurrent store/load.
    pub fn drain_all(&mut self) -> Vec<Entry> {
        let mut out = Vec::with_capacity(self.map.len());
        for slot in self.slab.drain(..).flatten() {
            out.push(slot);
        }
        self.map.clear();
        self.free.clear();
        self.lru_head = None;
        self.lru_tail = None;
        out
    }
}
