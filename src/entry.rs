//! The data model: [`Entry`] and the swap-type/offset identifiers that key
//! it. Matches spec §3 field-for-field.

use crate::cos::CosHandle;

pub type SwapType = u16;
pub type SwapOffset = u64;

/// One compressed page, owned by exactly one [`crate::index::Index`].
///
/// `lru_prev`/`lru_next` thread the intrusive LRU list through slab slots
/// (spec §9: "index-plus-generation-into-a-slab"). `in_lru` distinguishes
/// "present in the map but temporarily unlinked from the LRU while being
/// serviced" (invariant 2) from genuine list membership — `lru_prev`/
/// `lru_next` being `None` is ambiguous between "list head/tail" and
/// "not in the list", so the flag disambiguates.
pub struct Entry {
    pub offset: SwapOffset,
    pub handle: CosHandle,
    pub length: u32,
    pub refcount: i32,
    pub lru_prev: Option<u32>,
    pub lru_next: Option<u32>,
    pub in_lru: bool,
}

impl Entry {
    pub fn new(offset: SwapOffset, handle: CosHandle, length: u32) -> Self {
        Self {
            offset,
            handle,
            length,
            // The index's own reference (spec §4.5: "An entry starts with
            // refcount = 1, the index's own reference").
            refcount: 1,
            lru_prev: None,
            lru_next: None,
            in_lru: false,
        }
    }

    /// `get(e)` — spec §4.5. Always called under the Index lock.
    pub fn get(&mut self) {
        self.refcount += 1;
    }

    /// `put(e)` — spec §4.5, returns the new refcount so call sites can
    /// branch on the reconciliation outcome documented at each call site.
    pub fn put(&mut self) -> i32 {
        self.refcount -= 1;
        self.refcount
    }
}
