//! C7 — Load Path (spec §4.7).
//!
//! A miss is not an error: the entry may have been written back already,
//! and the caller falls through to the real swap device.

use crate::codec::Codec;
use crate::config::PAGE_SIZE;
use crate::entry::SwapOffset;
use crate::index::Index;
use crate::stats::Counters;
use std::sync::atomic::Ordering;

pub enum LoadOutcome {
    Hit,
    Miss,
}

pub fn load(index: &Index, offset: SwapOffset, destination_page: &mut [u8], codec: &dyn Codec, stats: &Counters) -> LoadOutcome {
    debug_assert_eq!(destination_page.len(), PAGE_SIZE);

    let mut inner = index.lock();
    let Some(slot) = inner.lookup(offset) else {
        return LoadOutcome::Miss;
    };

    // Take a second reference before dropping the lock to decompress
    // (spec §4.7): the index's own reference keeps the slot alive even if
    // a racing invalidate removes it from the map while we're unlocked.
    inner.entry_mut(slot).get();
    inner.lru_unlink(slot);
    let handle = inner.entry(slot).handle;
    let length = inner.entry(slot).length as usize;
    drop(inner);

    let corrupt = {
        let compressed = index.cos.map_read(handle);
        codec.decompress(&compressed[..length], destination_page).is_err()
    };
    if corrupt {
        // Spec §7.3: a decompression failure is an invariant violation —
        // the blob was produced by a deterministic compressor from a full
        // page, so any mismatch implies memory corruption. The design
        // deliberately crashes rather than continue.
        panic!("swap cache entry failed to decompress: memory corruption at offset {offset}");
    }

    let mut inner = index.lock();
    let refcount = inner.entry_mut(slot).put();
    if refcount > 0 {
        inner.lru_push_tail(slot);
        LoadOutcome::Hit
    } else {
        // Orphaned by a racing invalidate or a writeback that completed
        // while we were decompressing unlocked: whoever got here removed
        // it from the map already, so we are the one responsible for
        // freeing it and for bringing the stored-page count back down.
        // The caller already has the decompressed page, so this is still
        // reported as a hit.
        let dead = inner.destroy_slot(slot);
        drop(inner);
        index.cos.free(dead.handle);
        stats.stored_pages.fetch_sub(1, Ordering::Relaxed);
        LoadOutcome::Hit
    }
}
