//! C9 — Writeback Engine (spec §4.9).
//!
//! Walks the LRU from the head (the oldest entry — see the note in
//! `index.rs` about resolving the spec's head/tail ambiguity), decompresses
//! each victim into a page the host owns, and submits it to the host's
//! real swap writeback. The five-way refcount reconciliation in step 5 is
//! implemented exactly as enumerated; the state machine, not the integer,
//! is the contract (spec §9).

use crate::codec::Codec;
use crate::config::Config;
use crate::host::{HostPageOutcome, SwapHost, WritebackCompletion};
use crate::index::Index;
use crate::stats::Counters;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct WritebackContext<'a> {
    pub host: &'a dyn SwapHost,
    pub codec: &'a dyn Codec,
    pub stats: &'a Counters,
    pub config: &'a Config,
    pub inflight: &'a Arc<AtomicU64>,
}

struct InflightDecrement(Arc<AtomicU64>);

impl WritebackCompletion for InflightDecrement {
    fn complete(self: Box<Self>) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Runs up to `n` iterations of the writeback loop, returning how many
/// entries were actually freed (durably written back or reclaimed by a
/// racing invalidate).
pub fn writeback_batch(index: &Index, n: usize, ctx: &WritebackContext<'_>) -> usize {
    let mut freed = 0usize;

    for _ in 0..n {
        // Step 1: global in-flight ceiling bounds how much RAM can be tied
        // up as decompressed pages awaiting I/O.
        if ctx.inflight.load(Ordering::Relaxed) >= ctx.config.max_inflight_writebacks {
            break;
        }

        // Step 2: dequeue the LRU head under the lock, taking a reference
        // so the slot survives while we're unlocked doing I/O-adjacent work.
        let mut inner = index.lock();
        let Some(slot) = inner.lru_pop_head() else {
            break;
        };
        inner.entry_mut(slot).get();
        let offset = inner.entry(slot).offset;
        let handle = inner.entry(slot).handle;
        let length = inner.entry(slot).length as usize;
        drop(inner);

        match ctx.host.lookup_or_alloc(index.swap_type, offset) {
            HostPageOutcome::OutOfMemory => {
                let mut inner = index.lock();
                inner.entry_mut(slot).put();
                // Left orphaned from the LRU but still in the map — the
                // next writeback pass or a load will re-link it.
                drop(inner);
                break;
            }
            HostPageOutcome::Found => {
                // A concurrent fault is already servicing this offset.
                let mut inner = index.lock();
                inner.entry_mut(slot).put();
                inner.lru_push_tail(slot);
                drop(inner);
                continue;
            }
            HostPageOutcome::NewLocked(mut page) => {
                {
                    let compressed = index.cos.map_read(handle);
                    if ctx.codec.decompress(&compressed[..length], &mut page.data).is_err() {
                        panic!("swap cache entry failed to decompress during writeback: memory corruption at offset {offset}");
                    }
                }

                ctx.inflight.fetch_add(1, Ordering::Relaxed);
                let completion = Box::new(InflightDecrement(ctx.inflight.clone()));
                ctx.host.submit_writepage(index.swap_type, offset, page, completion);

                // Step 5: reconcile refcount. We drop our own reference
                // (taken in step 2) and the index's reference (the entry
                // is durably on the real device now), exactly as spec'd.
                // A success always forfeits the map position (spec §4.9
                // step 4), regardless of what the refcount reconciliation
                // below finds — otherwise a concurrent load that still
                // holds a reference at this point would later release it
                // and free the slot while `offset` still pointed at it in
                // the map (invariant 5, P2, P8).
                let mut inner = index.lock();
                inner.entry_mut(slot).put(); // our own reference
                let refcount = inner.entry_mut(slot).put(); // the index's reference
                let _ = inner.map_remove(offset);

                match refcount {
                    2 | 1 => {
                        // One or more concurrent loads still hold a
                        // reference. The slot stays alive, unreachable by
                        // offset, for the load's own orphan path to destroy
                        // once it releases its reference.
                    }
                    0 => {
                        // Succeeded, no concurrent holder remained.
                        let dead = inner.destroy_slot(slot);
                        drop(inner);
                        index.cos.free(dead.handle);
                        ctx.stats.pages_written_back.fetch_add(1, Ordering::Relaxed);
                        ctx.stats.stored_pages.fetch_sub(1, Ordering::Relaxed);
                        freed += 1;
                        continue;
                    }
                    -1 => {
                        // An invalidate raced during writeback: it already
                        // removed the map entry (our `map_remove` above was
                        // a no-op) and dropped the index's reference, while
                        // we also dropped ours here. The invalidate path
                        // deferred its own stored_pages decrement to
                        // whoever destroys the slot, which is us.
                        let dead = inner.destroy_slot(slot);
                        drop(inner);
                        index.cos.free(dead.handle);
                        ctx.stats.stored_pages.fetch_sub(1, Ordering::Relaxed);
                        freed += 1;
                        continue;
                    }
                    other => unreachable!("writeback refcount reconciliation produced {other}"),
                }
            }
        }
    }

    freed
}
