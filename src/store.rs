//! C6 — Admission / Store Path (spec §4.6).
//!
//! `store` is the one path allowed to block: compression and the COS
//! mapping windows are non-sleepable, but the post-writeback retry and COS
//! allocation with waiting flags may sleep (spec §5).

use crate::codec::Codec;
use crate::config::{Config, PAGE_SIZE};
use crate::entry::{Entry, SwapOffset};
use crate::error::Rejection;
use crate::index::Index;
use crate::scratch::SparePool;
use crate::stats::Counters;
use crate::writeback;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

pub struct StoreContext<'a> {
    pub codec: &'a dyn Codec,
    pub spares: &'a SparePool,
    pub stats: &'a Counters,
    pub config: &'a Config,
    pub inflight: &'a Arc<AtomicU64>,
    pub host: &'a dyn crate::host::SwapHost,
}

/// Implements spec §4.6 steps 1–8. Step 1 (resolve Index) happens at the
/// call site in `cache.rs`, which is why this takes `&Index` rather than a
/// swap type.
pub fn store(
    index: &Index,
    offset: SwapOffset,
    source_page: &[u8],
    ctx: &StoreContext<'_>,
) -> Result<(), Rejection> {
    debug_assert_eq!(source_page.len(), PAGE_SIZE);

    // Step 3: compress into the per-worker scratch buffer.
    let compressed_len = match crate::scratch::with_worker_scratch(|scratch| {
        ctx.codec.compress(source_page, scratch).map_err(|_| Rejection::Codec)
    }) {
        Ok(n) => n,
        Err(rejection) => {
            ctx.stats.record_rejection(rejection);
            return Err(rejection);
        }
    };

    // Step 4: ratio check. Poorly compressible pages bypass the cache.
    if compressed_len * 100 / PAGE_SIZE > ctx.config.max_compression_ratio as usize {
        ctx.stats.record_rejection(Rejection::PoorCompression);
        return Err(Rejection::PoorCompression);
    }

    // Steps 5–7: acquire COS storage, retrying once via writeback on
    // failure, then copy the compressed bytes in.
    let handle = acquire_storage(index, compressed_len, ctx)?;
    {
        let mut dst = index.cos.map_write(handle);
        crate::scratch::with_worker_scratch(|scratch| {
            dst[..compressed_len].copy_from_slice(&scratch[..compressed_len]);
        });
    }

    // Step 8: publish under the Index lock, replacing any duplicate.
    let new_entry = Entry::new(offset, handle, compressed_len as u32);
    publish(index, offset, new_entry, ctx.stats);

    ctx.stats.stored_pages.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    tracing::debug!(offset, compressed_len, "stored compressed page");
    Ok(())
}

/// Steps 5–6: try to allocate in COS; on failure, if writeback is enabled,
/// stash the compressed bytes in a spare buffer, run one writeback batch,
/// and retry exactly once.
fn acquire_storage(index: &Index, size: usize, ctx: &StoreContext<'_>) -> Result<crate::cos::CosHandle, Rejection> {
    if let Some(h) = index.cos.alloc(size) {
        return Ok(h);
    }

    if !ctx.config.writeback_enabled {
        ctx.stats.record_rejection(Rejection::NoSpace);
        return Err(Rejection::NoSpace);
    }

    // Borrow a spare buffer so the per-worker scratch buffer can be
    // released across the blocking writeback call (spec §4.6 step 6).
    let spare = crate::scratch::with_worker_scratch(|scratch| ctx.spares.borrow_with(&scratch[..size]));
    let Some(spare) = spare else {
        ctx.stats.record_rejection(Rejection::SpareBufferExhausted);
        return Err(Rejection::SpareBufferExhausted);
    };

    writeback::writeback_batch(
        index,
        ctx.config.writeback_batch_size,
        &writeback::WritebackContext {
            host: ctx.host,
            codec: ctx.codec,
            stats: ctx.stats,
            config: ctx.config,
            inflight: ctx.inflight,
        },
    );

    match index.cos.alloc(size) {
        Some(h) => {
            let mut dst = index.cos.map_write(h);
            dst[..size].copy_from_slice(spare.bytes());
            drop(dst);
            Ok(h)
        }
        None => {
            ctx.stats.record_rejection(Rejection::NoSpace);
            Err(Rejection::NoSpace)
        }
    }
}

/// Step 8: publish into the map, evicting a duplicate first if present.
/// Offset uniqueness (invariant 1) means at most one duplicate can ever
/// exist, so removing it is a single pass, not a retry loop — the bound
/// spec §7 promises ("each iteration removes one duplicate from the map")
/// is trivially met here.
fn publish(index: &Index, offset: SwapOffset, new_entry: Entry, stats: &Counters) {
    let mut inner = index.lock();
    if let Some(existing_slot) = inner.map_remove(offset) {
        let refcount = inner.entry_mut(existing_slot).put();
        if refcount <= 0 {
            let dead = inner.destroy_slot(existing_slot);
            drop(inner);
            index.cos.free(dead.handle);
            inner = index.lock();
        }
        stats.duplicates.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }
    let slot = inner.publish_new(new_entry);
    inner.map_insert(offset, slot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cos::Cos;
    use crate::host::test_support::FakeHost;
    use crate::page_pool::PagePool;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;

    fn fixture() -> (Index, Counters, Arc<dyn crate::codec::Codec>, SparePool, Config, Arc<AtomicU64>, Arc<FakeHost>) {
        let stats = Counters::default();
        let pool = Arc::new(PagePool::new(1024, Arc::new(Counters::default())));
        let cos = Arc::new(Cos::new(pool));
        let index = Index::new(0, cos);
        (index, stats, Arc::new(crate::codec::ByteRunCodec), SparePool::new(4), Config::default(), Arc::new(AtomicU64::new(0)), Arc::new(FakeHost::new()))
    }

    #[test]
    fn duplicate_store_leaves_exactly_one_live_entry() {
        let (index, stats, codec, spares, config, inflight, host) = fixture();
        let ctx = StoreContext { codec: codec.as_ref(), spares: &spares, stats: &stats, config: &config, inflight: &inflight, host: host.as_ref() };

        let page_a = vec![0xAAu8; PAGE_SIZE];
        let page_b = vec![0xBBu8; PAGE_SIZE];
        store(&index, 5, &page_a, &ctx).unwrap();
        store(&index, 5, &page_b, &ctx).unwrap();

        assert_eq!(index.lock().len(), 1);
        assert_eq!(stats.duplicates.load(std::sync::atomic::Ordering::Relaxed), 1);

        let slot = index.lock().lookup(5).unwrap();
        let handle = index.lock().entry(slot).handle;
        let compressed: Vec<u8> = index.cos.map_read(handle).to_vec();
        let mut out = vec![0u8; PAGE_SIZE];
        codec.decompress(&compressed, &mut out).unwrap();
        assert_eq!(out, page_b);
    }

    #[test]
    fn poorly_compressible_page_is_rejected() {
        let (index, stats, codec, spares, config, inflight, host) = fixture();
        let ctx = StoreContext { codec: codec.as_ref(), spares: &spares, stats: &stats, config: &config, inflight: &inflight, host: host.as_ref() };
        let page: Vec<u8> = (0..PAGE_SIZE as u32).map(|i| (i % 251) as u8).collect();
        let err = store(&index, 7, &page, &ctx).unwrap_err();
        assert_eq!(err, Rejection::PoorCompression);
        assert_eq!(index.lock().len(), 0);
    }
}
