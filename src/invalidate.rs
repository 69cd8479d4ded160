//! C8 — Invalidate Paths (spec §4.8).

use crate::entry::SwapOffset;
use crate::index::Index;
use crate::stats::Counters;
use std::sync::atomic::Ordering;

/// Single-page invalidate. Absence is not an error — it means the entry
/// was already written back.
pub fn invalidate_page(index: &Index, offset: SwapOffset, stats: &Counters) {
    let mut inner = index.lock();
    let Some(slot) = inner.map_remove(offset) else {
        return;
    };
    let refcount = inner.entry_mut(slot).put();
    if refcount > 0 {
        // A writeback or load is in flight and holds a reference; it will
        // free on its own exit path once it observes the drop.
        return;
    }
    let dead = inner.destroy_slot(slot);
    drop(inner);
    index.cos.free(dead.handle);
    stats.stored_pages.fetch_sub(1, Ordering::Relaxed);
}

/// Whole-area invalidate. Caller guarantees exclusion against concurrent
/// store/load/invalidate (spec §4.8: "the host's swap teardown path holds
/// the required exclusion").
pub fn invalidate_area(index: &Index, stats: &Counters) {
    let drained = index.lock().drain_all();
    let freed = drained.len() as u64;
    for entry in drained {
        index.cos.free(entry.handle);
    }
    stats.stored_pages.fetch_sub(freed, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cos::Cos;
    use crate::host::test_support::FakeHost;
    use crate::page_pool::PagePool;
    use crate::scratch::SparePool;
    use crate::stats::Counters;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;

    fn fixture() -> (Index, Arc<PagePool>) {
        let pool = Arc::new(PagePool::new(1024, Arc::new(Counters::default())));
        (Index::new(0, Arc::new(Cos::new(pool.clone()))), pool)
    }

    fn store_ctx<'a>(
        codec: &'a crate::codec::ByteRunCodec,
        spares: &'a SparePool,
        stats: &'a Counters,
        config: &'a crate::config::Config,
        inflight: &'a Arc<AtomicU64>,
        host: &'a FakeHost,
    ) -> crate::store::StoreContext<'a> {
        crate::store::StoreContext { codec, spares, stats, config, inflight, host }
    }

    #[test]
    fn invalidate_twice_is_a_no_op() {
        let (index, _pool) = fixture();
        let stats = Counters::default();
        invalidate_page(&index, 1, &stats);
        invalidate_page(&index, 1, &stats);
        assert_eq!(index.lock().len(), 0);
    }

    #[test]
    fn invalidate_area_empties_index_and_releases_pool_pages() {
        let (index, pool) = fixture();
        let codec = crate::codec::ByteRunCodec;
        let spares = SparePool::new(4);
        let stats = Counters::default();
        let config = crate::config::Config::default();
        let inflight = Arc::new(AtomicU64::new(0));
        let host = FakeHost::new();
        let ctx = store_ctx(&codec, &spares, &stats, &config, &inflight, &host);

        for offset in 0..100u64 {
            let page = vec![(offset % 200) as u8; crate::config::PAGE_SIZE];
            crate::store::store(&index, offset, &page, &ctx).unwrap();
        }
        assert_eq!(index.lock().len(), 100);
        assert_eq!(stats.stored_pages.load(std::sync::atomic::Ordering::Relaxed), 100);
        assert!(pool.live_pages() > 0);

        invalidate_area(&index, &stats);
        assert_eq!(index.lock().len(), 0);
        assert_eq!(pool.live_pages(), 0);
        assert_eq!(stats.stored_pages.load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[test]
    fn invalidate_while_refcount_held_defers_free() {
        let (index, pool) = fixture();
        let codec = crate::codec::ByteRunCodec;
        let spares = SparePool::new(4);
        let stats = Counters::default();
        let config = crate::config::Config::default();
        let inflight = Arc::new(AtomicU64::new(0));
        let host = FakeHost::new();
        let ctx = store_ctx(&codec, &spares, &stats, &config, &inflight, &host);
        let page = vec![0u8; crate::config::PAGE_SIZE];
        crate::store::store(&index, 9, &page, &ctx).unwrap();

        let slot = index.lock().lookup(9).unwrap();
        index.lock().entry_mut(slot).get(); // simulate a concurrent load/writeback holding a ref

        invalidate_page(&index, 9, &stats);
        assert_eq!(index.lock().len(), 0, "offset is logically gone");
        assert!(pool.live_pages() > 0, "entry not freed yet, a holder remains");
        assert_eq!(
            stats.stored_pages.load(std::sync::atomic::Ordering::Relaxed),
            1,
            "deferred free must not decrement stored_pages yet"
        );

        // The holder now releases, freeing it. In real code this is
        // either `load`'s or `writeback`'s orphan-destroy path; both are
        // responsible for the stored_pages decrement invalidate deferred.
        let refcount = index.lock().entry_mut(slot).put();
        assert_eq!(refcount, 0);
        let dead = index.lock().destroy_slot(slot);
        index.cos.free(dead.handle);
        stats.stored_pages.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
        assert_eq!(pool.live_pages(), 0);
        assert_eq!(stats.stored_pages.load(std::sync::atomic::Ordering::Relaxed), 0);
    }
}
