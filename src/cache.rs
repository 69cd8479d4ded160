//! Top-level facade: the five operations a host drives the engine through
//! (spec §6) — `init`, `store`, `load`, `invalidate_page`, `invalidate_area`
//! — plus `stats()` for observability. Wires the per-component modules
//! together the way the teacher's `BufferPoolManager` wires frame
//! allocation, the replacer, and disk I/O behind one facade
//! (`buffer/manager.rs`).

use crate::codec::Codec;
use crate::config::{Config, MAX_SWAP_TYPES, PAGE_SIZE};
use crate::cos::Cos;
use crate::entry::{SwapOffset, SwapType};
use crate::error::Rejection;
use crate::host::SwapHost;
use crate::index::Index;
use crate::load::LoadOutcome;
use crate::page_pool::PagePool;
use crate::scratch::SparePool;
use crate::stats::{Counters, Snapshot};
use crate::writeback;
use parking_lot::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Process-wide engine state: the global page pool, the per-swap-type
/// Index table, and the boot-time codec/host collaborators (spec §3: "the
/// per-swap-type Index table is process-wide").
pub struct Cache {
    config: Config,
    stats: Arc<Counters>,
    pool: Arc<PagePool>,
    codec: Box<dyn Codec>,
    spares: SparePool,
    inflight: Arc<AtomicU64>,
    host: Arc<dyn SwapHost>,
    indices: Mutex<Vec<Option<Arc<Index>>>>,
}

impl Cache {
    pub fn new(config: Config, host: Arc<dyn SwapHost>) -> Self {
        let stats = Arc::new(Counters::default());
        let pool = Arc::new(PagePool::new(config.pool_page_ceiling(), stats.clone()));
        let codec = crate::codec::by_name(config.codec_name);
        let spares = SparePool::new(config.spare_buffer_count);
        Self {
            indices: Mutex::new((0..MAX_SWAP_TYPES).map(|_| None).collect()),
            config,
            stats,
            pool,
            codec,
            spares,
            inflight: Arc::new(AtomicU64::new(0)),
            host,
        }
    }

    /// `init(type)` (spec §6): lazily allocate the Index and its COS for a
    /// newly-online swap device. Silent no-op on failure — the caller
    /// proceeds without caching, never blocks its own device bring-up on
    /// this.
    pub fn init(&self, swap_type: SwapType) {
        let mut indices = self.indices.lock();
        let slot = swap_type as usize;
        if slot >= indices.len() {
            tracing::warn!(swap_type, "swap type exceeds the configured table capacity, skipping init");
            return;
        }
        if indices[slot].is_some() {
            return;
        }
        let cos = Arc::new(Cos::new(self.pool.clone()));
        indices[slot] = Some(Arc::new(Index::new(swap_type, cos)));
    }

    fn index(&self, swap_type: SwapType) -> Option<Arc<Index>> {
        self.indices.lock().get(swap_type as usize).cloned().flatten()
    }

    /// `store(type, offset, page)` (spec §6 / §4.6). A swap type that was
    /// never `init`ed (or failed to allocate) behaves like a rejected
    /// store: the caller falls through to the real swap device.
    pub fn store(&self, swap_type: SwapType, offset: SwapOffset, page: &[u8]) -> Result<(), Rejection> {
        debug_assert_eq!(page.len(), PAGE_SIZE);
        let Some(index) = self.index(swap_type) else {
            self.stats.record_rejection(Rejection::NoDevice);
            return Err(Rejection::NoDevice);
        };
        let ctx = crate::store::StoreContext {
            codec: self.codec.as_ref(),
            spares: &self.spares,
            stats: &self.stats,
            config: &self.config,
            inflight: &self.inflight,
            host: self.host.as_ref(),
        };
        crate::store::store(&index, offset, page, &ctx)
    }

    /// `load(type, offset, page)` (spec §6 / §4.7). Miss — including a
    /// never-`init`ed swap type — is reported the same way: fall through
    /// to the host's own swap device.
    pub fn load(&self, swap_type: SwapType, offset: SwapOffset, destination_page: &mut [u8]) -> LoadOutcome {
        let Some(index) = self.index(swap_type) else {
            return LoadOutcome::Miss;
        };
        crate::load::load(&index, offset, destination_page, self.codec.as_ref(), &self.stats)
    }

    /// `invalidate_page(type, offset)` (spec §6 / §4.8).
    pub fn invalidate_page(&self, swap_type: SwapType, offset: SwapOffset) {
        let Some(index) = self.index(swap_type) else {
            return;
        };
        crate::invalidate::invalidate_page(&index, offset, &self.stats);
    }

    /// `invalidate_area(type)` (spec §6 / §4.8): drains the Index and also
    /// tears down the per-type slot, since the host calls this under its
    /// own swap-device teardown exclusion and will not touch this swap
    /// type again without a fresh `init`.
    pub fn invalidate_area(&self, swap_type: SwapType) {
        let index = {
            let mut indices = self.indices.lock();
            let slot = swap_type as usize;
            if slot >= indices.len() {
                return;
            }
            indices[slot].take()
        };
        if let Some(index) = index {
            crate::invalidate::invalidate_area(&index, &self.stats);
        }
    }

    /// Runs up to `n` writeback iterations against `swap_type`'s Index
    /// directly. The store path already triggers one bounded retry on
    /// admission failure (spec §4.6 step 6); this is for a host that wants
    /// to drive proactive reclaim from its own background task.
    pub fn writeback(&self, swap_type: SwapType, n: usize) -> usize {
        let Some(index) = self.index(swap_type) else {
            return 0;
        };
        writeback::writeback_batch(
            &index,
            n,
            &writeback::WritebackContext {
                host: self.host.as_ref(),
                codec: self.codec.as_ref(),
                stats: &self.stats,
                config: &self.config,
                inflight: &self.inflight,
            },
        )
    }

    pub fn stats(&self) -> Snapshot {
        self.stats.snapshot()
    }
}
