//! C2 — bounded source of raw pages backing the Compressed Object Store.
//!
//! The pool's only job is the global occupancy ceiling described in spec
//! §4.2: `get()` fails fast once the live count would cross
//! `max_pool_percent * total_ram_pages / 100`. That ceiling is the cache's
//! sole backpressure signal against unbounded growth (P4). Grounded on the
//! teacher's `FreeFrameManager` (`buffer/frame_manager.rs`), simplified to
//! a single shared counter since the spec does not call for per-core
//! sharding here — occupancy is a crate-wide invariant, not a hot-path
//! allocator.

use crate::stats::Counters;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub struct PagePool {
    ceiling: u64,
    stats: Arc<Counters>,
}

impl PagePool {
    pub fn new(ceiling: u64, stats: Arc<Counters>) -> Self {
        Self { ceiling, stats }
    }

    /// Reserve one page's worth of pool capacity. Fails fast (and counts
    /// the rejection) rather than waiting — admission never blocks on pool
    /// pressure, it falls back to resumed writeback instead.
    pub fn get(&self) -> bool {
        loop {
            let live = self.stats.pool_pages.load(Ordering::Relaxed);
            if live >= self.ceiling {
                self.stats.pool_rejections.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            if self
                .stats
                .pool_pages
                .compare_exchange_weak(live, live + 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    pub fn put(&self) {
        self.stats.pool_pages.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn live_pages(&self) -> u64 {
        self.stats.pool_pages.load(Ordering::Relaxed)
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }
}
