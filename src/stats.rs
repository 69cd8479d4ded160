//! Observability counters.
//!
//! Read-only from the outside; every field is an [`AtomicU64`] bumped with
//! `Ordering::Relaxed` — these are only ever observed by humans (spec §5),
//! so there is no ordering requirement between them and the data they
//! describe. Grounded on the teacher's `EvictionStats`/`CompressionStats`
//! snapshot-of-atomics pattern (`buffer/eviction.rs`, `compression/mod.rs`).

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Counters {
    pub pool_pages: AtomicU64,
    pub pool_rejections: AtomicU64,
    pub stored_pages: AtomicU64,
    pub outstanding_writebacks: AtomicU64,
    pub pages_written_back: AtomicU64,
    pub duplicates: AtomicU64,

    pub rejected_no_device: AtomicU64,
    pub rejected_entry_alloc: AtomicU64,
    pub rejected_codec: AtomicU64,
    pub rejected_poor_compression: AtomicU64,
    pub rejected_spare_buffer: AtomicU64,
    pub rejected_no_space: AtomicU64,
}

/// Plain-struct snapshot handed back to callers of `Cache::stats()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub pool_pages: u64,
    pub pool_rejections: u64,
    pub stored_pages: u64,
    pub outstanding_writebacks: u64,
    pub pages_written_back: u64,
    pub duplicates: u64,
    pub rejected_no_device: u64,
    pub rejected_entry_alloc: u64,
    pub rejected_codec: u64,
    pub rejected_poor_compression: u64,
    pub rejected_spare_buffer: u64,
    pub rejected_no_space: u64,
}

impl Counters {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pool_pages: self.pool_pages.load(Ordering::Relaxed),
            pool_rejections: self.pool_rejections.load(Ordering::Relaxed),
            stored_pages: self.stored_pages.load(Ordering::Relaxed),
            outstanding_writebacks: self.outstanding_writebacks.load(Ordering::Relaxed),
            pages_written_back: self.pages_written_back.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            rejected_no_device: self.rejected_no_device.load(Ordering::Relaxed),
            rejected_entry_alloc: self.rejected_entry_alloc.load(Ordering::Relaxed),
            rejected_codec: self.rejected_codec.load(Ordering::Relaxed),
            rejected_poor_compression: self.rejected_poor_compression.load(Ordering::Relaxed),
            rejected_spare_buffer: self.rejected_spare_buffer.load(Ordering::Relaxed),
            rejected_no_space: self.rejected_no_space.load(Ordering::Relaxed),
        }
    }

    pub fn record_rejection(&self, reason: crate::error::Rejection) {
        use crate::error::Rejection::*;
        let counter = match reason {
            NoDevice => &self.rejected_no_device,
            EntryAlloc => &self.rejected_entry_alloc,
            Codec => &self.rejected_codec,
            PoorCompression => &self.rejected_poor_compression,
            SpareBufferExhausted => &self.rejected_spare_buffer,
            NoSpace => &self.rejected_no_space,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
