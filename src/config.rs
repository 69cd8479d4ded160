//! Runtime tunables for the cache.
//!
//! Mirrors the teacher's `BufferPoolConfig` convention: one plain struct,
//! constructed via `Default`, passed by value into the top-level facade.

use std::time::Duration;

/// Fixed cap on distinct swap types the process-wide table can hold. The
/// spec models this table as "a fixed-capacity array indexed by swap-type
/// id" (§9) — there are only ever a handful of swap devices.
pub const MAX_SWAP_TYPES: usize = 32;

/// Page size assumed throughout the engine.
pub const PAGE_SIZE: usize = 4096;

/// Writeback batch size and in-flight ceiling are hardcoded in the source
/// this spec is drawn from (16 and 64); this crate exposes them as
/// tunables instead, per the Open Question in spec §9 noting that doing so
/// changes no behavior.
#[derive(Debug, Clone)]
pub struct Config {
    /// Percentage of total RAM pages the pool may occupy. Default 50.
    pub max_pool_percent: u8,

    /// Reject admission if `compressed_bytes * 100 / page_size` exceeds
    /// this percentage. Default 80.
    pub max_compression_ratio: u8,

    /// Whether admission failure may trigger resumed writeback at all.
    pub writeback_enabled: bool,

    /// How many LRU entries a single writeback invocation walks at most.
    pub writeback_batch_size: usize,

    /// Global ceiling on pages simultaneously decompressed and awaiting
    /// I/O completion across all swap types.
    pub max_inflight_writebacks: u64,

    /// Spare scratch buffers available to let the store path release its
    /// per-worker buffer across a blocking writeback retry.
    pub spare_buffer_count: usize,

    /// Name of the boot-time codec to resolve via [`crate::codec::by_name`].
    pub codec_name: &'static str,

    /// Total physical RAM pages, used to compute the pool ceiling.
    pub total_ram_pages: u64,

    /// How long a writeback batch is willing to poll the in-flight ceiling
    /// before giving up on a single iteration. Ambient scheduling knob —
    /// not in the original spec, but every bounded-retry loop the teacher
    /// writes carries one.
    pub inflight_poll_backoff: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_pool_percent: 50,
            max_compression_ratio: 80,
            writeback_enabled: true,
            writeback_batch_size: 16,
            max_inflight_writebacks: 64,
            spare_buffer_count: 16,
            codec_name: "byterun",
            total_ram_pages: 1 << 20, // 4 GiB worth of 4K pages, overridden by callers
            inflight_poll_backoff: Duration::from_micros(50),
        }
    }
}

impl Config {
    /// `ceil(max_pool_percent * total_ram_pages / 100)`, per spec P4.
    pub fn pool_page_ceiling(&self) -> u64 {
        let num = self.total_ram_pages * self.max_pool_percent as u64;
        (num + 99) / 100
    }
}
