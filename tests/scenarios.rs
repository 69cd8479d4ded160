//! End-to-end scenarios against the public `Cache` facade: the six seed
//! cases plus the round-trip/idempotence checks.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use swapcache::{Cache, Config, HostPage, HostPageOutcome, LoadOutcome, SwapHost, SwapOffset, SwapType, WritebackCompletion};

const PAGE_SIZE: usize = 4096;

/// A self-contained in-memory stand-in for the real swap device, local to
/// the integration test binary (it has no access to the crate's private
/// `#[cfg(test)]` test doubles).
#[derive(Default)]
struct RecordingHost {
    written: Mutex<HashMap<(SwapType, SwapOffset), Vec<u8>>>,
    oom_next: AtomicBool,
}

struct ImmediateCompletion;
impl WritebackCompletion for ImmediateCompletion {
    fn complete(self: Box<Self>) {}
}

impl RecordingHost {
    fn written_page(&self, swap_type: SwapType, offset: SwapOffset) -> Option<Vec<u8>> {
        self.written.lock().get(&(swap_type, offset)).cloned()
    }
}

impl SwapHost for RecordingHost {
    fn lookup_or_alloc(&self, _swap_type: SwapType, _offset: SwapOffset) -> HostPageOutcome {
        if self.oom_next.swap(false, Ordering::SeqCst) {
            return HostPageOutcome::OutOfMemory;
        }
        HostPageOutcome::NewLocked(HostPage::zeroed(PAGE_SIZE))
    }

    fn submit_writepage(&self, swap_type: SwapType, offset: SwapOffset, page: HostPage, on_complete: Box<dyn WritebackCompletion>) {
        self.written.lock().insert((swap_type, offset), page.data);
        on_complete.complete();
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn cache(total_ram_pages: u64) -> (Cache, Arc<RecordingHost>) {
    init_tracing();
    let host = Arc::new(RecordingHost::default());
    let config = Config { total_ram_pages, ..Config::default() };
    let cache = Cache::new(config, host.clone());
    cache.init(0);
    (cache, host)
}

#[test]
fn scenario_1_happy_path() {
    let (cache, _host) = cache(1024);
    let p = vec![0u8; PAGE_SIZE];
    cache.store(0, 42, &p).unwrap();

    let mut q = vec![0xFFu8; PAGE_SIZE];
    assert!(matches!(cache.load(0, 42, &mut q), LoadOutcome::Hit));
    assert_eq!(q, p);
}

#[test]
fn scenario_2_incompressible_reject() {
    let (cache, _host) = cache(1024);
    let p: Vec<u8> = (0..PAGE_SIZE as u32).map(|i| (i % 251) as u8).collect();

    let err = cache.store(0, 7, &p).unwrap_err();
    assert_eq!(err, swapcache::error::Rejection::PoorCompression);

    let mut q = vec![0u8; PAGE_SIZE];
    assert!(matches!(cache.load(0, 7, &mut q), LoadOutcome::Miss));
}

#[test]
fn scenario_3_duplicate_replacement() {
    let (cache, _host) = cache(1024);
    let p_a = vec![0xAAu8; PAGE_SIZE];
    let p_b = vec![0xBBu8; PAGE_SIZE];

    cache.store(0, 5, &p_a).unwrap();
    cache.store(0, 5, &p_b).unwrap();
    assert_eq!(cache.stats().duplicates, 1);

    let mut q = vec![0u8; PAGE_SIZE];
    assert!(matches!(cache.load(0, 5, &mut q), LoadOutcome::Hit));
    assert_eq!(q, p_b);
}

#[test]
fn scenario_4_invalidate_during_in_flight_load() {
    let (cache, _host) = cache(1024);
    let cache = Arc::new(cache);
    let p = vec![0x33u8; PAGE_SIZE];
    cache.store(0, 9, &p).unwrap();

    let loader = {
        let cache = cache.clone();
        std::thread::spawn(move || {
            let mut q = vec![0u8; PAGE_SIZE];
            cache.load(0, 9, &mut q)
        })
    };
    let invalidator = {
        let cache = cache.clone();
        std::thread::spawn(move || cache.invalidate_page(0, 9))
    };

    let outcome = loader.join().unwrap();
    invalidator.join().unwrap();
    assert!(matches!(outcome, LoadOutcome::Hit | LoadOutcome::Miss));

    let mut q = vec![0u8; PAGE_SIZE];
    assert!(matches!(cache.load(0, 9, &mut q), LoadOutcome::Miss), "offset 9 must be gone after both threads finish");
}

#[test]
fn scenario_5_writeback_under_pressure() {
    // Few pool pages so a handful of compressible stores fill it
    // (ceiling = ceil(50% * 8) = 4 pages).
    let (cache, host) = cache(8);
    let compressible = |byte: u8| vec![byte; PAGE_SIZE];

    for offset in 0..4u64 {
        cache.store(0, offset, &compressible(offset as u8)).unwrap();
    }
    // This store should force a writeback of the LRU head (offset 0).
    cache.store(0, 99, &compressible(99)).unwrap();

    let mut q = vec![0u8; PAGE_SIZE];
    assert!(matches!(cache.load(0, 0, &mut q), LoadOutcome::Miss), "offset 0 should have been written back");
    assert!(host.written_page(0, 0).is_some(), "writeback must have reached the real device");

    assert!(matches!(cache.load(0, 99, &mut q), LoadOutcome::Hit));
    assert_eq!(q, compressible(99));
}

#[test]
fn scenario_6_invalidate_area_wipe() {
    let (cache, _host) = cache(1024);
    for offset in 0..100u64 {
        let page = vec![(offset % 200) as u8; PAGE_SIZE];
        cache.store(0, offset, &page).unwrap();
    }
    assert_eq!(cache.stats().stored_pages, 100);

    cache.invalidate_area(0);
    assert_eq!(cache.stats().stored_pages, 0);
    cache.init(0);

    for offset in 0..100u64 {
        let mut q = vec![0u8; PAGE_SIZE];
        assert!(matches!(cache.load(0, offset, &mut q), LoadOutcome::Miss));
    }
    assert_eq!(cache.stats().pool_pages, 0);
}

#[test]
fn round_trip_double_invalidate_is_a_no_op() {
    let (cache, _host) = cache(1024);
    cache.store(0, 1, &vec![1u8; PAGE_SIZE]).unwrap();
    cache.invalidate_page(0, 1);
    cache.invalidate_page(0, 1);

    let mut q = vec![0u8; PAGE_SIZE];
    assert!(matches!(cache.load(0, 1, &mut q), LoadOutcome::Miss));
}

#[test]
fn round_trip_identical_duplicate_store() {
    let (cache, _host) = cache(1024);
    let page = vec![2u8; PAGE_SIZE];
    cache.store(0, 1, &page).unwrap();
    cache.store(0, 1, &page).unwrap();
    assert_eq!(cache.stats().duplicates, 1);

    let mut q = vec![0u8; PAGE_SIZE];
    assert!(matches!(cache.load(0, 1, &mut q), LoadOutcome::Hit));
    assert_eq!(q, page);
}
