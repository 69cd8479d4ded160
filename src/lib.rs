//! A compressed swap cache: an indexed store of compressed anonymous pages
//! sitting between the VM's swap-out/swap-in paths and the real swap
//! device, trading CPU for I/O by keeping hot reclaimed pages compressed
//! in RAM instead of writing them out immediately.
//!
//! [`Cache`] is the entry point; everything else is reachable through it.

pub mod cache;
pub mod codec;
pub mod config;
pub mod cos;
pub mod entry;
pub mod error;
pub mod host;
pub mod index;
pub mod invalidate;
pub mod load;
pub mod page_pool;
pub mod scratch;
pub mod stats;
pub mod store;
pub mod writeback;

pub use cache::Cache;
pub use config::Config;
pub use entry::{SwapOffset, SwapType};
pub use error::{Error, Result};
pub use host::{DynSwapHost, HostPage, HostPageOutcome, SwapHost, WritebackCompletion};
pub use load::LoadOutcome;
pub use stats::Snapshot;
