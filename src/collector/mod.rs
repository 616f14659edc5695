//! Collector module for bounded, flushable accumulation of matches
//!
//! This module contains:
//! - `ContentCollector`: per-pattern cache with a collection limit and disk flushing
//! - `LinkCollector`: link discovery with site/language filters and a
//!   lifetime-wide visited set

mod content;
mod link;

pub use content::{ContentCollector, DEFAULT_CACHE_SIZE};
pub use link::{LinkCollector, LinkFilters};

use sha2::{Digest, Sha256};

/// Returns a 64-bit fingerprint of an item (first 8 bytes of its SHA-256)
pub(crate) fn fingerprint(item: &str) -> u64 {
    let digest = Sha256::digest(item.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
