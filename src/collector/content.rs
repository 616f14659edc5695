use crate::collector::fingerprint;
use crate::output::append_lines;
use crate::parser::ParserDescriptor;
use crate::ScrapeError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Cache size above which a collector flushes itself
pub const DEFAULT_CACHE_SIZE: usize = 1_000_000;

/// Mutable part of a collector, guarded by one lock
#[derive(Debug, Default)]
struct CollectorState {
    /// Items admitted since the last flush
    cache: HashSet<String>,

    /// Items admitted over the collector's lifetime
    collected: u64,

    /// Fingerprints of every admitted item, cached or flushed
    seen: HashSet<u64>,
}

/// Accumulates the matches of one descriptor across pages
///
/// A collector may be shared by several workers and several jobs. Admission
/// and taking the cache for a flush run in one critical section per
/// collector, so different collectors never contend with each other. The
/// file write itself happens outside that section, serialized by a separate
/// writer lock, so admissions proceed while a large cache is written.
///
/// Items are deduplicated for the collector's lifetime, including items that
/// were already flushed to disk.
#[derive(Debug)]
pub struct ContentCollector {
    descriptor: ParserDescriptor,
    limit: Option<u64>,
    cache_size: usize,
    output_path: PathBuf,
    should_save: AtomicBool,
    state: Mutex<CollectorState>,
    writer: Mutex<()>,
}

impl ContentCollector {
    /// Creates a collector writing to `<output_dir>/<descriptor name>.txt`
    ///
    /// # Arguments
    ///
    /// * `descriptor` - What to extract from each page
    /// * `limit` - Maximum number of items to collect; `None` or `Some(0)` is unlimited
    /// * `output_dir` - Directory that receives the output file
    pub fn new(descriptor: ParserDescriptor, limit: Option<u64>, output_dir: &Path) -> Self {
        let output_path = output_dir.join(format!("{}.txt", descriptor.name()));
        Self {
            descriptor,
            limit: limit.filter(|l| *l > 0),
            cache_size: DEFAULT_CACHE_SIZE,
            output_path,
            should_save: AtomicBool::new(false),
            state: Mutex::new(CollectorState::default()),
            writer: Mutex::new(()),
        }
    }

    /// Sets the cache size that triggers an automatic flush
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size.max(1);
        self
    }

    /// Enables writing flushed items to the output file
    pub fn enable_saving(&self) {
        self.should_save.store(true, Ordering::SeqCst);
    }

    /// Returns whether flushed items are written to disk
    pub fn saves(&self) -> bool {
        self.should_save.load(Ordering::SeqCst)
    }

    /// Returns the descriptor name
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Returns the collection limit, `None` when unlimited
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Returns the path flushed items are appended to
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Extracts matches from a page and admits the new ones
    ///
    /// Items already admitted earlier (cached or flushed) are skipped. When
    /// the remaining budget is smaller than the number of new items, only as
    /// many as fit are admitted. The cache is flushed once it reaches the
    /// cache size.
    ///
    /// # Returns
    ///
    /// The number of items admitted by this call
    pub fn add_from(&self, html: &str) -> u64 {
        if self.reached_limit() {
            return 0;
        }

        let matches = self.descriptor.extract(html);
        if matches.is_empty() {
            return 0;
        }

        let mut state = self.lock_state();
        let mut admitted = 0;

        for item in matches {
            if self.limit.is_some_and(|limit| state.collected >= limit) {
                break;
            }
            if !state.seen.insert(fingerprint(&item)) {
                continue;
            }
            state.cache.insert(item);
            state.collected += 1;
            admitted += 1;
        }

        if state.cache.len() >= self.cache_size {
            if let Err(e) = self.write_out(state) {
                tracing::error!("Automatic flush failed: {}", e);
            }
        }

        admitted
    }

    /// Returns true once the collector has collected its limit
    pub fn reached_limit(&self) -> bool {
        match self.limit {
            Some(limit) => self.total() >= limit,
            None => false,
        }
    }

    /// Returns the number of items admitted over the collector's lifetime
    pub fn total(&self) -> u64 {
        self.lock_state().collected
    }

    /// Returns the number of items currently held in memory
    pub fn cached(&self) -> usize {
        self.lock_state().cache.len()
    }

    /// Returns a copy of the items currently held in memory
    pub fn cached_items(&self) -> Vec<String> {
        self.lock_state().cache.iter().cloned().collect()
    }

    /// Writes cached items to disk (if saving is enabled) and clears the cache
    ///
    /// When saving is disabled the cache is cleared anyway to bound memory.
    /// When the write fails the cache is kept so the items can be retried.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of items moved out of the cache
    /// * `Err(ScrapeError::Flush)` - The output file could not be written
    pub fn flush(&self) -> Result<usize, ScrapeError> {
        self.write_out(self.lock_state())
    }

    /// Takes the cache under the state lock, then writes it after releasing it
    fn write_out(&self, mut state: MutexGuard<'_, CollectorState>) -> Result<usize, ScrapeError> {
        if state.cache.is_empty() {
            return Ok(0);
        }
        let items = std::mem::take(&mut state.cache);
        drop(state);

        let flushed = items.len();
        if self.saves() {
            let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(source) = append_lines(&self.output_path, items.iter()) {
                self.lock_state().cache.extend(items);
                return Err(ScrapeError::Flush {
                    name: self.name().to_string(),
                    source,
                });
            }
        }

        tracing::debug!("Flushed {} items from {}", flushed, self.name());
        Ok(flushed)
    }

    fn lock_state(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
