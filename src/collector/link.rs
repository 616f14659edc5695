use crate::collector::DEFAULT_CACHE_SIZE;
use crate::output::append_lines;
use crate::parser::ParserDescriptor;
use crate::url::{is_same_site, resolve_link, verify_url, LanguageCode};
use crate::{ConfigError, ScrapeError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// Optional restrictions applied to every discovered link
#[derive(Debug, Clone, Default)]
pub struct LinkFilters {
    /// Site identifier links must belong to (stay on website)
    pub site: Option<String>,

    /// Language marker links must carry (restrict language)
    pub language: Option<LanguageCode>,
}

impl LinkFilters {
    /// Returns true when the resolved link passes every active filter
    pub fn accepts(&self, link: &Url) -> bool {
        if let Some(site) = &self.site {
            if !is_same_site(site, link) {
                return false;
            }
        }
        if let Some(language) = &self.language {
            if !language.matches(link.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Default)]
struct LinkState {
    /// Every link visited during the job's lifetime
    visited: HashSet<String>,

    /// Visited links not yet written to disk, only tracked while saving
    unsaved: Vec<String>,
}

/// Discovers links on pages and remembers which ones were visited
///
/// Links are admitted one at a time through [`LinkCollector::add_visited`].
/// Unlike content, visited links are never forgotten on flush: only the
/// list of links awaiting save is cleared. Once that list reaches the cache
/// size, [`LinkCollector::needs_flush`] reports it.
#[derive(Debug)]
pub struct LinkCollector {
    descriptor: ParserDescriptor,
    filters: LinkFilters,
    output_path: PathBuf,
    cache_size: usize,
    should_save: AtomicBool,
    state: Mutex<LinkState>,
    writer: Mutex<()>,
}

impl LinkCollector {
    /// Creates a link collector saving visited links to `output_path`
    pub fn new(descriptor: ParserDescriptor, filters: LinkFilters, output_path: PathBuf) -> Self {
        Self {
            descriptor,
            filters,
            output_path,
            cache_size: DEFAULT_CACHE_SIZE,
            should_save: AtomicBool::new(false),
            state: Mutex::new(LinkState::default()),
            writer: Mutex::new(()),
        }
    }

    /// Sets the number of unsaved visited links that calls for a flush
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size.max(1);
        self
    }

    /// Validates a crawl seed before any network access
    pub fn verify(url: &str) -> Result<Url, ConfigError> {
        verify_url(url)
    }

    /// Returns the active filters
    pub fn filters(&self) -> &LinkFilters {
        &self.filters
    }

    /// Enables writing visited links on flush
    pub fn enable_saving(&self) {
        self.should_save.store(true, Ordering::SeqCst);
    }

    /// Returns the file visited links are appended to
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Extracts candidate links from a page
    ///
    /// Matches are resolved against the page URL and filtered; visited links
    /// are not removed here.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)` - Resolved links that pass the filters (may be empty)
    /// * `Err(ScrapeError::PageWithoutLinks)` - The page has no link matches at all
    pub fn extract_links(&self, html: &str, page_url: &Url) -> Result<Vec<String>, ScrapeError> {
        let raw = self.descriptor.extract(html);
        if raw.is_empty() {
            return Err(ScrapeError::PageWithoutLinks {
                url: page_url.to_string(),
            });
        }

        let mut links: Vec<String> = raw
            .iter()
            .filter_map(|href| resolve_link(href, page_url))
            .filter(|link| match Url::parse(link) {
                Ok(parsed) => self.filters.accepts(&parsed),
                Err(_) => false,
            })
            .collect();
        links.sort();
        links.dedup();

        Ok(links)
    }

    /// Records a link as visited
    ///
    /// # Returns
    ///
    /// `true` if the link was not visited before
    pub fn add_visited(&self, link: &str) -> bool {
        let mut state = self.lock_state();
        if !state.visited.insert(link.to_string()) {
            return false;
        }
        if self.should_save.load(Ordering::SeqCst) {
            state.unsaved.push(link.to_string());
        }
        true
    }

    /// Number of visited links waiting to be written
    pub fn pending(&self) -> usize {
        self.lock_state().unsaved.len()
    }

    /// Whether enough visited links are waiting to warrant a flush
    pub fn needs_flush(&self) -> bool {
        self.pending() >= self.cache_size
    }

    /// Tests whether a link was visited at any point during the job
    pub fn already_visited(&self, link: &str) -> bool {
        self.lock_state().visited.contains(link)
    }

    /// Number of links visited so far
    pub fn visited_count(&self) -> usize {
        self.lock_state().visited.len()
    }

    /// Appends visited links not yet saved to the output file
    ///
    /// The visited set itself is kept. The file is written after the state
    /// lock is released, so dequeueing continues during the write. On
    /// failure the links are put back for the next flush.
    pub fn flush(&self) -> Result<usize, ScrapeError> {
        let unsaved = std::mem::take(&mut self.lock_state().unsaved);
        if unsaved.is_empty() {
            return Ok(0);
        }

        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(source) = append_lines(&self.output_path, &unsaved) {
            let mut state = self.lock_state();
            let newer = std::mem::replace(&mut state.unsaved, unsaved);
            state.unsaved.extend(newer);
            return Err(ScrapeError::Flush {
                name: "visited links".to_string(),
                source,
            });
        }

        Ok(unsaved.len())
    }

    fn lock_state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
