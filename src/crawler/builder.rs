use crate::collector::{ContentCollector, LinkCollector, LinkFilters, DEFAULT_CACHE_SIZE};
use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::options::{OptionSet, ScrapeOption};
use crate::crawler::scraper::{ScrapeJob, Scraper};
use crate::parser::{ParserDescriptor, StandardParser};
use crate::state::JobState;
use crate::url::{extract_domain, site_identifier, LanguageCode};
use crate::{ConfigError, Result};
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default wait before a worker polls an empty frontier again
const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(50);

/// Collects everything a crawl job needs and validates it on build
///
/// # Example
///
/// ```no_run
/// use harvest_ripple::{ParserDescriptor, ScrapeOption, ScraperBuilder};
///
/// # fn main() -> harvest_ripple::Result<()> {
/// let scraper = ScraperBuilder::new("https://en.wikipedia.org/wiki/Rust")
///     .parser(ParserDescriptor::new("sentences", "[A-Z][a-z ]*[.!?]")?)
///     .limit(1000)
///     .threads(4)
///     .option(ScrapeOption::StayOnWebsite)
///     .option(ScrapeOption::SaveParsedElements)
///     .build(1)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ScraperBuilder {
    start_url: String,
    parsers: Vec<ParserDescriptor>,
    collectors: Vec<Arc<ContentCollector>>,
    link_parser: Option<ParserDescriptor>,
    limit: u64,
    threads: usize,
    options: OptionSet,
    output_dir: PathBuf,
    cache_size: usize,
    idle_wait: Duration,
    fetcher: Option<Arc<Fetcher>>,
}

impl ScraperBuilder {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            parsers: Vec::new(),
            collectors: Vec::new(),
            link_parser: None,
            limit: 0,
            threads: 1,
            options: OptionSet::new(),
            output_dir: PathBuf::from("output"),
            cache_size: DEFAULT_CACHE_SIZE,
            idle_wait: DEFAULT_IDLE_WAIT,
            fetcher: None,
        }
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Adds a content pattern; its collector gets the builder's limit
    pub fn parser(mut self, descriptor: ParserDescriptor) -> Self {
        self.parsers.push(descriptor);
        self
    }

    /// Adds a collector that may be shared with other jobs
    pub fn collector(mut self, collector: Arc<ContentCollector>) -> Self {
        self.collectors.push(collector);
        self
    }

    /// Replaces the standard link pattern
    pub fn link_parser(mut self, descriptor: ParserDescriptor) -> Self {
        self.link_parser = Some(descriptor);
        self
    }

    /// Collection limit for collectors built from [`ScraperBuilder::parser`]; 0 is unlimited
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn option(mut self, option: ScrapeOption) -> Self {
        self.options.insert(option);
        self
    }

    pub fn options(mut self, options: OptionSet) -> Self {
        self.options = options;
        self
    }

    pub fn restrict_language(mut self, language: LanguageCode) -> Self {
        self.options = self.options.restrict_language(language);
        self
    }

    /// Directory receiving content and link files
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Cache size for built collectors and the frontier's offer threshold
    pub fn cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size.max(1);
        self
    }

    pub fn idle_wait(mut self, wait: Duration) -> Self {
        self.idle_wait = wait;
        self
    }

    /// Shares an HTTP fetcher between jobs
    pub fn fetcher(mut self, fetcher: Arc<Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Validates the settings and creates an idle job
    ///
    /// # Errors
    ///
    /// * `ScrapeError::Config` - Malformed start URL, zero threads or no content pattern
    /// * `ScrapeError::Io` - The output directory could not be created
    /// * `ScrapeError::Reqwest` - The default HTTP client could not be built
    pub fn build(self, id: u64) -> Result<Scraper> {
        let start_url = LinkCollector::verify(&self.start_url)?;

        if self.threads == 0 {
            return Err(ConfigError::Validation(format!(
                "{}: thread count must be at least 1",
                self.start_url
            ))
            .into());
        }
        if self.parsers.is_empty() && self.collectors.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{}: at least one content pattern is required",
                self.start_url
            ))
            .into());
        }

        let site = site_identifier(&start_url)
            .or_else(|| extract_domain(&start_url))
            .unwrap_or_default();
        let label = format!("scraper-{}@{}", id, site);

        let saves = self.options.contains(ScrapeOption::SaveLinks)
            || self.options.contains(ScrapeOption::SaveParsedElements);
        if saves {
            std::fs::create_dir_all(&self.output_dir)?;
        }

        let mut collectors = self.collectors;
        for descriptor in self.parsers {
            let collector = ContentCollector::new(descriptor, Some(self.limit), &self.output_dir)
                .with_cache_size(self.cache_size);
            collectors.push(Arc::new(collector));
        }
        if self.options.contains(ScrapeOption::SaveParsedElements) {
            for collector in &collectors {
                collector.enable_saving();
            }
        }

        let filters = LinkFilters {
            site: self
                .options
                .contains(ScrapeOption::StayOnWebsite)
                .then(|| site.clone()),
            language: self.options.language().cloned(),
        };
        let links = LinkCollector::new(
            self.link_parser
                .unwrap_or_else(|| StandardParser::Links.descriptor()),
            filters,
            self.output_dir.join(format!("{}.visited.txt", label)),
        )
        .with_cache_size(self.cache_size);
        if self.options.contains(ScrapeOption::SaveLinks) {
            links.enable_saving();
        }

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(Fetcher::from_config(
                &CrawlerConfig::default(),
                &UserAgentConfig::default(),
            )?),
        };

        let contributions = collectors.iter().map(|_| AtomicU64::new(0)).collect();
        let job = ScrapeJob {
            id,
            label,
            start_url,
            options: self.options,
            frontier: Frontier::new(Arc::new(links)),
            collectors,
            contributions,
            fetcher,
            frontier_cap: self.cache_size,
            idle_wait: self.idle_wait,
            output_dir: self.output_dir,
            state: Mutex::new(JobState::Idle),
        };

        Ok(Scraper::new(job, self.threads))
    }
}
