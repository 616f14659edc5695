//! Crawl job for one site
//!
//! A job seeds its frontier from the start URL, then lets its worker pool
//! run the crawl loop until every collector reached its limit (unless
//! unlimited) or the frontier is exhausted. The last worker to exit saves
//! state and reports.

use crate::collector::ContentCollector;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::frontier::{Frontier, Next};
use crate::crawler::options::{OptionSet, ScrapeOption};
use crate::crawler::pool::{CrawlTask, Step, WorkerPool};
use crate::output::{CollectorShare, JobReport};
use crate::state::JobState;
use crate::{Result, ScrapeError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;

/// Shared state of one crawl job, driven by its worker pool
pub(crate) struct ScrapeJob {
    pub(crate) id: u64,
    pub(crate) label: String,
    pub(crate) start_url: Url,
    pub(crate) options: OptionSet,
    pub(crate) frontier: Frontier,
    pub(crate) collectors: Vec<Arc<ContentCollector>>,
    pub(crate) contributions: Vec<AtomicU64>,
    pub(crate) fetcher: Arc<Fetcher>,
    /// Links are only offered while the frontier is smaller than this
    pub(crate) frontier_cap: usize,
    pub(crate) idle_wait: Duration,
    pub(crate) output_dir: PathBuf,
    pub(crate) state: Mutex<JobState>,
}

impl ScrapeJob {
    fn debug(&self) -> bool {
        self.options.contains(ScrapeOption::DebugMode)
    }

    fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.debug() {
            tracing::info!("{}: {}", self.label, message);
        } else {
            tracing::debug!("{}: {}", self.label, message);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> JobState {
        *self.lock_state()
    }

    /// Moves to `to` only if the job is currently in `from`
    fn try_transition(&self, from: JobState, to: JobState) -> bool {
        let mut state = self.lock_state();
        if *state == from && from.can_transition_to(to) {
            *state = to;
            true
        } else {
            false
        }
    }

    fn transition(&self, to: JobState) -> Result<()> {
        let mut state = self.lock_state();
        if !state.can_transition_to(to) {
            return Err(ScrapeError::InvalidTransition { from: *state, to });
        }
        *state = to;
        Ok(())
    }

    fn all_collectors_full(&self) -> bool {
        self.collectors.iter().all(|c| c.reached_limit())
    }

    /// Fetches the start URL, queues its links and collects its content
    async fn seed(&self) -> Result<usize> {
        let unable = |reason: String| ScrapeError::UnableToStart {
            label: self.label.clone(),
            reason,
        };

        let (final_url, body) = match self.fetcher.fetch(self.start_url.as_str()).await {
            FetchResult::Success {
                final_url, body, ..
            } => (final_url, body),
            other => return Err(unable(other.to_string())),
        };

        self.frontier.links().add_visited(self.start_url.as_str());
        let page_url = self
            .landed_on(self.start_url.as_str(), &final_url)
            .map_err(|e| unable(e.to_string()))?;
        let links = self
            .frontier
            .links()
            .extract_links(&body, &page_url)
            .map_err(|e| unable(e.to_string()))?;
        if links.is_empty() {
            return Err(unable("start page has no links to follow".to_string()));
        }

        let queued = self.frontier.offer(links);
        self.collect(body).await;
        Ok(queued)
    }

    /// URL that links on a fetched page resolve against
    ///
    /// This is where the fetch ended after redirects, falling back to the
    /// requested link. A redirect target is marked visited as well.
    fn landed_on(
        &self,
        requested: &str,
        final_url: &str,
    ) -> std::result::Result<Url, url::ParseError> {
        match Url::parse(final_url) {
            Ok(page_url) => {
                if page_url.as_str() != requested {
                    self.frontier.links().add_visited(page_url.as_str());
                }
                Ok(page_url)
            }
            Err(_) => Url::parse(requested),
        }
    }

    /// Fetches one link and feeds the page to the link and content collectors
    async fn visit(&self, link: &str) {
        let (final_url, body) = match self.fetcher.fetch(link).await {
            FetchResult::Success {
                final_url, body, ..
            } => (final_url, body),
            failure => {
                self.trace(format_args!("skipping {}: {}", link, failure));
                return;
            }
        };
        self.trace(format_args!("fetched {}", link));

        let page_url = self.landed_on(link, &final_url);
        if self.frontier.len() < self.frontier_cap {
            match page_url {
                Ok(page_url) => match self.frontier.links().extract_links(&body, &page_url) {
                    Ok(links) => {
                        let queued = self.frontier.offer(links);
                        self.trace(format_args!("queued {} new links from {}", queued, link));
                    }
                    Err(e) => self.trace(format_args!("{}", e)),
                },
                Err(e) => self.trace(format_args!("can't resolve links of {}: {}", link, e)),
            }
        }

        self.collect(body).await;
    }

    /// Runs every collector over the page on the blocking pool
    async fn collect(&self, body: String) {
        let collectors = self.collectors.clone();
        let extraction = tokio::task::spawn_blocking(move || {
            collectors
                .iter()
                .map(|collector| collector.add_from(&body))
                .collect::<Vec<u64>>()
        });
        let admitted = match extraction.await {
            Ok(admitted) => admitted,
            Err(e) => {
                tracing::error!("{}: content extraction failed: {}", self.label, e);
                return;
            }
        };

        let counters = self.collectors.iter().zip(&self.contributions);
        for ((collector, contributed), admitted) in counters.zip(admitted) {
            if admitted == 0 {
                continue;
            }
            contributed.fetch_add(admitted, Ordering::SeqCst);
            self.trace(format_args!(
                "{} +{} (total {})",
                collector.name(),
                admitted,
                collector.total()
            ));
        }
    }

    /// Writes pending visited links on the blocking pool
    async fn flush_visited(&self) {
        let links = Arc::clone(self.frontier.links());
        match tokio::task::spawn_blocking(move || links.flush()).await {
            Ok(Ok(count)) => self.trace(format_args!("saved {} visited links", count)),
            Ok(Err(e)) => tracing::error!("{}: {}", self.label, e),
            Err(e) => tracing::error!("{}: visited link flush failed: {}", self.label, e),
        }
    }

    fn save_links(&self) {
        let unvisited = self.output_dir.join(format!("{}.unvisited.txt", self.label));
        match self.frontier.save_unvisited(&unvisited) {
            Ok(count) => tracing::info!("{}: saved {} unvisited links", self.label, count),
            Err(e) => tracing::error!("{}: failed to save unvisited links: {}", self.label, e),
        }
        match self.frontier.links().flush() {
            Ok(count) => tracing::info!("{}: saved {} visited links", self.label, count),
            Err(e) => tracing::error!("{}: {}", self.label, e),
        }
    }

    fn save_content(&self) {
        for collector in &self.collectors {
            match collector.flush() {
                Ok(count) => tracing::info!(
                    "{}: saved {} items to {}",
                    self.label,
                    count,
                    collector.output_path().display()
                ),
                Err(e) => tracing::error!("{}: {}", self.label, e),
            }
        }
    }

    fn report(&self, workers: usize) -> JobReport {
        let collectors = self
            .collectors
            .iter()
            .zip(&self.contributions)
            .map(|(collector, contributed)| CollectorShare {
                name: collector.name().to_string(),
                contributed: contributed.load(Ordering::SeqCst),
                total: collector.total(),
                limit: collector.limit(),
            })
            .collect();

        JobReport {
            id: self.id,
            label: self.label.clone(),
            state: self.state(),
            workers,
            visited: self.frontier.links().visited_count(),
            unvisited: self.frontier.len(),
            collectors,
        }
    }
}

impl CrawlTask for ScrapeJob {
    fn should_continue(&self) -> bool {
        self.options.contains(ScrapeOption::Unlimited) || !self.all_collectors_full()
    }

    async fn step(&self) -> Step {
        let link = match self.frontier.next_link() {
            Next::Link(link) => link,
            Next::Wait => {
                tokio::time::sleep(self.idle_wait).await;
                return Step::Continue;
            }
            Next::Exhausted => return Step::Exhausted,
        };

        {
            let _page = self.frontier.page_guard();
            self.visit(&link).await;
        }

        if self.frontier.links().needs_flush() {
            self.flush_visited().await;
        }
        Step::Continue
    }

    fn close(&self) {
        if self.all_collectors_full() {
            tracing::info!("{} LIMIT REACHED", self.label);
        } else if self.frontier.is_empty() && self.frontier.in_flight() == 0 {
            tracing::info!("{}: no more links to visit", self.label);
        }

        if self.options.contains(ScrapeOption::SaveLinks) {
            self.save_links();
        }
        if self.options.contains(ScrapeOption::SaveParsedElements) {
            self.save_content();
        }

        if let Err(e) = self.transition(JobState::Closed) {
            tracing::warn!("{}: {}", self.label, e);
        }
        tracing::info!("{} FINISHED", self.label);
        for share in self.report(0).collectors {
            tracing::info!("{}: {}", self.label, share);
        }
    }
}

/// One site's crawl: frontier, collectors and worker pool
///
/// Built through [`crate::ScraperBuilder`].
pub struct Scraper {
    job: Arc<ScrapeJob>,
    pool: WorkerPool<ScrapeJob>,
    threads: usize,
}

impl Scraper {
    pub(crate) fn new(job: ScrapeJob, threads: usize) -> Self {
        let job = Arc::new(job);
        Self {
            pool: WorkerPool::new(Arc::clone(&job)),
            job,
            threads,
        }
    }

    pub fn id(&self) -> u64 {
        self.job.id
    }

    /// Label used in logs and link file names (`scraper-<id>@<site>`)
    pub fn label(&self) -> &str {
        &self.job.label
    }

    pub fn start_url(&self) -> &Url {
        &self.job.start_url
    }

    pub fn options(&self) -> &OptionSet {
        &self.job.options
    }

    pub fn state(&self) -> JobState {
        self.job.state()
    }

    pub fn collectors(&self) -> &[Arc<ContentCollector>] {
        &self.job.collectors
    }

    /// Number of links waiting in the frontier
    pub fn unvisited(&self) -> usize {
        self.job.frontier.len()
    }

    /// Number of links visited so far, including the start URL
    pub fn visited(&self) -> usize {
        self.job.frontier.links().visited_count()
    }

    /// Whether the link was visited by this job
    pub fn has_visited(&self, link: &str) -> bool {
        self.job.frontier.links().already_visited(link)
    }

    /// Seeds the frontier and launches the workers
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Workers were launched
    /// * `Ok(false)` - The job is not idle (already started or closed)
    /// * `Err(ScrapeError::UnableToStart)` - The start URL could not be fetched or has no links
    pub async fn start(&self) -> Result<bool> {
        if !self.job.try_transition(JobState::Idle, JobState::Starting) {
            let state = self.job.state();
            if state.is_terminal() {
                tracing::warn!("{} is closed and can't be started again", self.job.label);
            } else {
                tracing::warn!("{} can't be started while {}", self.job.label, state);
            }
            return Ok(false);
        }

        match self.job.seed().await {
            Ok(queued) => {
                self.job
                    .trace(format_args!("seeded frontier with {} links", queued));
            }
            Err(e) => {
                self.job.transition(JobState::Idle)?;
                tracing::error!("{} UNABLE TO START: {}", self.job.label, e);
                return Err(e);
            }
        }

        {
            // A stop() can only see Running once the workers exist
            let mut state = self.job.lock_state();
            if let Err(e) = self.pool.start(self.threads) {
                *state = JobState::Idle;
                return Err(e.into());
            }
            *state = JobState::Running;
        }
        tracing::info!(
            "{} started with {} workers {}",
            self.job.label,
            self.threads,
            self.job.options
        );
        Ok(true)
    }

    /// Requests a cooperative stop and waits until the job is closed
    ///
    /// Returns `false` if the job was not running.
    pub async fn stop(&self) -> bool {
        if !self
            .job
            .try_transition(JobState::Running, JobState::Stopping)
        {
            tracing::warn!(
                "{} can't be stopped while {}",
                self.job.label,
                self.job.state()
            );
            return false;
        }
        self.pool.stop().await;
        true
    }

    /// Waits until the job has closed; returns at once if it never started
    pub async fn wait(&self) {
        self.pool.wait().await;
    }

    /// Changes the number of workers of a running job
    pub fn resize(&self, threads: usize) -> Result<bool> {
        Ok(self.pool.resize(threads)?)
    }

    /// Number of live workers
    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    /// Progress report with per-collector contributions
    pub fn info(&self) -> JobReport {
        self.job.report(self.pool.size())
    }
}

impl std::fmt::Debug for Scraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scraper")
            .field("id", &self.job.id)
            .field("label", &self.job.label)
            .field("state", &self.job.state())
            .field("threads", &self.threads)
            .finish()
    }
}
