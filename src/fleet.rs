//! Fleet of crawl jobs run side by side
//!
//! The fleet owns the job-ID generator and offers start/stop/info over
//! single jobs or all of them at once.

use crate::crawler::{Scraper, ScraperBuilder};
use crate::output::{FleetReport, JobReport};
use crate::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Collection of crawl jobs keyed by ID
#[derive(Debug)]
pub struct Fleet {
    next_id: AtomicU64,
    jobs: Mutex<BTreeMap<u64, Arc<Scraper>>>,
    started_at: DateTime<Utc>,
    clock: Instant,
    config_hash: Option<String>,
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new()
    }
}

impl Fleet {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: Mutex::new(BTreeMap::new()),
            started_at: Utc::now(),
            clock: Instant::now(),
            config_hash: None,
        }
    }

    /// Records the hash of the configuration the fleet was built from
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Builds a job with the next free ID and registers it
    pub fn add(&self, builder: ScraperBuilder) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let scraper = builder.build(id)?;
        tracing::info!("Added {}", scraper.label());
        self.lock_jobs().insert(id, Arc::new(scraper));
        Ok(id)
    }

    /// Looks up a job
    pub fn get(&self, id: u64) -> Result<Arc<Scraper>> {
        self.lock_jobs()
            .get(&id)
            .cloned()
            .ok_or(ScrapeError::UnknownJob(id))
    }

    pub async fn start(&self, id: u64) -> Result<bool> {
        self.get(id)?.start().await
    }

    pub async fn stop(&self, id: u64) -> Result<bool> {
        Ok(self.get(id)?.stop().await)
    }

    /// Starts every idle job concurrently
    ///
    /// Jobs that fail to start are logged and skipped.
    ///
    /// # Returns
    ///
    /// The number of jobs that were started
    pub async fn start_all(&self) -> usize {
        let mut starts = JoinSet::new();
        for scraper in self.scrapers() {
            starts.spawn(async move { scraper.start().await });
        }

        let mut started = 0;
        while let Some(joined) = starts.join_next().await {
            match joined {
                Ok(Ok(true)) => started += 1,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => tracing::error!("{}", e),
                Err(e) => tracing::error!("Start task failed: {}", e),
            }
        }
        started
    }

    /// Stops every running job and waits until all of them closed
    ///
    /// # Returns
    ///
    /// The number of jobs that were stopped
    pub async fn stop_all(&self) -> usize {
        let mut stops = JoinSet::new();
        for scraper in self.scrapers() {
            stops.spawn(async move { scraper.stop().await });
        }

        let mut stopped = 0;
        while let Some(joined) = stops.join_next().await {
            match joined {
                Ok(true) => stopped += 1,
                Ok(false) => {}
                Err(e) => tracing::error!("Stop task failed: {}", e),
            }
        }
        stopped
    }

    /// Waits until every started job has closed
    pub async fn wait_all(&self) {
        for scraper in self.scrapers() {
            scraper.wait().await;
        }
    }

    pub fn info(&self, id: u64) -> Result<JobReport> {
        Ok(self.get(id)?.info())
    }

    /// Reports of all jobs in ID order
    pub fn list_jobs(&self) -> Vec<JobReport> {
        self.scrapers().iter().map(|s| s.info()).collect()
    }

    /// Time since the fleet was created
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Number of jobs that are running or draining
    pub fn running_count(&self) -> usize {
        self.scrapers()
            .iter()
            .filter(|s| s.state().is_active())
            .count()
    }

    pub fn len(&self) -> usize {
        self.lock_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_jobs().is_empty()
    }

    pub fn report(&self) -> FleetReport {
        FleetReport {
            started_at: self.started_at,
            elapsed_seconds: self.elapsed().as_secs(),
            config_hash: self.config_hash.clone(),
            jobs: self.list_jobs(),
        }
    }

    fn scrapers(&self) -> Vec<Arc<Scraper>> {
        self.lock_jobs().values().cloned().collect()
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, Arc<Scraper>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
