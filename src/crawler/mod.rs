//! Crawler module for concurrent, per-site crawl jobs
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a cooldown on rate-limit responses
//! - The link frontier shared by a job's workers
//! - A resizable worker pool with a one-time close sequence
//! - Crawl jobs and their builder

mod builder;
mod fetcher;
mod frontier;
mod options;
mod pool;
mod scraper;

pub use builder::ScraperBuilder;
pub use fetcher::{build_http_client, FetchResult, Fetcher};
pub use frontier::{Frontier, Next, PageGuard};
pub use options::{OptionSet, ScrapeOption};
pub use pool::{CrawlTask, Step, WorkerPool};
pub use scraper::Scraper;
