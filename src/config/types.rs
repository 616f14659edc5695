use crate::crawler::ScrapeOption;
use crate::parser::TransformKind;
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Harvest-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(rename = "job", default)]
    pub jobs: Vec<JobConfig>,
}

/// Settings shared by every job
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Timeout for a whole request, body included (milliseconds)
    pub request_timeout_ms: u64,

    /// Timeout for establishing a connection (milliseconds)
    pub connect_timeout_ms: u64,

    /// How long a worker sleeps after an HTTP 429 (milliseconds)
    pub rate_limit_cooldown_ms: u64,

    /// Items a collector caches before flushing; also caps link offers
    pub cache_size: usize,

    /// How long an idle worker waits before polling the frontier again (milliseconds)
    pub idle_wait_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            connect_timeout_ms: 5_000,
            rate_limit_cooldown_ms: 30_000,
            cache_size: crate::collector::DEFAULT_CACHE_SIZE,
            idle_wait_ms: 50,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "HarvestRipple".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = [
            self.contact_url.as_ref().map(|u| format!("+{}", u)),
            self.contact_email.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Directory receiving content files and link snapshots
    pub directory: PathBuf,

    /// Markdown summary written when the fleet finishes, relative to `directory`
    pub summary_file: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            summary_file: Some("summary.md".to_string()),
        }
    }
}

/// One crawl job
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobConfig {
    /// Seed URL
    pub start_url: String,

    /// Number of workers
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Default limit for this job's patterns; 0 is unlimited
    #[serde(default)]
    pub limit: u64,

    #[serde(default)]
    pub options: Vec<ScrapeOption>,

    /// Language code links must carry (e.g. "en")
    pub restrict_language: Option<String>,

    /// Custom link pattern; capture group 1 (or the whole match) is the href
    pub link_pattern: Option<String>,

    #[serde(rename = "pattern", default)]
    pub patterns: Vec<PatternConfig>,
}

fn default_threads() -> usize {
    1
}

/// Content pattern of a job
///
/// Patterns with the same name are backed by one collector shared by every
/// job that declares them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatternConfig {
    /// Collector name, also the output file stem
    pub name: String,

    /// Built-in parser ("text" or "links"); exclusive with `pattern`
    pub standard: Option<String>,

    /// Custom regular expression; exclusive with `standard`
    pub pattern: Option<String>,

    /// Transform applied before matching a custom pattern
    pub transform: Option<TransformKind>,

    pub min_words: Option<usize>,
    pub max_words: Option<usize>,

    /// Overrides the job limit; 0 is unlimited
    pub limit: Option<u64>,
}
