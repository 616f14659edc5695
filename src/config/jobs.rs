use crate::collector::ContentCollector;
use crate::config::types::{Config, PatternConfig};
use crate::crawler::{Fetcher, OptionSet, ScraperBuilder};
use crate::fleet::Fleet;
use crate::parser::{ParserDescriptor, StandardParser};
use crate::url::LanguageCode;
use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Builds one job builder per `[[job]]` entry
///
/// All jobs share one HTTP fetcher. Patterns with the same name across jobs
/// are backed by a single collector, so their limit is shared too.
pub fn job_builders(config: &Config) -> Result<Vec<ScraperBuilder>> {
    let fetcher = Arc::new(Fetcher::from_config(&config.crawler, &config.user_agent)?);
    let output_dir = &config.output.directory;
    let mut collectors: HashMap<&str, Arc<ContentCollector>> = HashMap::new();
    let mut builders = Vec::with_capacity(config.jobs.len());

    for job in &config.jobs {
        let mut options: OptionSet = job.options.iter().copied().collect();
        if let Some(code) = &job.restrict_language {
            options = options.restrict_language(LanguageCode::new(code)?);
        }

        let mut builder = ScraperBuilder::new(job.start_url.clone())
            .threads(job.threads)
            .limit(job.limit)
            .options(options)
            .output_dir(output_dir.clone())
            .cache_size(config.crawler.cache_size)
            .idle_wait(Duration::from_millis(config.crawler.idle_wait_ms))
            .fetcher(Arc::clone(&fetcher));

        if let Some(link_pattern) = &job.link_pattern {
            builder = builder.link_parser(ParserDescriptor::new("link", link_pattern)?);
        }

        for pattern in &job.patterns {
            let collector = match collectors.get(pattern.name.as_str()) {
                Some(collector) => Arc::clone(collector),
                None => {
                    let limit = pattern.limit.unwrap_or(job.limit);
                    let collector = Arc::new(
                        ContentCollector::new(descriptor(pattern)?, Some(limit), output_dir)
                            .with_cache_size(config.crawler.cache_size),
                    );
                    collectors.insert(pattern.name.as_str(), Arc::clone(&collector));
                    collector
                }
            };
            builder = builder.collector(collector);
        }

        builders.push(builder);
    }

    Ok(builders)
}

/// Builds a fleet holding every configured job
pub fn build_fleet(config: &Config, config_hash: Option<String>) -> Result<Fleet> {
    let fleet = match config_hash {
        Some(hash) => Fleet::new().with_config_hash(hash),
        None => Fleet::new(),
    };
    for builder in job_builders(config)? {
        fleet.add(builder)?;
    }
    Ok(fleet)
}

/// Turns a pattern entry into a descriptor
fn descriptor(pattern: &PatternConfig) -> std::result::Result<ParserDescriptor, ConfigError> {
    let descriptor = match (&pattern.standard, &pattern.pattern) {
        (Some(standard), None) => {
            let descriptor = StandardParser::from_name(standard)?.named(&pattern.name)?;
            match pattern.transform {
                Some(transform) => transform.apply_to(descriptor),
                None => descriptor,
            }
        }
        (None, Some(regex)) => pattern
            .transform
            .unwrap_or_default()
            .apply_to(ParserDescriptor::new(pattern.name.as_str(), regex)?),
        _ => {
            return Err(ConfigError::Validation(format!(
                "pattern '{}' needs exactly one of 'standard' or 'pattern'",
                pattern.name
            )))
        }
    };

    Ok(descriptor.with_word_bounds(pattern.min_words, pattern.max_words))
}
