use crate::config::types::{Config, CrawlerConfig, JobConfig, PatternConfig, UserAgentConfig};
use crate::parser::StandardParser;
use crate::url::{verify_url, LanguageCode};
use crate::ConfigError;
use std::collections::HashMap;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;

    if config.jobs.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[job]] is required".to_string(),
        ));
    }
    for job in &config.jobs {
        validate_job(job)?;
    }
    validate_shared_patterns(&config.jobs)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.connect_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-ms must be >= 100ms, got {}ms",
            config.connect_timeout_ms
        )));
    }

    if config.cache_size < 1 {
        return Err(ConfigError::Validation(
            "cache-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates one job entry
fn validate_job(job: &JobConfig) -> Result<(), ConfigError> {
    verify_url(&job.start_url)?;

    if job.threads < 1 {
        return Err(ConfigError::Validation(format!(
            "{}: threads must be >= 1, got {}",
            job.start_url, job.threads
        )));
    }

    if job.patterns.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{}: at least one [[job.pattern]] is required",
            job.start_url
        )));
    }

    if let Some(code) = &job.restrict_language {
        LanguageCode::new(code)?;
    }

    if let Some(pattern) = &job.link_pattern {
        regex::Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("{}: link-pattern: {}", job.start_url, e))
        })?;
    }

    for pattern in &job.patterns {
        validate_pattern(pattern)?;
    }

    Ok(())
}

/// Validates a content pattern entry
fn validate_pattern(pattern: &PatternConfig) -> Result<(), ConfigError> {
    if pattern.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pattern name cannot be empty".to_string(),
        ));
    }

    if !pattern
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ConfigError::Validation(format!(
            "pattern name '{}' may only contain alphanumerics, '-', '_' and '.'",
            pattern.name
        )));
    }

    match (&pattern.standard, &pattern.pattern) {
        (Some(standard), None) => {
            StandardParser::from_name(standard)?;
        }
        (None, Some(regex)) => {
            regex::Regex::new(regex).map_err(|e| {
                ConfigError::InvalidPattern(format!("pattern '{}': {}", pattern.name, e))
            })?;
        }
        _ => {
            return Err(ConfigError::Validation(format!(
                "pattern '{}' needs exactly one of 'standard' or 'pattern'",
                pattern.name
            )));
        }
    }

    if let (Some(min), Some(max)) = (pattern.min_words, pattern.max_words) {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "pattern '{}': min-words ({}) is greater than max-words ({})",
                pattern.name, min, max
            )));
        }
    }

    Ok(())
}

/// Patterns sharing a name share a collector, so their definitions must agree
fn validate_shared_patterns(jobs: &[JobConfig]) -> Result<(), ConfigError> {
    let mut seen: HashMap<&str, (&PatternConfig, u64)> = HashMap::new();

    for job in jobs {
        for pattern in &job.patterns {
            let limit = pattern.limit.unwrap_or(job.limit);
            match seen.get(pattern.name.as_str()) {
                Some((first, first_limit)) if *first != pattern || *first_limit != limit => {
                    return Err(ConfigError::Validation(format!(
                        "pattern '{}' is declared more than once with different settings",
                        pattern.name
                    )));
                }
                Some(_) => {}
                None => {
                    seen.insert(pattern.name.as_str(), (pattern, limit));
                }
            }
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}
