//! URL handling module for Harvest-Ripple
//!
//! This module provides seed verification, link resolution, site
//! identification and language-marker matching for discovered links.

mod domain;
mod language;
mod matcher;
mod resolve;

use crate::ConfigError;
use std::sync::LazyLock;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, site_identifier};
pub use language::{Language, LanguageCode};
pub use matcher::is_same_site;
pub use resolve::resolve_link;

/// Generic HTTP(S) URL shape a crawl seed must match in full
static HTTP_URL_SHAPE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$",
    )
    .expect("static URL shape regex is valid")
});

/// Verifies that a URL is acceptable as a crawl seed
///
/// The URL must parse, use the `http` or `https` scheme, carry a host and
/// match the generic HTTP URL shape. Rejection happens before any network
/// access.
///
/// # Examples
///
/// ```
/// use harvest_ripple::url::verify_url;
///
/// assert!(verify_url("https://en.wikipedia.org/wiki/Rust").is_ok());
/// assert!(verify_url("ftp://example.com").is_err());
/// assert!(verify_url("not a url").is_err());
/// ```
pub fn verify_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}' is not a valid url: {}", url, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}' must use the http or https scheme",
            url
        )));
    }

    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!("'{}' has no host", url)));
    }

    if !HTTP_URL_SHAPE.is_match(url) {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}' is not a valid url",
            url
        )));
    }

    Ok(parsed)
}
