use url::{Host, Url};

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use harvest_ripple::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Derives the site identifier used by the stay-on-website filter
///
/// For domain hosts the identifier is the lowercased host with any `www.`
/// prefix removed. Links stay on the site when their host is the identifier
/// or one of its subdomains, so a seed on `www.bbc.co.uk` keeps the crawl on
/// `bbc.co.uk` and never widens it to `co.uk`. IP hosts identify themselves.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use harvest_ripple::url::site_identifier;
///
/// let url = Url::parse("https://www.bbc.co.uk/news").unwrap();
/// assert_eq!(site_identifier(&url), Some("bbc.co.uk".to_string()));
/// ```
pub fn site_identifier(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => {
            let domain = domain.to_lowercase();
            let domain = domain.trim_end_matches('.');
            Some(domain.strip_prefix("www.").unwrap_or(domain).to_string())
        }
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}
