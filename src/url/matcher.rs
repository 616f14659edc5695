use url::Url;

use crate::url::extract_domain;

/// Checks whether a link belongs to the given site identifier
///
/// A link is on-site when its host is the identifier itself or any
/// subdomain of it (see [`crate::url::site_identifier`]). A `www.` prefix
/// on the link's host is ignored.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use harvest_ripple::url::is_same_site;
///
/// let link = Url::parse("https://en.example.com/a").unwrap();
/// assert!(is_same_site("example.com", &link));
///
/// let link = Url::parse("https://other.com/x").unwrap();
/// assert!(!is_same_site("example.com", &link));
/// ```
pub fn is_same_site(site: &str, link: &Url) -> bool {
    let Some(domain) = extract_domain(link) else {
        return false;
    };
    let domain = domain.trim_end_matches('.');
    let domain = domain.strip_prefix("www.").unwrap_or(domain);

    // Label boundary: "myexample.com" is not a subdomain of "example.com"
    domain == site
        || domain
            .strip_suffix(site)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
