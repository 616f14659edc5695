use url::Url;

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links (same page anchors)
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// The fragment of a resolved link is dropped so that `page#a` and `page#b`
/// count as the same link.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use harvest_ripple::url::resolve_link;
///
/// let base = Url::parse("https://example.com/wiki/Start").unwrap();
/// assert_eq!(
///     resolve_link("/wiki/Rust#History", &base),
///     Some("https://example.com/wiki/Rust".to_string())
/// );
/// assert_eq!(resolve_link("mailto:me@example.com", &base), None);
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);

    Some(absolute_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_absolute_link() {
        assert_eq!(
            resolve_link("https://other.com/page", &base_url()),
            Some("https://other.com/page".to_string())
        );
    }

    #[test]
    fn test_relative_links() {
        assert_eq!(
            resolve_link("/other", &base_url()),
            Some("https://example.com/other".to_string())
        );
        assert_eq!(
            resolve_link("other", &base_url()),
            Some("https://example.com/other".to_string())
        );
    }

    #[test]
    fn test_skip_special_schemes() {
        assert_eq!(resolve_link("javascript:void(0)", &base_url()), None);
        assert_eq!(resolve_link("tel:+1234567890", &base_url()), None);
        assert_eq!(resolve_link("data:text/html,<h1>x</h1>", &base_url()), None);
        assert_eq!(resolve_link("ftp://example.com/file", &base_url()), None);
    }

    #[test]
    fn test_skip_fragment_only() {
        assert_eq!(resolve_link("#section", &base_url()), None);
        assert_eq!(resolve_link("   ", &base_url()), None);
    }
}
