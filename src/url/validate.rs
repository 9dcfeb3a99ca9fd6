use crate::config::FilterConfig;
use crate::url::domain::{count_occurrences, extract_domain, extract_netloc};
use url::Url;

/// Longest URL the crawler will accept
const MAX_URL_LENGTH: usize = 2000;

/// Characters that never appear in a well-formed crawlable URL
const FORBIDDEN_CHARS: &[char] = &['<', '>', '"', '`', '{', '}', '|', '^'];

/// Decides whether a URL should enter the frontier
///
/// Rejects:
/// - non-HTTP(S) schemes
/// - external hosts unless `follow_external_links` is set
/// - malformed URLs: repeated `://`, the host appearing more than twice,
///   `//` inside the path, more than 2000 characters, or forbidden characters
/// - paths ending in a blocked extension
/// - paths whose last segment has an extension outside the allowed set
///
/// # Examples
///
/// ```
/// use brewcrawl::config::FilterConfig;
/// use brewcrawl::url::is_valid_url;
///
/// let filters = FilterConfig::default();
/// assert!(is_valid_url("https://a.com/menu", "a.com", &filters));
/// assert!(!is_valid_url("https://a.com/menu.pdf", "a.com", &filters));
/// assert!(!is_valid_url("https://b.com/menu", "a.com", &filters));
/// ```
pub fn is_valid_url(url: &str, base_domain: &str, filters: &FilterConfig) -> bool {
    match rejection_reason(url, base_domain, filters) {
        Some(reason) => {
            tracing::debug!("Rejected URL ({}): {}", reason, url);
            false
        }
        None => true,
    }
}

fn rejection_reason(url: &str, base_domain: &str, filters: &FilterConfig) -> Option<String> {
    if url.len() > MAX_URL_LENGTH {
        return Some("too long".to_string());
    }

    if url.contains(FORBIDDEN_CHARS) {
        return Some("forbidden characters".to_string());
    }

    if url.matches("://").count() > 1 {
        return Some("repeated scheme separator".to_string());
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => return Some(format!("unparseable: {}", e)),
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Some(format!("invalid scheme {}", parsed.scheme()));
    }

    let Some(netloc) = extract_netloc(&parsed) else {
        return Some("missing host".to_string());
    };
    if !filters.follow_external_links && !netloc.eq_ignore_ascii_case(base_domain) {
        return Some("external domain".to_string());
    }

    let host = extract_domain(&parsed).unwrap_or_default();
    if count_occurrences(url, &host) > 2 {
        return Some("domain repeated".to_string());
    }

    let path = parsed.path().to_lowercase();
    if path.contains("//") {
        return Some("double slash in path".to_string());
    }

    if let Some(ext) = filters
        .blocked_extensions
        .iter()
        .find(|ext| !ext.is_empty() && path.ends_with(&ext.to_lowercase()))
    {
        return Some(format!("blocked extension {}", ext));
    }

    if !filters.allowed_extensions.is_empty() {
        let last_segment = path.rsplit('/').next().unwrap_or("");
        let has_allowed_ext = filters
            .allowed_extensions
            .iter()
            .any(|ext| !ext.is_empty() && path.ends_with(&ext.to_lowercase()));
        if last_segment.contains('.') && !has_allowed_ext {
            return Some("extension not allowed".to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters() -> FilterConfig {
        FilterConfig::default()
    }

    #[test]
    fn test_accepts_internal_pages() {
        let f = filters();
        assert!(is_valid_url("https://a.com/", "a.com", &f));
        assert!(is_valid_url("https://a.com/menu", "a.com", &f));
        assert!(is_valid_url("https://a.com/menu.html", "a.com", &f));
        assert!(is_valid_url("https://a.com/shop.php?id=4", "a.com", &f));
    }

    #[test]
    fn test_rejects_schemes() {
        let f = filters();
        assert!(!is_valid_url("ftp://a.com/file", "a.com", &f));
        assert!(!is_valid_url("mailto:hello@a.com", "a.com", &f));
        assert!(!is_valid_url("javascript:void(0)", "a.com", &f));
    }

    #[test]
    fn test_external_domains() {
        let mut f = filters();
        assert!(!is_valid_url("https://other.com/menu", "a.com", &f));
        assert!(!is_valid_url("https://www.a.com/menu", "a.com", &f));

        f.follow_external_links = true;
        assert!(is_valid_url("https://other.com/menu", "a.com", &f));
    }

    #[test]
    fn test_port_is_part_of_domain() {
        let f = filters();
        assert!(is_valid_url("http://127.0.0.1:8080/menu", "127.0.0.1:8080", &f));
        assert!(!is_valid_url("http://127.0.0.1:9090/menu", "127.0.0.1:8080", &f));
    }

    #[test]
    fn test_rejects_malformed() {
        let f = filters();
        assert!(!is_valid_url("https://a.com/x/https://a.com/y", "a.com", &f));
        assert!(!is_valid_url("https://a.com/a.com/a.com", "a.com", &f));
        assert!(!is_valid_url("https://a.com/menu//beans", "a.com", &f));
        assert!(!is_valid_url("https://a.com/{id}", "a.com", &f));
        assert!(!is_valid_url("https://a.com/a|b", "a.com", &f));

        let long = format!("https://a.com/{}", "x".repeat(2001));
        assert!(!is_valid_url(&long, "a.com", &f));
    }

    #[test]
    fn test_blocked_extensions() {
        let f = filters();
        assert!(!is_valid_url("https://a.com/menu.pdf", "a.com", &f));
        assert!(!is_valid_url("https://a.com/logo.PNG", "a.com", &f));
        assert!(!is_valid_url("https://a.com/app.js", "a.com", &f));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let f = filters();
        assert!(!is_valid_url("https://a.com/archive.tar", "a.com", &f));
        assert!(is_valid_url("https://a.com/v1.2/menu", "a.com", &f));
    }

    #[test]
    fn test_blocked_wins_over_allowed() {
        let mut f = filters();
        f.allowed_extensions.insert(".pdf".to_string());
        assert!(!is_valid_url("https://a.com/menu.pdf", "a.com", &f));
    }

    #[test]
    fn test_empty_allowed_set_admits_any_extension() {
        let mut f = filters();
        f.allowed_extensions.clear();
        assert!(is_valid_url("https://a.com/archive.tar", "a.com", &f));
    }
}
