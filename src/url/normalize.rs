use crate::{UrlError, UrlResult};
use std::collections::HashSet;
use url::Url;

/// Normalizes a URL so that equivalent references deduplicate to one form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Remove fragment (everything after #)
/// 3. Keep only the first value of each query parameter
/// 4. Sort remaining query parameters by key
/// 5. Remove empty query string (trailing ?)
/// 6. Remove trailing slash from the path unless the path is exactly `/`
///
/// # Examples
///
/// ```
/// use brewcrawl::url::normalize_url;
///
/// let url = normalize_url("https://example.com/menu/?b=2&a=1&b=3#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/menu?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = first_value_per_key_sorted(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}

/// Collects query parameters keeping the first value seen for each key,
/// sorted lexicographically by key
fn first_value_per_key_sorted(url: &Url) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| seen.insert(key.to_string()))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

/// Normalizes a URL when normalization is enabled, otherwise returns it as-is
///
/// URLs that fail to normalize are passed through untouched; validation
/// decides whether they are crawlable.
pub fn canonicalize(url: &str, normalize: bool) -> String {
    if !normalize {
        return url.to_string();
    }
    match normalize_url(url) {
        Ok(normalized) => normalized.to_string(),
        Err(e) => {
            tracing::debug!("Failed to normalize URL {}: {}", url, e);
            url.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.com/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_first_value_per_key() {
        let result = normalize_url("https://example.com/page?roast=dark&roast=light").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?roast=dark");
    }

    #[test]
    fn test_empty_query_removed() {
        let result = normalize_url("https://example.com/page?").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_scheme_preserved() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_lowercase_domain() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_url("https://example.com/a/?z=1&y=2#x").unwrap();
        let twice = normalize_url(once.as_str()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_canonicalize_toggle() {
        assert_eq!(
            canonicalize("https://example.com/page/#x", true),
            "https://example.com/page"
        );
        assert_eq!(
            canonicalize("https://example.com/page/#x", false),
            "https://example.com/page/#x"
        );
        assert_eq!(canonicalize("mailto:a@b.c", true), "mailto:a@b.c");
    }
}
