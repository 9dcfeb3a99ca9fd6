use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use brewcrawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the network location (host plus any explicit port) from a URL
///
/// Default ports are already dropped by the URL parser, so
/// `https://example.com:443/` yields `example.com`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use brewcrawl::url::extract_netloc;
///
/// let url = Url::parse("http://127.0.0.1:8080/menu").unwrap();
/// assert_eq!(extract_netloc(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_netloc(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Parses a URL string and returns its network location
pub fn netloc_of(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(extract_netloc)
}

/// Counts non-overlapping occurrences of `needle` in `haystack`, ignoring ASCII case
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack
        .to_ascii_lowercase()
        .matches(&needle.to_ascii_lowercase())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
        assert_eq!(extract_netloc(&url), Some("example.com:8080".to_string()));
    }

    #[test]
    fn test_netloc_drops_default_port() {
        let url = Url::parse("https://example.com:443/page").unwrap();
        assert_eq!(extract_netloc(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_netloc(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_netloc_of_invalid() {
        assert_eq!(netloc_of("not a url"), None);
        assert_eq!(
            netloc_of("https://cafe.example/beans"),
            Some("cafe.example".to_string())
        );
    }

    #[test]
    fn test_count_occurrences() {
        assert_eq!(count_occurrences("www.a.com/x/www.a.com/x/y", "a.com"), 2);
        assert_eq!(count_occurrences("https://A.COM/x", "a.com"), 1);
        assert_eq!(count_occurrences("/menu", "a.com"), 0);
        assert_eq!(count_occurrences("/menu", ""), 0);
    }
}
