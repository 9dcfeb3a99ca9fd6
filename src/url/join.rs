use crate::url::domain::extract_netloc;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// First path segment shaped like `name.tld` or `name.tld:port`
static DOMAIN_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}(:\d+)?$")
        .expect("hardcoded regex pattern is valid")
});

/// Resolves a link candidate against the page it was found on, repairing
/// common malformations along the way
///
/// The base domain only counts where it stands as a whole host: preceded by
/// the start, `/` or `.`, and followed by the end, `/`, `:`, `?` or `#`.
/// `coffeebean.com` therefore never matches `bean.com`.
///
/// Cases are evaluated in order:
///
/// 1. Absolute `http(s)://` candidates are returned unchanged
/// 2. Protocol-relative `//host/...` gets the base scheme
/// 3. A bare domain (`www.site.com/x`, `site.com/x`) containing the base
///    domain exactly once gets the base scheme
/// 4. A candidate repeating the base domain keeps only what follows the last
///    occurrence: `www.a.com/x/www.a.com/x/y` becomes `https://a.com/x/y`
/// 5. A candidate whose path contains the base domain once is rebuilt from
///    that occurrence onward
/// 6. Fragment-only and query-only candidates are appended to the base verbatim
/// 7. Anything else is resolved relative to the base, then repaired as in
///    case 4 if the result repeats the domain
///
/// Returns `None` for empty input or when the base cannot be parsed.
///
/// # Examples
///
/// ```
/// use brewcrawl::url::smart_join;
///
/// assert_eq!(
///     smart_join("https://a.com", "www.a.com/x/www.a.com/x/y").as_deref(),
///     Some("https://a.com/x/y")
/// );
/// assert_eq!(
///     smart_join("https://a.com/p", "#section").as_deref(),
///     Some("https://a.com/p#section")
/// );
/// ```
pub fn smart_join(base_url: &str, candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    if has_http_scheme(candidate) {
        return Some(candidate.to_string());
    }

    let base = Url::parse(base_url).ok()?;
    let scheme = base.scheme();
    let domain = extract_netloc(&base)?;

    if candidate.starts_with("//") {
        return Some(format!("{}:{}", scheme, candidate));
    }

    let occurrences = domain_positions(candidate, &domain).len();

    if occurrences == 1 && looks_like_bare_domain(candidate, &domain) {
        return Some(format!("{}://{}", scheme, candidate));
    }

    if occurrences > 1 {
        return Some(rebuild_after_last(scheme, &domain, candidate));
    }

    if occurrences == 1 && domain_in_path(candidate, &domain) {
        return Some(rebuild_after_last(scheme, &domain, candidate));
    }

    if candidate.starts_with('#') || candidate.starts_with('?') {
        return Some(format!("{}{}", base_url, candidate));
    }

    let resolved = base.join(candidate).ok()?;
    if !domain_positions(resolved.path(), &domain).is_empty() {
        tracing::debug!("Repairing duplicated domain in resolved URL {}", resolved);
        let mut repaired = rebuild_after_last(scheme, &domain, resolved.path());
        if let Some(query) = resolved.query() {
            repaired.push('?');
            repaired.push_str(query);
        }
        if let Some(fragment) = resolved.fragment() {
            repaired.push('#');
            repaired.push_str(fragment);
        }
        return Some(repaired);
    }

    Some(resolved.to_string())
}

fn has_http_scheme(candidate: &str) -> bool {
    let lower = candidate.get(..8).unwrap_or(candidate).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Returns true if the candidate starts like a host rather than a path
fn looks_like_bare_domain(candidate: &str, domain: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    if lower.starts_with("www.") || lower.starts_with(&domain.to_ascii_lowercase()) {
        return true;
    }

    let first_segment = candidate.split(['/', '?', '#']).next().unwrap_or("");
    DOMAIN_SEGMENT.is_match(first_segment)
}

/// Returns true if the only domain occurrence sits before any query or fragment
fn domain_in_path(candidate: &str, domain: &str) -> bool {
    let path_end = candidate.find(['?', '#']).unwrap_or(candidate.len());
    domain_positions(&candidate[..path_end], domain).len() == 1
}

/// Byte offsets where `domain` appears on host boundaries, ignoring ASCII case
fn domain_positions(haystack: &str, domain: &str) -> Vec<usize> {
    if domain.is_empty() {
        return Vec::new();
    }
    let lower = haystack.to_ascii_lowercase();
    let needle = domain.to_ascii_lowercase();
    lower
        .match_indices(&needle)
        .map(|(idx, _)| idx)
        .filter(|&idx| {
            let starts_host = lower[..idx]
                .chars()
                .next_back()
                .map_or(true, |c| c == '/' || c == '.');
            let ends_host = lower[idx + needle.len()..]
                .chars()
                .next()
                .map_or(true, |c| matches!(c, '/' | ':' | '?' | '#'));
            starts_host && ends_host
        })
        .collect()
}

/// Rebuilds `scheme://domain` plus whatever follows the last domain occurrence
fn rebuild_after_last(scheme: &str, domain: &str, candidate: &str) -> String {
    let remainder = match domain_positions(candidate, domain).last() {
        Some(&idx) => &candidate[idx + domain.len()..],
        None => candidate,
    };

    if remainder.is_empty() {
        format!("{}://{}/", scheme, domain)
    } else if remainder.starts_with(['/', '?', '#']) {
        format!("{}://{}{}", scheme, domain, remainder)
    } else {
        format!("{}://{}/{}", scheme, domain, remainder)
    }
}
