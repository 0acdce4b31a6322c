//! Source-domain eligibility policy
//!
//! Decides which image sources may be routed through the proxy:
//! - Relative URLs are always local content and always eligible.
//! - With no allow-list, absolute URLs must point at the hosting site
//!   itself.
//! - With an allow-list, absolute URLs must match an entry; entries may
//!   contain `*` wildcards (each `*` matches any substring, the whole
//!   host must match, comparison is case-insensitive).
//!
//! A missing or unparseable host fails closed: the tag is left alone
//! rather than proxied.

use regex::Regex;
use tracing::warn;
use url::Url;

/// One compiled allow-list entry
#[derive(Debug, Clone)]
enum AllowRule {
    /// Exact host, stored lowercased
    Exact(String),
    /// Wildcard pattern compiled to an anchored case-insensitive regex
    Wildcard(Regex),
}

/// Compiled domain policy for one configuration snapshot
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    rules: Vec<AllowRule>,
    site_host: Option<String>,
}

impl DomainPolicy {
    pub fn new(entries: &[&str], site_host: Option<String>) -> Self {
        let mut rules = Vec::with_capacity(entries.len());

        for entry in entries {
            if entry.contains('*') {
                match compile_wildcard(entry) {
                    Ok(re) => rules.push(AllowRule::Wildcard(re)),
                    Err(err) => {
                        warn!(pattern = %entry, error = %err, "ignoring unusable allow-list entry");
                    }
                }
            } else {
                rules.push(AllowRule::Exact(entry.to_ascii_lowercase()));
            }
        }

        Self { rules, site_host }
    }

    /// Whether `src` may be rewritten to a proxy URL
    pub fn permits(&self, src: &str) -> bool {
        // Relative URLs (including protocol-relative ones) are served by
        // the site itself and are always eligible
        if !is_absolute_http(src) {
            return true;
        }

        let host = match host_of(src) {
            Some(host) => host,
            None => return false, // absolute but hostless: fail closed
        };

        if self.rules.is_empty() {
            return self.site_host.as_deref() == Some(host.as_str());
        }

        self.rules.iter().any(|rule| match rule {
            AllowRule::Exact(allowed) => *allowed == host,
            AllowRule::Wildcard(re) => re.is_match(&host),
        })
    }
}

/// Compile a `*`-wildcard host pattern into an anchored regex
///
/// Every literal part is escaped; each `*` becomes `.*`. Multiple
/// wildcards are allowed and only full-host matches count.
fn compile_wildcard(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Regex::new(&format!("(?i)^{}$", escaped.join(".*")))
}

/// Whether `src` is an absolute http(s) URL
pub fn is_absolute_http(src: &str) -> bool {
    let lower = src.trim_start();
    let lower = lower.get(..8).unwrap_or(lower).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Host component of a URL, lowercased; `None` when unparseable
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(entries: &[&str], site: Option<&str>) -> DomainPolicy {
        DomainPolicy::new(entries, site.map(str::to_string))
    }

    #[test]
    fn test_relative_urls_always_eligible() {
        let strict = policy(&[], None);
        assert!(strict.permits("/images/a.jpg"));
        assert!(strict.permits("images/a.jpg"));

        let listed = policy(&["cdn.example.com"], None);
        assert!(listed.permits("/images/a.jpg"));
    }

    #[test]
    fn test_same_site_rule_without_allow_list() {
        let p = policy(&[], Some("blog.example.com"));
        assert!(p.permits("https://blog.example.com/a.jpg"));
        assert!(p.permits("https://BLOG.example.com/a.jpg"));
        assert!(!p.permits("https://other.example.com/a.jpg"));
    }

    #[test]
    fn test_no_allow_list_and_no_site_host_fails_closed() {
        let p = policy(&[], None);
        assert!(!p.permits("https://anything.example.com/a.jpg"));
    }

    #[test]
    fn test_exact_entry_is_case_insensitive() {
        let p = policy(&["CDN.Example.com"], None);
        assert!(p.permits("https://cdn.example.com/a.jpg"));
        assert!(!p.permits("https://cdn2.example.com/a.jpg"));
    }

    #[test]
    fn test_wildcard_matches_subdomains() {
        let p = policy(&["*.example.com"], None);
        assert!(p.permits("https://img.cdn.example.com/a.jpg"));
        assert!(p.permits("https://a.example.com/a.jpg"));
        assert!(!p.permits("https://evil-example.com/a.jpg"));
        assert!(!p.permits("https://example.com.evil.net/a.jpg"));
    }

    #[test]
    fn test_wildcard_is_substring_not_single_label() {
        // Full-string anchored regex with .* per wildcard, by design
        let p = policy(&["img*.cloudfront.net"], None);
        assert!(p.permits("https://img-123.eu.cloudfront.net/a.jpg"));
        assert!(!p.permits("https://cdn.cloudfront.net/a.jpg"));
    }

    #[test]
    fn test_multiple_wildcards_in_one_entry() {
        let p = policy(&["*.media.*.example.org"], None);
        assert!(p.permits("https://eu.media.prod.example.org/a.jpg"));
        assert!(!p.permits("https://media.example.org/a.jpg"));
    }

    #[test]
    fn test_allow_list_overrides_same_site_for_absolute_urls() {
        let p = policy(&["cdn.example.com"], Some("blog.example.com"));
        assert!(p.permits("https://cdn.example.com/a.jpg"));
        // Same-site host is not implicitly allowed once a list exists
        assert!(!p.permits("https://blog.example.com/a.jpg"));
    }

    #[test]
    fn test_is_absolute_http() {
        assert!(is_absolute_http("https://a.test/x"));
        assert!(is_absolute_http("HTTP://a.test/x"));
        assert!(!is_absolute_http("//a.test/x"));
        assert!(!is_absolute_http("/x.jpg"));
        assert!(!is_absolute_http("ftp://a.test/x"));
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://A.Test/x").as_deref(), Some("a.test"));
        assert_eq!(host_of("/relative.jpg"), None);
        assert_eq!(host_of("data:image/png;base64,AAAA"), None);
    }
}
