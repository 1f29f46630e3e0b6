use url::Url;

/// Canonical rate-limiter key for a hostname.
///
/// Lowercases, drops a trailing dot and a leading `www.` so that every page
/// of one site shares a single throttle.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}

/// Rate-limiter key for a parsed URL, if it has a host.
pub fn host_key(url: &Url) -> Option<String> {
    url.host_str().map(normalize_host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_key() {
        let url = Url::parse("https://Example.com/path").unwrap();
        assert_eq!(host_key(&url).as_deref(), Some("example.com"));

        let url = Url::parse("http://subdomain.example.com:8080/path").unwrap();
        assert_eq!(host_key(&url).as_deref(), Some("subdomain.example.com"));
    }

    #[test]
    fn test_www_shares_key_with_apex() {
        assert_eq!(normalize_host("www.acme-plumbing.com"), "acme-plumbing.com");
        assert_eq!(normalize_host("acme-plumbing.com."), "acme-plumbing.com");
        assert_eq!(normalize_host("www."), "www");
    }

    #[test]
    fn test_host_key_missing() {
        let url = Url::parse("mailto:info@example.com").unwrap();
        assert!(host_key(&url).is_none());
    }
}
