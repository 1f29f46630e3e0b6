use leadgen_fetch::normalize_host;

/// Hosts whose pages are never mined for contacts: directories, social
/// networks and the search engine itself.
///
/// An entry matches the domain itself and every subdomain of it.
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    denied: Vec<String>,
}

impl DomainFilter {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let denied = domains
            .into_iter()
            .map(|d| normalize_host(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();
        Self { denied }
    }

    #[must_use]
    pub fn with_domain(mut self, domain: &str) -> Self {
        let domain = normalize_host(domain);
        if !domain.is_empty() && !self.denied.contains(&domain) {
            self.denied.push(domain);
        }
        self
    }

    pub fn is_denied(&self, host: &str) -> bool {
        let host = normalize_host(host);
        self.denied.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}
