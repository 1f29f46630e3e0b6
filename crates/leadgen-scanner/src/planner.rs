//! Search query planning and candidate extraction.
//!
//! [`SearchPlanner`] yields result-page URLs for a (query, location) pair.
//! [`CandidateParser`] turns a fetched result page into the business pages
//! worth mining.

use crate::filter::DomainFilter;
use leadgen_core::SearchConfig;
use leadgen_fetch::host_key;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::{form_urlencoded, Url};

/// One search-result page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    /// Zero-based page number.
    pub index: u32,
    pub url: String,
}

/// Lazy, finite sequence of search-result page URLs.
#[derive(Debug, Clone)]
pub struct SearchPlanner {
    template: String,
    query: String,
    location: String,
    target_count: u32,
    per_page: u32,
    max_pages: u32,
    next_index: u32,
}

impl SearchPlanner {
    pub fn new(config: &SearchConfig, query: &str, location: &str, target_count: u32) -> Self {
        Self {
            template: config.url_template.clone(),
            query: encode_term(query),
            location: encode_term(location),
            target_count,
            per_page: config.results_per_page.max(1),
            max_pages: config.max_pages,
            next_index: 0,
        }
    }

    /// Restart the sequence at page `index`.
    #[must_use]
    pub fn starting_at(mut self, index: u32) -> Self {
        self.next_index = index;
        self
    }

    /// Next page to fetch, or `None` once `max_pages` have been issued.
    pub fn next_page(&mut self) -> Option<SearchPage> {
        if self.is_exhausted() {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(SearchPage {
            index,
            url: self.page_url(index),
        })
    }

    pub fn page_url(&self, index: u32) -> String {
        let start = index.saturating_mul(self.per_page);
        self.template
            .replace("{query}", &self.query)
            .replace("{location}", &self.location)
            .replace("{start}", &start.to_string())
            .replace("{num}", &self.per_page.to_string())
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_index >= self.max_pages
    }

    pub fn pages_issued(&self) -> u32 {
        self.next_index
    }

    /// Pages needed if every result on them turned into a distinct contact.
    pub fn minimum_pages(&self) -> u32 {
        self.target_count.div_ceil(self.per_page)
    }

    /// Host of the search engine, always excluded from candidates.
    pub fn search_host(&self) -> Option<String> {
        Url::parse(&self.page_url(0))
            .ok()
            .as_ref()
            .and_then(host_key)
    }
}

impl Iterator for SearchPlanner {
    type Item = SearchPage;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_page()
    }
}

fn encode_term(term: &str) -> String {
    form_urlencoded::byte_serialize(term.as_bytes()).collect()
}

/// A business page found on a search-result page, not yet fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

/// Parses search-result markup into [`Candidate`]s.
#[derive(Debug, Clone)]
pub struct CandidateParser {
    result_selector: Option<Selector>,
    title_selector: Option<Selector>,
    snippet_selector: Option<Selector>,
    anchor_selector: Selector,
    filter: DomainFilter,
}

impl CandidateParser {
    pub fn new(config: &SearchConfig, search_host: Option<&str>) -> Self {
        let mut filter = DomainFilter::new(&config.denylist);
        if let Some(host) = search_host {
            filter = filter.with_domain(host);
        }

        Self {
            result_selector: parse_selector(&config.result_selector),
            title_selector: parse_selector(&config.title_selector),
            snippet_selector: parse_selector(&config.snippet_selector),
            anchor_selector: Selector::parse("a[href]").expect("valid selector"),
            filter,
        }
    }

    /// Extract candidates from a result page fetched from `page_url`.
    ///
    /// Results come back in page order without duplicates. Markup that
    /// matches nothing yields an empty list.
    pub fn parse(&self, html: &str, page_url: &str) -> Vec<Candidate> {
        let Ok(base) = Url::parse(page_url) else {
            tracing::warn!("Cannot parse candidates: invalid page URL '{}'", page_url);
            return Vec::new();
        };
        let document = Html::parse_document(html);

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |candidate: Option<Candidate>| {
            if let Some(candidate) = candidate {
                if seen.insert(candidate.url.clone()) {
                    candidates.push(candidate);
                }
            }
        };

        let blocks: Vec<ElementRef<'_>> = self
            .result_selector
            .as_ref()
            .map(|sel| document.select(sel).collect())
            .unwrap_or_default();

        if blocks.is_empty() {
            for anchor in document.select(&self.anchor_selector) {
                push(self.candidate_from_anchor(anchor, &base));
            }
        } else {
            for block in blocks {
                push(self.candidate_from_block(block, &base));
            }
        }

        candidates
    }

    fn candidate_from_block(&self, block: ElementRef<'_>, base: &Url) -> Option<Candidate> {
        let anchor = block.select(&self.anchor_selector).next()?;
        let url = self.resolve(anchor.value().attr("href")?, base)?;
        Some(Candidate {
            url,
            title: self
                .title_selector
                .as_ref()
                .and_then(|sel| first_text(block, sel)),
            snippet: self
                .snippet_selector
                .as_ref()
                .and_then(|sel| first_text(block, sel)),
        })
    }

    fn candidate_from_anchor(&self, anchor: ElementRef<'_>, base: &Url) -> Option<Candidate> {
        let url = self.resolve(anchor.value().attr("href")?, base)?;
        let title = collapse(&anchor.text().collect::<String>());
        Some(Candidate {
            url,
            title,
            snippet: None,
        })
    }

    /// Turn an href into a minable absolute URL, or `None` if it points at
    /// the search engine, a denied domain or a non-web scheme.
    fn resolve(&self, href: &str, base: &Url) -> Option<String> {
        let mut url = base.join(href.trim()).ok()?;

        // `/url?q=<target>` redirect wrappers
        if url.path() == "/url" && host_key(&url) == host_key(base) {
            let target = url
                .query_pairs()
                .find(|(key, _)| key == "q" || key == "url")
                .map(|(_, value)| value.into_owned())?;
            url = Url::parse(&target).ok()?;
        }

        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = host_key(&url)?;
        if self.filter.is_denied(&host) {
            return None;
        }

        url.set_fragment(None);
        Some(url.to_string())
    }
}

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Ignoring invalid selector '{}': {}", css, e);
            None
        }
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|el| collapse(&el.text().collect::<String>()))
}

fn collapse(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://www.google.com/search?q=plumbers+boston&start=0&num=10";

    fn parser() -> CandidateParser {
        let config = SearchConfig::default();
        let planner = SearchPlanner::new(&config, "plumbers", "boston", 20);
        CandidateParser::new(&config, planner.search_host().as_deref())
    }

    #[test]
    fn test_page_urls_paginate() {
        let config = SearchConfig::default();
        let mut planner = SearchPlanner::new(&config, "plumbers", "boston", 20);

        let first = planner.next_page().expect("first page");
        assert_eq!(first.index, 0);
        assert_eq!(
            first.url,
            "https://www.google.com/search?q=plumbers+boston&start=0&num=10"
        );
        let second = planner.next_page().expect("second page");
        assert!(second.url.contains("&start=10&"));
        assert_eq!(planner.minimum_pages(), 2);
    }

    #[test]
    fn test_terms_are_encoded() {
        let config = SearchConfig::default();
        let planner = SearchPlanner::new(&config, "hvac & heating", "new york", 10);
        assert_eq!(
            planner.page_url(0),
            "https://www.google.com/search?q=hvac+%26+heating+new+york&start=0&num=10"
        );
    }

    #[test]
    fn test_planner_stops_at_max_pages() {
        let config = SearchConfig {
            max_pages: 3,
            ..SearchConfig::default()
        };
        let planner = SearchPlanner::new(&config, "plumbers", "boston", 100);
        let indices: Vec<u32> = planner.map(|page| page.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_planner_restarts_from_page() {
        let config = SearchConfig::default();
        let mut planner = SearchPlanner::new(&config, "plumbers", "boston", 100).starting_at(4);
        let page = planner.next_page().expect("page 4");
        assert_eq!(page.index, 4);
        assert!(page.url.contains("&start=40&"));
        assert_eq!(planner.pages_issued(), 5);
    }

    #[test]
    fn test_search_host() {
        let planner = SearchPlanner::new(&SearchConfig::default(), "plumbers", "boston", 10);
        assert_eq!(planner.search_host().as_deref(), Some("google.com"));
    }

    #[test]
    fn test_parses_result_blocks() {
        let html = r#"
            <div id="search">
              <div class="g">
                <a href="https://acmeplumbing.example/contact#top"><h3>Acme   Plumbing</h3></a>
                <div class="VwiC3b">24/7 emergency service in Boston</div>
              </div>
              <div class="g">
                <a href="/url?q=https://beaconhill.example/&amp;sa=U"><h3>Beacon Hill Plumbing</h3></a>
              </div>
              <div class="g">
                <a href="https://www.yelp.com/biz/some-plumber"><h3>Yelp listing</h3></a>
              </div>
              <div class="g">
                <a href="https://acmeplumbing.example/contact"><h3>Acme again</h3></a>
              </div>
            </div>"#;

        let candidates = parser().parse(html, PAGE_URL);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "https://acmeplumbing.example/contact");
        assert_eq!(candidates[0].title.as_deref(), Some("Acme Plumbing"));
        assert_eq!(
            candidates[0].snippet.as_deref(),
            Some("24/7 emergency service in Boston")
        );
        assert_eq!(candidates[1].url, "https://beaconhill.example/");
        assert!(candidates[1].snippet.is_none());
    }

    #[test]
    fn test_falls_back_to_anchors() {
        let html = r#"
            <a href="/preferences">Settings</a>
            <a href="https://maps.google.com/?q=plumbers">Maps</a>
            <a href="javascript:void(0)">Nothing</a>
            <a href="https://northend-plumbing.example/">North End Plumbing</a>"#;

        let candidates = parser().parse(html, PAGE_URL);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://northend-plumbing.example/");
        assert_eq!(candidates[0].title.as_deref(), Some("North End Plumbing"));
    }

    #[test]
    fn test_malformed_page_yields_nothing() {
        assert!(parser().parse("<<<not html", PAGE_URL).is_empty());
        assert!(parser().parse("", PAGE_URL).is_empty());
    }
}
