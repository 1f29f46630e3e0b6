//! Contact extraction from business pages.
//!
//! Emails and phone numbers are pulled from the visible text of the page and
//! from `mailto:` / `tel:` links. Script, style and template content is never
//! scanned.

use crate::contact::Contact;
use leadgen_core::ExtractionConfig;
use regex::Regex;
use scraper::node::Node;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Elements whose text content is not visible to a reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Top-level domains that are really file extensions (`logo@2x.png`).
const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico", "css", "js",
];

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,24}\b")
            .expect("valid regex")
    })
}

fn phone_regex() -> &'static Regex {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    PHONE_REGEX.get_or_init(|| {
        Regex::new(r"(?:\+?1[\s.-]?)?(?:\(\d{3}\)\s?|\d{3}[\s.-]?)\d{3}[\s.-]?\d{4}")
            .expect("valid regex")
    })
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Extracts a [`Contact`] from page HTML.
#[derive(Debug, Clone)]
pub struct ContactExtractor {
    max_name_len: usize,
    link_selector: Selector,
    title_selector: Selector,
}

impl ContactExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            max_name_len: config.max_business_name_len,
            link_selector: selector("a[href]"),
            title_selector: selector("title"),
        }
    }

    /// Extract contact details from `html`. Never fails; a page without
    /// anything recognisable yields an empty contact.
    pub fn extract(&self, html: &str, source_url: &str) -> Contact {
        let document = Html::parse_document(html);
        let mut contact = Contact::new(source_url);

        let text = visible_text(&document);
        contact.emails.extend(find_emails(&text));
        contact.phones.extend(find_phones(&text));

        for link in document.select(&self.link_selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if let Some(address) = strip_scheme(href, "mailto:") {
                let address = address.split('?').next().unwrap_or_default().trim();
                if is_whole_email(address) {
                    contact.emails.insert(address.to_lowercase());
                }
            } else if let Some(number) = strip_scheme(href, "tel:") {
                if let Some(phone) = normalize_phone(number) {
                    contact.phones.insert(phone);
                }
            }
        }

        contact.business_name = self.business_name(&document);
        contact
    }

    /// Collapse whitespace and cap the length of a business name.
    pub fn clean_business_name(&self, raw: &str) -> Option<String> {
        let name = collapse_whitespace(raw);
        (!name.is_empty()).then(|| truncate_chars(&name, self.max_name_len))
    }

    fn business_name(&self, document: &Html) -> Option<String> {
        let title = document.select(&self.title_selector).next()?;
        self.clean_business_name(&title.text().collect::<String>())
    }
}

impl Default for ContactExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

/// Concatenated text of every node not nested in a hidden element.
fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.tree.root().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    text
}

fn strip_scheme<'a>(href: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = href.get(..scheme.len())?;
    prefix
        .eq_ignore_ascii_case(scheme)
        .then(|| &href[scheme.len()..])
}

fn is_whole_email(candidate: &str) -> bool {
    email_regex()
        .find(candidate)
        .is_some_and(|m| m.start() == 0 && m.end() == candidate.len())
        && !has_asset_extension(candidate)
}

fn has_asset_extension(email: &str) -> bool {
    email
        .rsplit('.')
        .next()
        .is_some_and(|tld| ASSET_EXTENSIONS.contains(&tld.to_ascii_lowercase().as_str()))
}

/// Find lowercased email addresses in free text.
pub fn find_emails(text: &str) -> Vec<String> {
    email_regex()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|email| !has_asset_extension(email))
        .map(str::to_lowercase)
        .collect()
}

/// Find North American phone numbers in free text, in canonical ten-digit form.
pub fn find_phones(text: &str) -> Vec<String> {
    phone_regex()
        .find_iter(text)
        .filter(|m| {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
        })
        .filter_map(|m| normalize_phone(m.as_str()))
        .collect()
}

/// Reduce a phone number to its ten NANP digits.
///
/// A leading country code `1` is dropped. Area code and exchange must both
/// start with 2-9; anything else is rejected.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = match digits.len() {
        10 => digits,
        11 if digits.starts_with('1') => digits[1..].to_string(),
        _ => return None,
    };

    let bytes = digits.as_bytes();
    let valid_lead = |b: u8| (b'2'..=b'9').contains(&b);
    (valid_lead(bytes[0]) && valid_lead(bytes[3])).then_some(digits)
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(raw: &str, max: usize) -> String {
    match raw.char_indices().nth(max) {
        Some((idx, _)) => raw[..idx].trim_end().to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Contact {
        ContactExtractor::default().extract(html, "https://acme.example/contact")
    }

    #[test]
    fn test_extracts_email_phone_and_title() {
        let contact = extract(
            r#"<html><head><title>  Acme   Plumbing </title></head>
            <body><p>Call us at (617) 555-0142 or write to Info@AcmePlumbing.com.</p></body></html>"#,
        );

        assert_eq!(contact.source_url, "https://acme.example/contact");
        assert!(contact.emails.contains("info@acmeplumbing.com"));
        assert!(contact.phones.contains("6175550142"));
        assert_eq!(contact.business_name.as_deref(), Some("Acme Plumbing"));
    }

    #[test]
    fn test_ignores_script_and_style() {
        let contact = extract(
            r#"<html><body>
            <script>var support = "hidden@tracker.example"; var tel = "617-555-0199";</script>
            <style>.x { content: "style@css.example"; }</style>
            <p>nothing to see</p></body></html>"#,
        );

        assert!(contact.is_empty(), "got {contact:?}");
    }

    #[test]
    fn test_reads_mailto_and_tel_links() {
        let contact = extract(
            r#"<a href="MAILTO:Sales@Acme.Example?subject=Quote">Email us</a>
               <a href="tel:+1-617-555-0142">Call</a>
               <a href="mailto:not-an-address">broken</a>"#,
        );

        assert_eq!(
            contact.emails.iter().collect::<Vec<_>>(),
            vec!["sales@acme.example"]
        );
        assert!(contact.phones.contains("6175550142"));
    }

    #[test]
    fn test_asset_names_are_not_emails() {
        let emails = find_emails("logo@2x.png banner@3x.JPG contact@acme.com");
        assert_eq!(emails, vec!["contact@acme.com"]);
    }

    #[test]
    fn test_phone_formats_share_canonical_form() {
        for raw in [
            "(617) 555-0142",
            "617-555-0142",
            "617.555.0142",
            "617 555 0142",
            "6175550142",
            "+1 617 555 0142",
            "1-617-555-0142",
        ] {
            assert_eq!(find_phones(raw), vec!["6175550142"], "input: {raw}");
        }
    }

    #[test]
    fn test_phone_rejects_invalid_numbers() {
        // Area code starting with 1 and exchange starting with 0
        assert!(find_phones("call 123-555-0142").is_empty());
        assert!(find_phones("call 617-055-0142").is_empty());
        // Part of a longer digit run, like an order number
        assert!(find_phones("order 98761755501423").is_empty());
    }

    #[test]
    fn test_business_name_is_truncated() {
        let long_title = "A".repeat(200);
        let contact = extract(&format!(
            "<title>{long_title}</title><p>info@acme.example</p>"
        ));
        assert_eq!(contact.business_name.map(|n| n.chars().count()), Some(120));
    }

    #[test]
    fn test_blank_title_is_no_name() {
        let contact = extract("<title>   </title><h1>Beacon Hill Electric</h1><p>617-555-0177</p>");
        assert!(contact.business_name.is_none());
        assert!(contact.phones.contains("6175550177"));
    }

    #[test]
    fn test_page_without_contacts() {
        let contact = extract("<html><body><p>Welcome!</p></body></html>");
        assert!(contact.is_empty());
        assert!(contact.business_name.is_none());
    }
}
