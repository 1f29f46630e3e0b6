use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Contact details mined from one business page.
///
/// Emails are lowercased and phones are stored as their ten canonical
/// digits, so two contacts share an identity exactly when they have an
/// email or phone string in common.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub source_url: String,
    pub emails: BTreeSet<String>,
    pub phones: BTreeSet<String>,
    pub business_name: Option<String>,
}

impl Contact {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            emails: BTreeSet::new(),
            phones: BTreeSet::new(),
            business_name: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.insert(email.into().to_lowercase());
        self
    }

    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phones.insert(phone.into());
        self
    }

    #[must_use]
    pub fn with_business_name(mut self, name: impl Into<String>) -> Self {
        self.business_name = Some(name.into());
        self
    }

    /// A contact without any email or phone is never stored.
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty()
    }

    pub fn shares_identity_with(&self, other: &Contact) -> bool {
        !self.emails.is_disjoint(&other.emails) || !self.phones.is_disjoint(&other.phones)
    }

    /// Fold `other` into this contact.
    ///
    /// Emails and phones are unioned. The first non-empty business name wins,
    /// and the source URL of `self` is kept.
    pub fn absorb(&mut self, other: Contact) {
        self.emails.extend(other.emails);
        self.phones.extend(other.phones);
        if self.business_name.is_none() {
            self.business_name = other.business_name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_contact() {
        let contact = Contact::new("https://acme.example/");
        assert!(contact.is_empty());
        assert!(!contact.with_phone("6175550142").is_empty());
    }

    #[test]
    fn test_emails_are_lowercased() {
        let contact = Contact::new("https://acme.example/").with_email("Info@Acme.Example");
        assert!(contact.emails.contains("info@acme.example"));
    }

    #[test]
    fn test_shares_identity() {
        let a = Contact::new("https://a.example/")
            .with_email("info@a.example")
            .with_phone("6175550142");
        let b = Contact::new("https://b.example/").with_phone("6175550142");
        let c = Contact::new("https://c.example/").with_email("sales@c.example");

        assert!(a.shares_identity_with(&b));
        assert!(!a.shares_identity_with(&c));
    }

    #[test]
    fn test_absorb_keeps_first_name() {
        let mut a = Contact::new("https://a.example/").with_email("info@a.example");
        let b = Contact::new("https://b.example/")
            .with_email("info@a.example")
            .with_phone("6175550142")
            .with_business_name("Acme Plumbing");
        let c = Contact::new("https://c.example/")
            .with_phone("6175550142")
            .with_business_name("Acme Plumbing & Heating");

        a.absorb(b);
        a.absorb(c);

        assert_eq!(a.source_url, "https://a.example/");
        assert_eq!(a.business_name.as_deref(), Some("Acme Plumbing"));
        assert_eq!(a.phones.len(), 1);
    }
}
