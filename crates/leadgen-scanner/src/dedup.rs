//! Order-preserving contact deduplication.

use crate::contact::Contact;
use std::collections::{BTreeSet, HashMap};

/// What happened to a contact offered to a [`ContactSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored as a new entry.
    Added,
    /// Shared an email or phone with existing entries and was merged into them.
    Merged,
    /// Had no email and no phone.
    Discarded,
    /// Was new but the set already holds its target number of contacts.
    Full,
}

/// Ordered set of contacts where no two entries share an email or phone.
///
/// Entries keep discovery order. When a new contact overlaps several
/// existing entries they collapse into the earliest one, so the set never
/// grows on a merge.
#[derive(Debug, Clone)]
pub struct ContactSet {
    entries: Vec<Contact>,
    email_owner: HashMap<String, usize>,
    phone_owner: HashMap<String, usize>,
    capacity: usize,
}

impl ContactSet {
    /// Create a set that accepts at most `capacity` distinct contacts.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            email_owner: HashMap::new(),
            phone_owner: HashMap::new(),
            capacity,
        }
    }

    pub fn insert(&mut self, contact: Contact) -> InsertOutcome {
        if contact.is_empty() {
            return InsertOutcome::Discarded;
        }

        let owners: BTreeSet<usize> = contact
            .emails
            .iter()
            .filter_map(|email| self.email_owner.get(email))
            .chain(
                contact
                    .phones
                    .iter()
                    .filter_map(|phone| self.phone_owner.get(phone)),
            )
            .copied()
            .collect();

        let Some(&target) = owners.first() else {
            if self.is_full() {
                return InsertOutcome::Full;
            }
            let idx = self.entries.len();
            self.index(&contact, idx);
            self.entries.push(contact);
            return InsertOutcome::Added;
        };

        if owners.len() == 1 {
            self.index(&contact, target);
            self.entries[target].absorb(contact);
            return InsertOutcome::Merged;
        }

        // Remove from the back so earlier indices stay valid, then fold in
        // discovery order so the earliest business name survives.
        let mut bridged: Vec<Contact> = owners
            .iter()
            .skip(1)
            .rev()
            .map(|&idx| self.entries.remove(idx))
            .collect();
        bridged.reverse();
        for other in bridged {
            self.entries[target].absorb(other);
        }
        self.entries[target].absorb(contact);
        self.reindex();
        InsertOutcome::Merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.entries
    }

    pub fn into_contacts(self) -> Vec<Contact> {
        self.entries
    }

    fn index(&mut self, contact: &Contact, idx: usize) {
        for email in &contact.emails {
            self.email_owner.insert(email.clone(), idx);
        }
        for phone in &contact.phones {
            self.phone_owner.insert(phone.clone(), idx);
        }
    }

    fn reindex(&mut self) {
        self.email_owner.clear();
        self.phone_owner.clear();
        let entries = std::mem::take(&mut self.entries);
        for (idx, contact) in entries.iter().enumerate() {
            self.index(contact, idx);
        }
        self.entries = entries;
    }
}
