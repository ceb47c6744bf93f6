//! Catalog entities: books and users
//!
//! Both entities carry a display string and a normalized key. Every
//! mutation is a guarded transition that reports whether it applied; a
//! rejected transition leaves the entity untouched.
//!
//! Entities do no locking of their own. Callers hold the book and user
//! locks from [`crate::lock`] while mutating them.

use std::collections::BTreeSet;

use serde::Serialize;

/// Normalize a title or username into its lookup key.
///
/// Keys are trimmed and lowercased, and inner whitespace runs collapse to a
/// single space, so " Dune " and "the  dispossessed" match "dune" and
/// "the dispossessed".
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// =============================================================================
// Book
// =============================================================================

/// A single-copy book
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    title: String,
    key: String,
    checked_out_by: Option<String>,
}

impl Book {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into().trim().to_string();
        let key = normalize_key(&title);
        Self {
            title,
            key,
            checked_out_by: None,
        }
    }

    /// Display title as it was added
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Normalized lookup key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key of the current borrower, if any
    pub fn checked_out_by(&self) -> Option<&str> {
        self.checked_out_by.as_deref()
    }

    pub fn is_checked_out(&self) -> bool {
        self.checked_out_by.is_some()
    }

    /// Mark the book as held by `user`.
    ///
    /// Fails without mutation if anyone (including `user`) already holds it.
    pub fn set_checked_out(&mut self, user: &str) -> bool {
        if self.is_checked_out() {
            return false;
        }
        self.checked_out_by = Some(normalize_key(user));
        true
    }

    /// Release the book, but only on behalf of its current borrower.
    pub fn set_checked_in(&mut self, user: &str) -> bool {
        match &self.checked_out_by {
            Some(holder) if *holder == normalize_key(user) => {
                self.checked_out_by = None;
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A library patron and the set of book keys they hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    name: String,
    key: String,
    borrowed: BTreeSet<String>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().trim().to_string();
        let key = normalize_key(&name);
        Self {
            name,
            key,
            borrowed: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Keys of the books this user holds, sorted
    pub fn borrowed(&self) -> impl Iterator<Item = &str> {
        self.borrowed.iter().map(String::as_str)
    }

    pub fn borrowed_count(&self) -> usize {
        self.borrowed.len()
    }

    pub fn has_borrowed(&self, title: &str) -> bool {
        self.borrowed.contains(&normalize_key(title))
    }

    /// Record a loan. The per-user limit is not checked here.
    pub fn borrow_book(&mut self, title: &str) -> bool {
        self.borrowed.insert(normalize_key(title))
    }

    /// Drop a loan record; fails if the title was not borrowed.
    pub fn return_book(&mut self, title: &str) -> bool {
        self.borrowed.remove(&normalize_key(title))
    }
}
