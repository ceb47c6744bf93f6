//! Checkout coordination
//!
//! The coordinator is the only place that mutates a book and a user
//! together. Each operation:
//!
//! 1. Resolves the user and the book (outside any key lock)
//! 2. Acquires the book lock, then the user lock
//! 3. Re-validates that both entities are still in the catalog
//! 4. Applies the guarded entity transitions, rolling back the first one
//!    if the second is rejected
//!
//! Locks are owned guards, released on every return path. Operations on
//! disjoint book/user pairs run in parallel.

use std::sync::Arc;

use crate::catalog::{lock_cell, Catalog, Cell};
use crate::config::Config;
use crate::entity::{normalize_key, Book, User};
use crate::error::Result;
use crate::status::{CheckInStatus, CheckoutStatus, Outcome};

/// Default number of books one user may hold
pub const DEFAULT_MAX_BOOKS: usize = 3;

/// Orchestrates checkout and check-in against a shared [`Catalog`]
#[derive(Debug, Clone)]
pub struct Coordinator {
    catalog: Arc<Catalog>,
    max_books: usize,
}

impl Coordinator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            max_books: DEFAULT_MAX_BOOKS,
        }
    }

    /// Build a catalog and coordinator from loan and lock settings
    pub fn from_config(config: &Config) -> Self {
        let catalog = Catalog::new().with_lock_timeout(config.locks.timeout());
        Self::new(Arc::new(catalog)).with_max_books(config.loans.max_books_per_user)
    }

    pub fn with_max_books(mut self, max_books: usize) -> Self {
        self.max_books = max_books;
        self
    }

    pub fn max_books(&self) -> usize {
        self.max_books
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Check `title` out to `user`.
    ///
    /// Only fails with an error if a lock timeout is configured and expires.
    pub async fn checkout_book(&self, title: &str, user: &str) -> Result<Outcome<CheckoutStatus>> {
        let book_key = normalize_key(title);
        let user_key = normalize_key(user);

        let Some(user_cell) = self.catalog.user_cell(&user_key) else {
            return Ok(finish_checkout(&book_key, &user_key, CheckoutStatus::UserNotFound));
        };
        let Some(book_cell) = self.catalog.book_cell(&book_key) else {
            return Ok(finish_checkout(&book_key, &user_key, CheckoutStatus::BookNotFound));
        };
        let held = lock_cell(&user_cell).borrowed_count();
        if held >= self.max_books {
            return Ok(finish_checkout(&book_key, &user_key, CheckoutStatus::MaxBooksReached));
        }

        let (_book_guard, _user_guard) = self.catalog.lock_pair(&book_key, &user_key).await?;
        let status = self.apply_checkout(&book_key, &book_cell, &user_key, &user_cell);
        Ok(finish_checkout(&book_key, &user_key, status))
    }

    /// Return `title` on behalf of `user`.
    ///
    /// Only fails with an error if a lock timeout is configured and expires.
    pub async fn check_in_book(&self, title: &str, user: &str) -> Result<Outcome<CheckInStatus>> {
        let book_key = normalize_key(title);
        let user_key = normalize_key(user);

        let Some(user_cell) = self.catalog.user_cell(&user_key) else {
            return Ok(finish_check_in(&book_key, &user_key, CheckInStatus::UserNotFound));
        };
        let Some(book_cell) = self.catalog.book_cell(&book_key) else {
            return Ok(finish_check_in(&book_key, &user_key, CheckInStatus::BookNotFound));
        };

        let (_book_guard, _user_guard) = self.catalog.lock_pair(&book_key, &user_key).await?;
        let status = self.apply_check_in(&book_key, &book_cell, &user_key, &user_cell);
        Ok(finish_check_in(&book_key, &user_key, status))
    }

    // Callers hold both key locks.
    fn apply_checkout(
        &self,
        book_key: &str,
        book_cell: &Cell<Book>,
        user_key: &str,
        user_cell: &Cell<User>,
    ) -> CheckoutStatus {
        if !self.catalog.is_current_user(user_key, user_cell) {
            return CheckoutStatus::UserNotFound;
        }
        if !self.catalog.is_current_book(book_key, book_cell) {
            return CheckoutStatus::BookNotFound;
        }

        let mut book = lock_cell(book_cell);
        let mut user = lock_cell(user_cell);

        // The pre-check ran unlocked; a parallel checkout by this user may
        // have filled the last slot since.
        if user.borrowed_count() >= self.max_books {
            return CheckoutStatus::MaxBooksReached;
        }
        if !book.set_checked_out(user_key) {
            return CheckoutStatus::BookAlreadyCheckedOut;
        }
        if !user.borrow_book(book_key) {
            book.set_checked_in(user_key);
            tracing::warn!(
                book = %book_key,
                user = %user_key,
                "borrow record already present; checkout rolled back"
            );
            return CheckoutStatus::AlreadyCheckedOutByUser;
        }
        CheckoutStatus::Success
    }

    // Callers hold both key locks.
    fn apply_check_in(
        &self,
        book_key: &str,
        book_cell: &Cell<Book>,
        user_key: &str,
        user_cell: &Cell<User>,
    ) -> CheckInStatus {
        if !self.catalog.is_current_user(user_key, user_cell) {
            return CheckInStatus::UserNotFound;
        }
        if !self.catalog.is_current_book(book_key, book_cell) {
            return CheckInStatus::BookNotFound;
        }

        let mut book = lock_cell(book_cell);
        let mut user = lock_cell(user_cell);

        if !user.return_book(book_key) {
            return CheckInStatus::BookNotBorrowedByUser;
        }
        if !book.set_checked_in(user_key) {
            user.borrow_book(book_key);
            tracing::warn!(
                book = %book_key,
                user = %user_key,
                "book held by another user; check-in rolled back"
            );
            return CheckInStatus::CheckedOutByAnotherUser;
        }
        CheckInStatus::Success
    }
}

fn finish_checkout(book: &str, user: &str, status: CheckoutStatus) -> Outcome<CheckoutStatus> {
    tracing::debug!(book, user, ?status, "checkout finished");
    Outcome::new(status)
}

fn finish_check_in(book: &str, user: &str, status: CheckInStatus) -> Outcome<CheckInStatus> {
    tracing::debug!(book, user, ?status, "check-in finished");
    Outcome::new(status)
}
