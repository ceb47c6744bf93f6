//! Catalog store
//!
//! Owns the book and user collections together with the two per-key lock
//! registries. Collections are keyed by normalized title / username and
//! remember insertion order for listing.
//!
//! # Locking
//!
//! - The maps sit behind `RwLock`s held only for short synchronous sections
//! - Each entity lives in its own `Arc<Mutex<_>>` cell so the coordinator can
//!   mutate it without holding a map lock
//! - Logical operations that touch a book and a user take the book key lock
//!   first and the user key lock second; removal follows the same order
//!
//! Removing a book or user that is on loan cascades: the other side of the
//! loan is cleaned up under the same locks, so a book is checked out iff
//! exactly one user lists it as borrowed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::Serialize;

use crate::entity::{normalize_key, Book, User};
use crate::error::{Error, KeyKind, Result};
use crate::lock::{KeyGuard, LockRegistry};
use crate::status::{ListBooksStatus, Outcome, SearchStatus};

/// Shared handle to an entity owned by the catalog
pub(crate) type Cell<T> = Arc<Mutex<T>>;

#[derive(Debug)]
struct Entry<T> {
    seq: u64,
    cell: Cell<T>,
}

/// Availability line for one book
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookAvailability {
    pub title: String,
    pub checked_out: bool,
}

/// Result of [`Catalog::list_all_books`]: status plus the listing itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookListing {
    pub outcome: Outcome<ListBooksStatus>,
    pub books: Vec<BookAvailability>,
}

/// A user and the titles they currently hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub name: String,
    pub borrowed: Vec<String>,
}

/// In-memory book and user store
#[derive(Debug)]
pub struct Catalog {
    books: RwLock<HashMap<String, Entry<Book>>>,
    users: RwLock<HashMap<String, Entry<User>>>,
    next_seq: AtomicU64,
    book_locks: LockRegistry,
    user_locks: LockRegistry,
    lock_timeout: Option<Duration>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create an empty catalog whose locks wait indefinitely
    pub fn new() -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            book_locks: LockRegistry::new(KeyKind::Book),
            user_locks: LockRegistry::new(KeyKind::User),
            lock_timeout: None,
        }
    }

    /// Bound every key lock acquisition by `timeout`
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn book_locks(&self) -> &LockRegistry {
        &self.book_locks
    }

    pub fn user_locks(&self) -> &LockRegistry {
        &self.user_locks
    }

    // =========================================================================
    // Add / exists
    // =========================================================================

    /// Add a book. Fails with [`Error::DuplicateKey`] if the title exists.
    pub fn add_book(&self, title: &str) -> Result<()> {
        let book = Book::new(title);
        let key = require_key(book.key(), KeyKind::Book)?;
        let mut books = write(&self.books);
        if books.contains_key(&key) {
            return Err(Error::DuplicateKey {
                kind: KeyKind::Book,
                key,
            });
        }
        tracing::info!(book = %key, "book added");
        books.insert(
            key,
            Entry {
                seq: self.next_seq(),
                cell: Arc::new(Mutex::new(book)),
            },
        );
        Ok(())
    }

    /// Add a user. Fails with [`Error::DuplicateKey`] if the name exists.
    pub fn add_user(&self, name: &str) -> Result<()> {
        let user = User::new(name);
        let key = require_key(user.key(), KeyKind::User)?;
        let mut users = write(&self.users);
        if users.contains_key(&key) {
            return Err(Error::DuplicateKey {
                kind: KeyKind::User,
                key,
            });
        }
        tracing::info!(user = %key, "user added");
        users.insert(
            key,
            Entry {
                seq: self.next_seq(),
                cell: Arc::new(Mutex::new(user)),
            },
        );
        Ok(())
    }

    pub fn book_exists(&self, title: &str) -> bool {
        read(&self.books).contains_key(&normalize_key(title))
    }

    pub fn user_exists(&self, name: &str) -> bool {
        read(&self.users).contains_key(&normalize_key(name))
    }

    pub fn book_count(&self) -> usize {
        read(&self.books).len()
    }

    pub fn user_count(&self) -> usize {
        read(&self.users).len()
    }

    /// Snapshot of a book's current state
    pub fn book(&self, title: &str) -> Option<Book> {
        self.book_cell(&normalize_key(title))
            .map(|cell| lock_cell(&cell).clone())
    }

    /// Snapshot of a user's current state
    pub fn user(&self, name: &str) -> Option<User> {
        self.user_cell(&normalize_key(name))
            .map(|cell| lock_cell(&cell).clone())
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Remove a book; returns whether it was present.
    ///
    /// If the book is on loan, its borrower's record is cleaned up too.
    pub async fn remove_book(&self, title: &str) -> Result<bool> {
        let key = normalize_key(title);
        if self.book_cell(&key).is_none() {
            return Ok(false);
        }

        let _book_guard = self.book_locks.acquire(&key, self.lock_timeout).await?;
        // Re-read under the book lock; a concurrent removal may have won.
        let Some(cell) = self.book_cell(&key) else {
            return Ok(false);
        };
        let borrower = lock_cell(&cell).checked_out_by().map(str::to_string);

        let _user_guard = match &borrower {
            Some(user_key) => Some(self.user_locks.acquire(user_key, self.lock_timeout).await?),
            None => None,
        };

        write(&self.books).remove(&key);
        if let Some(user_key) = borrower {
            if let Some(user_cell) = self.user_cell(&user_key) {
                lock_cell(&user_cell).return_book(&key);
            }
            tracing::warn!(
                book = %key,
                user = %user_key,
                "removed book on loan; borrower record cleared"
            );
        } else {
            tracing::info!(book = %key, "book removed");
        }
        Ok(true)
    }

    /// Remove a user; returns whether they were present.
    ///
    /// Any books the user holds are checked back in.
    pub async fn remove_user(&self, name: &str) -> Result<bool> {
        let key = normalize_key(name);

        loop {
            let Some(cell) = self.user_cell(&key) else {
                return Ok(false);
            };
            let snapshot: Vec<String> = lock_cell(&cell).borrowed().map(str::to_string).collect();

            // Book locks first, in sorted key order, then the user lock.
            let mut book_guards = Vec::with_capacity(snapshot.len());
            for book_key in &snapshot {
                book_guards.push(self.book_locks.acquire(book_key, self.lock_timeout).await?);
            }
            let _user_guard = self.user_locks.acquire(&key, self.lock_timeout).await?;

            let Some(cell) = self.user_cell(&key) else {
                return Ok(false);
            };
            let current: Vec<String> = lock_cell(&cell).borrowed().map(str::to_string).collect();
            if current != snapshot {
                tracing::debug!(
                    user = %key,
                    "borrowed set changed while locking; retrying removal"
                );
                continue;
            }

            write(&self.users).remove(&key);
            for book_key in &current {
                if let Some(book_cell) = self.book_cell(book_key) {
                    lock_cell(&book_cell).set_checked_in(&key);
                }
            }
            if current.is_empty() {
                tracing::info!(user = %key, "user removed");
            } else {
                tracing::warn!(
                    user = %key,
                    books = current.len(),
                    "removed user with loans; books checked in"
                );
            }
            return Ok(true);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Availability of every book in insertion order
    pub fn list_all_books(&self) -> BookListing {
        let cells = ordered_cells(&self.books);
        let books: Vec<BookAvailability> = cells
            .iter()
            .map(|cell| {
                let book = lock_cell(cell);
                BookAvailability {
                    title: book.title().to_string(),
                    checked_out: book.is_checked_out(),
                }
            })
            .collect();

        let status = if books.is_empty() {
            ListBooksStatus::NoBooksAvailable
        } else {
            ListBooksStatus::Success
        };
        BookListing {
            outcome: Outcome::new(status),
            books,
        }
    }

    /// Look up a title's availability
    pub fn search_book(&self, title: &str) -> Outcome<SearchStatus> {
        let status = match self.book_cell(&normalize_key(title)) {
            None => SearchStatus::BookNotFound,
            Some(cell) if lock_cell(&cell).is_checked_out() => SearchStatus::CheckedOut,
            Some(_) => SearchStatus::Available,
        };
        Outcome::new(status)
    }

    /// Every user with the display titles they hold, in insertion order
    pub fn list_users(&self) -> Vec<UserSummary> {
        ordered_cells(&self.users)
            .iter()
            .map(|cell| {
                let (name, keys) = {
                    let user = lock_cell(cell);
                    let keys: Vec<String> = user.borrowed().map(str::to_string).collect();
                    (user.name().to_string(), keys)
                };
                let borrowed = keys
                    .into_iter()
                    .map(|key| match self.book_cell(&key) {
                        Some(book) => lock_cell(&book).title().to_string(),
                        None => key,
                    })
                    .collect();
                UserSummary { name, borrowed }
            })
            .collect()
    }

    // =========================================================================
    // Coordinator support
    // =========================================================================

    pub(crate) fn book_cell(&self, key: &str) -> Option<Cell<Book>> {
        read(&self.books).get(key).map(|entry| Arc::clone(&entry.cell))
    }

    pub(crate) fn user_cell(&self, key: &str) -> Option<Cell<User>> {
        read(&self.users).get(key).map(|entry| Arc::clone(&entry.cell))
    }

    /// Whether `cell` is still the catalog's entry for `key`
    pub(crate) fn is_current_book(&self, key: &str, cell: &Cell<Book>) -> bool {
        self.book_cell(key)
            .is_some_and(|current| Arc::ptr_eq(&current, cell))
    }

    pub(crate) fn is_current_user(&self, key: &str, cell: &Cell<User>) -> bool {
        self.user_cell(key)
            .is_some_and(|current| Arc::ptr_eq(&current, cell))
    }

    /// Acquire the book lock, then the user lock
    pub(crate) async fn lock_pair(
        &self,
        book_key: &str,
        user_key: &str,
    ) -> Result<(KeyGuard, KeyGuard)> {
        let book_guard = self.book_locks.acquire(book_key, self.lock_timeout).await?;
        let user_guard = self.user_locks.acquire(user_key, self.lock_timeout).await?;
        tracing::debug!(book = %book_key, user = %user_key, "acquired book and user locks");
        Ok((book_guard, user_guard))
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }
}

/// Lock an entity cell, recovering from poisoning
pub(crate) fn lock_cell<T>(cell: &Mutex<T>) -> MutexGuard<'_, T> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn ordered_cells<T>(map: &RwLock<HashMap<String, Entry<T>>>) -> Vec<Cell<T>> {
    let map = read(map);
    let mut entries: Vec<&Entry<T>> = map.values().collect();
    entries.sort_by_key(|entry| entry.seq);
    entries.iter().map(|entry| Arc::clone(&entry.cell)).collect()
}

fn require_key(key: &str, kind: KeyKind) -> Result<String> {
    if key.is_empty() {
        return Err(Error::InvalidArgument(format!("{kind} name cannot be empty")));
    }
    Ok(key.to_string())
}
