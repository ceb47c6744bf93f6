//! Outcome codes for catalog operations
//!
//! Each operation family has a closed status enum. Messages come from an
//! exhaustive match, so every status has exactly one fixed message.

use std::fmt;

use serde::Serialize;

/// Common behavior of every status family
pub trait StatusCode: Copy + fmt::Debug + Serialize {
    /// Whether this status counts as a successful outcome
    fn is_success(&self) -> bool;

    /// Fixed human-readable message
    fn message(&self) -> &'static str;
}

/// Result of a catalog or coordinator operation: success flag plus status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outcome<S> {
    pub success: bool,
    pub status: S,
}

impl<S: StatusCode> Outcome<S> {
    pub fn new(status: S) -> Self {
        Self {
            success: status.is_success(),
            status,
        }
    }

    pub fn message(&self) -> &'static str {
        self.status.message()
    }
}

impl<S: StatusCode> From<S> for Outcome<S> {
    fn from(status: S) -> Self {
        Outcome::new(status)
    }
}

impl<S: StatusCode> fmt::Display for Outcome<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Success,
    UserNotFound,
    BookNotFound,
    BookAlreadyCheckedOut,
    MaxBooksReached,
    AlreadyCheckedOutByUser,
}

impl StatusCode for CheckoutStatus {
    fn is_success(&self) -> bool {
        matches!(self, CheckoutStatus::Success)
    }

    fn message(&self) -> &'static str {
        match self {
            CheckoutStatus::Success => "Book checked out successfully.",
            CheckoutStatus::UserNotFound => "User not found.",
            CheckoutStatus::BookNotFound => "Book not found.",
            CheckoutStatus::BookAlreadyCheckedOut => "Book is already checked out.",
            CheckoutStatus::MaxBooksReached => {
                "User has reached the maximum number of borrowed books."
            }
            CheckoutStatus::AlreadyCheckedOutByUser => "User has already checked out this book.",
        }
    }
}

/// Outcome of a check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStatus {
    Success,
    UserNotFound,
    BookNotFound,
    BookNotBorrowedByUser,
    CheckedOutByAnotherUser,
}

impl StatusCode for CheckInStatus {
    fn is_success(&self) -> bool {
        matches!(self, CheckInStatus::Success)
    }

    fn message(&self) -> &'static str {
        match self {
            CheckInStatus::Success => "Book checked in successfully.",
            CheckInStatus::UserNotFound => "User not found.",
            CheckInStatus::BookNotFound => "Book not found.",
            CheckInStatus::BookNotBorrowedByUser => "User has not borrowed this book.",
            CheckInStatus::CheckedOutByAnotherUser => "Book is checked out by another user.",
        }
    }
}

/// Outcome of listing the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListBooksStatus {
    Success,
    NoBooksAvailable,
}

impl StatusCode for ListBooksStatus {
    fn is_success(&self) -> bool {
        matches!(self, ListBooksStatus::Success)
    }

    fn message(&self) -> &'static str {
        match self {
            ListBooksStatus::Success => "Books listed successfully.",
            ListBooksStatus::NoBooksAvailable => "No books available in the library.",
        }
    }
}

/// Outcome of a title search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Available,
    CheckedOut,
    BookNotFound,
}

impl StatusCode for SearchStatus {
    fn is_success(&self) -> bool {
        !matches!(self, SearchStatus::BookNotFound)
    }

    fn message(&self) -> &'static str {
        match self {
            SearchStatus::Available => "Book is available.",
            SearchStatus::CheckedOut => "Book is checked out.",
            SearchStatus::BookNotFound => "Book not found.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_success_variants_are_successful() {
        assert!(Outcome::new(CheckoutStatus::Success).success);
        assert!(!Outcome::new(CheckoutStatus::MaxBooksReached).success);
        assert!(Outcome::new(CheckInStatus::Success).success);
        assert!(!Outcome::new(CheckInStatus::CheckedOutByAnotherUser).success);
        assert!(!Outcome::new(ListBooksStatus::NoBooksAvailable).success);
    }

    #[test]
    fn search_found_statuses_are_successful() {
        assert!(Outcome::new(SearchStatus::Available).success);
        assert!(Outcome::new(SearchStatus::CheckedOut).success);
        assert!(!Outcome::new(SearchStatus::BookNotFound).success);
    }

    #[test]
    fn outcome_displays_fixed_message() {
        let outcome: Outcome<CheckoutStatus> = CheckoutStatus::BookAlreadyCheckedOut.into();
        assert_eq!(outcome.to_string(), "Book is already checked out.");
        assert_eq!(
            Outcome::new(ListBooksStatus::NoBooksAvailable).message(),
            "No books available in the library."
        );
    }

    #[test]
    fn statuses_serialize_snake_case() {
        let json = serde_json::to_value(Outcome::new(CheckInStatus::BookNotBorrowedByUser))
            .expect("serialize");
        assert_eq!(json["success"], false);
        assert_eq!(json["status"], "book_not_borrowed_by_user");
    }
}
