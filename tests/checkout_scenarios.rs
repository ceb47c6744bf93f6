mod support;

use stacks::status::{CheckInStatus, CheckoutStatus, SearchStatus};
use support::{assert_loans_consistent, seeded};

#[tokio::test]
async fn checkout_and_check_in_ignore_case() {
    let coordinator = seeded(&["Dune"], &["Alice"]);

    let out = coordinator.checkout_book("dune", "ALICE").await.unwrap();
    assert!(out.success);
    assert_eq!(out.status, CheckoutStatus::Success);
    assert_eq!(
        coordinator.catalog().search_book("DUNE").status,
        SearchStatus::CheckedOut
    );

    let back = coordinator.check_in_book("Dune", "alice").await.unwrap();
    assert!(back.success);
    assert_eq!(back.status, CheckInStatus::Success);
    assert!(!coordinator.catalog().book("Dune").unwrap().is_checked_out());
    assert_eq!(coordinator.catalog().user("alice").unwrap().borrowed_count(), 0);
    assert_loans_consistent(coordinator.catalog());
}

#[tokio::test]
async fn missing_book_is_reported() {
    let coordinator = seeded(&[], &["Bob"]);
    let out = coordinator.checkout_book("Missing Title", "Bob").await.unwrap();
    assert!(!out.success);
    assert_eq!(out.status, CheckoutStatus::BookNotFound);

    let back = coordinator.check_in_book("Missing Title", "Bob").await.unwrap();
    assert_eq!(back.status, CheckInStatus::BookNotFound);
}

#[tokio::test]
async fn second_checkout_by_same_user_is_rejected() {
    let coordinator = seeded(&["Dune"], &["Alice"]);
    let first = coordinator.checkout_book("Dune", "Alice").await.unwrap();
    let second = coordinator.checkout_book("Dune", "Alice").await.unwrap();

    assert_eq!(first.status, CheckoutStatus::Success);
    assert_eq!(second.status, CheckoutStatus::BookAlreadyCheckedOut);
    assert_eq!(coordinator.catalog().user("Alice").unwrap().borrowed_count(), 1);
    assert_loans_consistent(coordinator.catalog());
}

#[tokio::test]
async fn book_held_by_other_user_cannot_be_taken_or_returned() {
    let coordinator = seeded(&["Dune"], &["Alice", "Bob"]);
    coordinator.checkout_book("Dune", "Alice").await.unwrap();

    let taken = coordinator.checkout_book("Dune", "Bob").await.unwrap();
    assert_eq!(taken.status, CheckoutStatus::BookAlreadyCheckedOut);

    let returned = coordinator.check_in_book("Dune", "Bob").await.unwrap();
    assert_eq!(returned.status, CheckInStatus::BookNotBorrowedByUser);
    assert_eq!(
        coordinator.catalog().book("Dune").unwrap().checked_out_by(),
        Some("alice")
    );
    assert_loans_consistent(coordinator.catalog());
}

#[tokio::test]
async fn fourth_checkout_hits_the_limit() {
    let coordinator = seeded(
        &["Dune", "Hyperion", "Anathem", "Neuromancer"],
        &["Alice"],
    );
    for title in ["Dune", "Hyperion", "Anathem"] {
        let out = coordinator.checkout_book(title, "Alice").await.unwrap();
        assert_eq!(out.status, CheckoutStatus::Success);
    }

    let fourth = coordinator.checkout_book("Neuromancer", "Alice").await.unwrap();
    assert!(!fourth.success);
    assert_eq!(fourth.status, CheckoutStatus::MaxBooksReached);

    // The limit wins even when the requested book is already out.
    let repeat = coordinator.checkout_book("Dune", "Alice").await.unwrap();
    assert_eq!(repeat.status, CheckoutStatus::MaxBooksReached);

    // Returning one frees a slot.
    coordinator.check_in_book("Hyperion", "Alice").await.unwrap();
    let retry = coordinator.checkout_book("Neuromancer", "Alice").await.unwrap();
    assert_eq!(retry.status, CheckoutStatus::Success);
    assert_loans_consistent(coordinator.catalog());
}

#[tokio::test]
async fn check_in_of_unborrowed_book_fails() {
    let coordinator = seeded(&["Dune"], &["Alice"]);
    let out = coordinator.check_in_book("Dune", "Alice").await.unwrap();
    assert!(!out.success);
    assert_eq!(out.status, CheckInStatus::BookNotBorrowedByUser);
    assert_eq!(out.message(), "User has not borrowed this book.");
}

#[tokio::test]
async fn listing_reflects_loans() {
    let coordinator = seeded(&["Dune", "Hyperion"], &["Alice"]);
    coordinator.checkout_book("Hyperion", "Alice").await.unwrap();

    let listing = coordinator.catalog().list_all_books();
    assert!(listing.outcome.success);
    let lines: Vec<(&str, bool)> = listing
        .books
        .iter()
        .map(|b| (b.title.as_str(), b.checked_out))
        .collect();
    assert_eq!(lines, vec![("Dune", false), ("Hyperion", true)]);

    let users = coordinator.catalog().list_users();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Alice");
    assert_eq!(users[0].borrowed, vec!["Hyperion".to_string()]);
}
