use std::collections::HashMap;
use std::sync::Arc;

use stacks::{Catalog, Coordinator};

/// Coordinator over a catalog seeded with `books` and `users`
pub fn seeded(books: &[&str], users: &[&str]) -> Coordinator {
    let catalog = Catalog::new();
    for title in books {
        catalog.add_book(title).expect("add book");
    }
    for name in users {
        catalog.add_user(name).expect("add user");
    }
    Coordinator::new(Arc::new(catalog))
}

/// A book is checked out iff exactly one user lists it, and that user is the holder.
pub fn assert_loans_consistent(catalog: &Catalog) {
    let mut holders: HashMap<String, String> = HashMap::new();
    for summary in catalog.list_users() {
        let user = catalog.user(&summary.name).expect("listed user exists");
        for key in user.borrowed() {
            let previous = holders.insert(key.to_string(), user.key().to_string());
            assert!(previous.is_none(), "book '{key}' listed by two users");
        }
    }

    for line in catalog.list_all_books().books {
        let book = catalog.book(&line.title).expect("listed book exists");
        assert_eq!(
            book.checked_out_by().map(str::to_string),
            holders.remove(book.key()),
            "holder mismatch for '{}'",
            book.title()
        );
    }

    assert!(holders.is_empty(), "users hold books missing from the catalog: {holders:?}");
}
