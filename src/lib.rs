//! stacks - in-memory library catalog
//!
//! Tracks books, users and the loans between them. A book has at most one
//! borrower and a user holds a bounded number of books; both rules hold
//! under concurrent checkouts.
//!
//! # Core Concepts
//!
//! - **Entities**: `Book` and `User` with guarded state transitions
//! - **Lock registry**: one lazily created async lock per book key and per
//!   user key
//! - **Catalog**: the book and user collections, add/remove/list/search
//! - **Coordinator**: checkout and check-in under book-then-user locking
//! - **Status**: closed outcome enums with fixed messages
//!
//! # Module Organization
//!
//! - `catalog`: Catalog store and cascading removal
//! - `cli`: Console shell using clap
//! - `config`: Configuration loading from `.stacks.toml`
//! - `coordinator`: Checkout / check-in orchestration
//! - `entity`: Book and User records, key normalization
//! - `error`: Error types and result aliases
//! - `lock`: Per-key lock registry
//! - `output`: Human and JSON report rendering
//! - `status`: Outcome codes and messages

pub mod catalog;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod lock;
pub mod output;
pub mod status;

pub use catalog::Catalog;
pub use coordinator::Coordinator;
pub use error::{Error, Result};
