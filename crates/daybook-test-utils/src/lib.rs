//! Testing utilities for daybook.
//!
//! This crate provides common testing infrastructure:
//! - A temporary journal builder with pre-seeded entries
//! - A scripted editor, a manual clock, and a counting codec
//! - Assertions for entry files and reconstruction caches
//!
//! # Example
//!
//! ```no_run
//! use daybook_test_utils::{date, ManualClock, TestJournal};
//!
//! # async fn example() {
//! let journal = TestJournal::new()
//!     .with_entry(date(2024, 3, 7), "Seeded before any history\n")
//!     .build();
//! let store = journal.store(ManualClock::new(1_000));
//! journal.edit(&store, date(2024, 3, 7), "Changed\n").await;
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::*;
pub use fixtures::*;
pub use mocks::*;
