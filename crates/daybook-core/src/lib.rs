//! Core journal logic for daybook.
//!
//! This crate ties the revision store to the rest of the journal:
//! - Configuration loading and resolution
//! - Date parsing for the command line
//! - Edit sessions through the user's external editor
//! - Per-month entry summaries

pub mod config;
pub mod date;
pub mod editor;
pub mod error;
pub mod metadata;

pub use config::{Config, ResolvedConfig};
pub use date::{parse_date, EntryDate};
pub use editor::{EditOutcome, EditorLauncher, EmptyEntryPolicy, EntryEditor, ExternalEditor};
pub use error::{ConfigError, CoreError, CoreResult};
pub use metadata::{DayMetadata, MetadataCache};
