//! Entry revision tracking for daybook.
//!
//! Every edit of a journal entry is recorded as a reverse patch, from the text
//! after the edit back to the text before it. Any earlier version is rebuilt
//! by undoing patches from the live entry backward:
//! - Record edits as compact, plain-text reverse patches
//! - List the revisions of a day with their sizes
//! - Reconstruct the entry as of any revision, cached on disk
//! - Sweep stale reconstruction caches
//!
//! # Example
//!
//! ```no_run
//! use daybook_revision::{EntryDate, JournalLayout, MatchMode, RevisionStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let layout = JournalLayout::new("/journal/entries", "/journal/diffs");
//! let store = RevisionStore::with_match_mode(layout, MatchMode::Fuzzy);
//! let date = EntryDate::from_ymd(2024, 3, 7).ok_or("bad date")?;
//!
//! store.record_edit(date, None, "Hello\n").await?;
//! store.record_edit(date, Some("Hello\n"), "Hello world\n").await?;
//!
//! let revisions = store.list_revisions(date).await?;
//! let first = store.reconstruct_text(date, &revisions, 0).await?;
//! assert_eq!(first, "Hello\n");
//! # Ok(())
//! # }
//! ```

mod clock;
pub mod codec;
mod error;
mod janitor;
mod layout;
mod revision;
mod store;

pub use clock::{Clock, SystemClock};
pub use codec::{ApplyReport, DiffCodec, HunkOutcome, MatchMode, PatchCodec};
pub use error::{CodecError, CodecResult, RevisionError, RevisionResult};
pub use janitor::{clean_tmp, JanitorReport};
pub use layout::{parse_revision_name, EntryDate, JournalLayout, CACHE_SUFFIX, PARTIAL_SUFFIX};
pub use revision::Revision;
pub use store::RevisionStore;
