//! Revision storage implementation.

use crate::clock::{Clock, SystemClock};
use crate::codec::{DiffCodec, MatchMode, PatchCodec};
use crate::janitor::{clean_tmp, JanitorReport};
use crate::layout::{parse_revision_name, EntryDate, JournalLayout, PARTIAL_SUFFIX};
use crate::{CodecError, Revision, RevisionError, RevisionResult};
use daybook_util::path::with_suffix;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Append-only revision log for every entry of a journal.
///
/// Each edit is stored as a reverse patch from the state after the edit back
/// to the state before it, so history is walked backward from the live entry.
/// The first revision of a day is an empty creation marker.
///
/// A single writer is assumed: two processes recording edits for the same day
/// at the same time may interleave their timestamps.
pub struct RevisionStore {
    layout: JournalLayout,
    codec: Arc<dyn PatchCodec>,
    clock: Arc<dyn Clock>,
}

impl RevisionStore {
    /// Create a store over `layout` with the given patch codec and clock.
    pub fn new(layout: JournalLayout, codec: Arc<dyn PatchCodec>, clock: Arc<dyn Clock>) -> Self {
        Self {
            layout,
            codec,
            clock,
        }
    }

    /// Store using [`DiffCodec`] and wall-clock timestamps.
    pub fn with_match_mode(layout: JournalLayout, mode: MatchMode) -> Self {
        Self::new(
            layout,
            Arc::new(DiffCodec::new(mode)),
            Arc::new(SystemClock),
        )
    }

    pub fn layout(&self) -> &JournalLayout {
        &self.layout
    }

    /// Make sure the month directory of an entry exists and return the entry path.
    pub async fn ensure_entry_dir(&self, date: EntryDate) -> RevisionResult<PathBuf> {
        ensure_dir(&self.layout.entry_month_dir(date)).await?;
        Ok(self.layout.entry_path(date))
    }

    /// Record one edit of the entry for `date`.
    ///
    /// `before` is `None` when the entry did not exist before the edit; the
    /// entry file is then written from `after`. Returns `None` when the edit
    /// changed nothing.
    pub async fn record_edit(
        &self,
        date: EntryDate,
        before: Option<&str>,
        after: &str,
    ) -> RevisionResult<Option<Revision>> {
        let existing = self.list_revisions(date).await?;

        let payload = match before {
            Some(before) => self.codec.reverse_diff(before, after),
            None => {
                ensure_dir(&self.layout.entry_month_dir(date)).await?;
                fs::write(self.layout.entry_path(date), after).await?;

                if existing.is_empty() {
                    String::new()
                } else {
                    // Entry was deleted earlier; continue the chain from empty text
                    debug!("Entry {} re-created after deletion", date);
                    self.codec.reverse_diff("", after)
                }
            }
        };

        // Only the first write of a new entry records an empty payload
        if payload.is_empty() && (before.is_some() || !existing.is_empty()) {
            debug!("No changes to entry {}, nothing recorded", date);
            return Ok(None);
        }

        ensure_dir(&self.layout.diff_dir(date)).await?;
        let mut timestamp = self.next_timestamp(date, &existing);
        if existing.is_empty() && !payload.is_empty() {
            // Entry predates its history: its prior text becomes the creation revision
            write_atomic(&self.layout.revision_path(date, timestamp), "").await?;
            debug!("Started history for untracked entry {}", date);
            timestamp += 1;
        }
        write_atomic(&self.layout.revision_path(date, timestamp), &payload).await?;

        let revision = Revision::new(timestamp, payload.len() as u64);
        if payload.is_empty() {
            info!("Created entry {} at {}", date, timestamp);
        } else {
            info!(
                "Recorded revision {} of entry {} ({} bytes)",
                timestamp, date, revision.size_bytes
            );
        }
        Ok(Some(revision))
    }

    /// Revisions of the entry for `date`, oldest first.
    ///
    /// A missing month directory means no revisions. A file where the month
    /// directory should be is an [`RevisionError::InvalidDataDirectory`].
    pub async fn list_revisions(&self, date: EntryDate) -> RevisionResult<Vec<Revision>> {
        let dir = self.layout.diff_dir(date);
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(RevisionError::invalid_data_dir(dir)),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        }

        let day = date.day_name();
        let mut revisions = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(timestamp) = name.to_str().and_then(|n| parse_revision_name(n, &day)) else {
                continue;
            };
            let meta = entry.metadata().await?;
            if meta.is_file() {
                revisions.push(Revision::new(timestamp, meta.len()));
            }
        }

        revisions.sort_by_key(|r| r.timestamp);
        Ok(revisions)
    }

    /// Raw reverse patch stored for one revision.
    pub async fn read_revision(&self, date: EntryDate, timestamp: i64) -> RevisionResult<String> {
        Ok(fs::read_to_string(self.layout.revision_path(date, timestamp)).await?)
    }

    /// Path to a file holding the entry text as of `revisions[index]`.
    ///
    /// `revisions` must be the sequence returned by [`Self::list_revisions`].
    /// The result is cached next to the revision and reused on later calls.
    pub async fn reconstruct(
        &self,
        date: EntryDate,
        revisions: &[Revision],
        index: usize,
    ) -> RevisionResult<PathBuf> {
        let target = revisions
            .get(index)
            .ok_or(RevisionError::RevisionNotFound {
                index,
                count: revisions.len(),
            })?;

        let cache = self.layout.cache_path(date, target.timestamp);
        if fs::try_exists(&cache).await? {
            debug!("Using cached reconstruction {:?}", cache);
            return Ok(cache);
        }

        let text = self.replay(date, &revisions[index + 1..]).await?;
        ensure_dir(&self.layout.diff_dir(date)).await?;
        write_atomic(&cache, &text).await?;

        debug!(
            "Reconstructed entry {} at revision {} ({} patches)",
            date,
            target.timestamp,
            revisions.len() - index - 1
        );
        Ok(cache)
    }

    /// Like [`Self::reconstruct`], returning the text itself.
    pub async fn reconstruct_text(
        &self,
        date: EntryDate,
        revisions: &[Revision],
        index: usize,
    ) -> RevisionResult<String> {
        let path = self.reconstruct(date, revisions, index).await?;
        Ok(fs::read_to_string(path).await?)
    }

    /// Delete every reconstruction cache under the diffs root.
    pub async fn clean_cache(&self) -> RevisionResult<JanitorReport> {
        let root = self.layout.diffs_root().to_path_buf();
        tokio::task::spawn_blocking(move || clean_tmp(&root))
            .await
            .map_err(|e| RevisionError::Io(std::io::Error::other(e)))
    }

    /// Undo `later` from the live entry, newest first.
    async fn replay(&self, date: EntryDate, later: &[Revision]) -> RevisionResult<String> {
        let mut text = read_optional(&self.layout.entry_path(date))
            .await?
            .unwrap_or_default();

        for revision in later.iter().rev() {
            let timestamp = revision.timestamp;
            let patch = self.read_revision(date, timestamp).await?;
            text = self
                .codec
                .apply(&patch, &text)
                .map_err(|source| match source {
                    CodecError::Malformed { .. } => RevisionError::Corrupted { timestamp, source },
                    CodecError::PatchApply { .. } => RevisionError::PatchApply { timestamp, source },
                })?;
        }

        Ok(text)
    }

    /// Now, or one past the latest revision if the clock hasn't moved past it.
    fn next_timestamp(&self, date: EntryDate, existing: &[Revision]) -> i64 {
        let now = self.clock.now();
        match existing.last() {
            Some(latest) if latest.timestamp >= now => {
                warn!(
                    "Revision timestamp {} for {} already taken, using {}",
                    now,
                    date,
                    latest.timestamp + 1
                );
                latest.timestamp + 1
            }
            _ => now,
        }
    }
}

/// Read a file, treating a missing file as `None`.
async fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Create `dir` and its parents, reporting a file in the way as an invalid
/// data directory.
async fn ensure_dir(dir: &Path) -> RevisionResult<()> {
    let Err(e) = fs::create_dir_all(dir).await else {
        return Ok(());
    };

    for ancestor in dir.ancestors() {
        if let Ok(meta) = fs::metadata(ancestor).await {
            if !meta.is_dir() {
                return Err(RevisionError::invalid_data_dir(ancestor));
            }
            break;
        }
    }
    Err(e.into())
}

/// Write through a sibling and rename it into place, so readers never see a
/// truncated file.
async fn write_atomic(path: &Path, contents: &str) -> RevisionResult<()> {
    let partial = with_suffix(path, PARTIAL_SUFFIX);
    fs::write(&partial, contents).await?;
    fs::rename(&partial, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodecResult;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Hands out the queued timestamps in order, repeating the last one.
    struct StepClock {
        times: Vec<i64>,
        next: AtomicUsize,
    }

    impl StepClock {
        fn new(times: &[i64]) -> Self {
            Self {
                times: times.to_vec(),
                next: AtomicUsize::new(0),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> i64 {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            self.times[i.min(self.times.len() - 1)]
        }
    }

    struct CountingCodec {
        inner: DiffCodec,
        applied: AtomicI64,
    }

    impl PatchCodec for CountingCodec {
        fn reverse_diff(&self, before: &str, after: &str) -> String {
            self.inner.reverse_diff(before, after)
        }

        fn apply(&self, patch: &str, content: &str) -> CodecResult<String> {
            self.applied.fetch_add(1, Ordering::SeqCst);
            self.inner.apply(patch, content)
        }
    }

    fn date() -> EntryDate {
        EntryDate::from_ymd(2024, 3, 7).unwrap()
    }

    fn setup_test(times: &[i64]) -> (TempDir, RevisionStore) {
        let dir = TempDir::new().unwrap();
        let layout = JournalLayout::new(dir.path().join("entries"), dir.path().join("diffs"));
        let store = RevisionStore::new(
            layout,
            Arc::new(DiffCodec::default()),
            Arc::new(StepClock::new(times)),
        );
        (dir, store)
    }

    /// Mimic an editor session: write the entry, then record the edit.
    async fn edit(store: &RevisionStore, before: Option<&str>, after: &str) -> Option<Revision> {
        let path = store.layout().entry_path(date());
        if before.is_some() {
            fs::write(&path, after).await.unwrap();
        }
        store.record_edit(date(), before, after).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_then_edit_twice() {
        let (_dir, store) = setup_test(&[100, 200, 300]);

        edit(&store, None, "Hello\n").await;
        edit(&store, Some("Hello\n"), "Hello world\n").await;
        edit(&store, Some("Hello world\n"), "Hello world!\n").await;

        let revisions = store.list_revisions(date()).await.unwrap();
        let timestamps: Vec<i64> = revisions.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![100, 200, 300]);
        assert_eq!(revisions[0].size_bytes, 0);
        assert!(revisions[1].size_bytes > 0);
        assert!(revisions[2].size_bytes > 0);

        let texts = [
            store.reconstruct_text(date(), &revisions, 0).await.unwrap(),
            store.reconstruct_text(date(), &revisions, 1).await.unwrap(),
            store.reconstruct_text(date(), &revisions, 2).await.unwrap(),
        ];
        assert_eq!(texts, ["Hello\n", "Hello world\n", "Hello world!\n"]);
    }

    #[tokio::test]
    async fn test_creation_writes_entry() {
        let (_dir, store) = setup_test(&[100]);

        let revision = edit(&store, None, "First words\n").await.unwrap();
        assert_eq!(revision, Revision::new(100, 0));

        let content = fs::read_to_string(store.layout().entry_path(date()))
            .await
            .unwrap();
        assert_eq!(content, "First words\n");
    }

    #[tokio::test]
    async fn test_unchanged_edit_records_nothing() {
        let (_dir, store) = setup_test(&[100, 200]);

        edit(&store, None, "Same\n").await;
        assert!(edit(&store, Some("Same\n"), "Same\n").await.is_none());
        assert_eq!(store.list_revisions(date()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_untracked_entry_records_nothing() {
        let (_dir, store) = setup_test(&[100]);
        let path = store.ensure_entry_dir(date()).await.unwrap();
        fs::write(&path, "Pre-existing\n").await.unwrap();

        assert!(edit(&store, Some("Pre-existing\n"), "Pre-existing\n")
            .await
            .is_none());
        assert!(store.list_revisions(date()).await.unwrap().is_empty());
        assert!(!store.layout().diff_dir(date()).exists());
    }

    #[tokio::test]
    async fn test_missing_month_has_no_revisions() {
        let (_dir, store) = setup_test(&[100]);
        assert!(store.list_revisions(date()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_ignores_caches_and_strangers() {
        let (_dir, store) = setup_test(&[100, 200]);
        edit(&store, None, "a\n").await;
        edit(&store, Some("a\n"), "b\n").await;

        let dir = store.layout().diff_dir(date());
        fs::write(dir.join("07_100.tmp"), "a\n").await.unwrap();
        fs::write(dir.join("08_150"), "").await.unwrap();
        fs::write(dir.join("notes.txt"), "").await.unwrap();

        let revisions = store.list_revisions(date()).await.unwrap();
        assert_eq!(revisions.len(), 2);
    }

    #[tokio::test]
    async fn test_file_in_place_of_month_dir() {
        let (_dir, store) = setup_test(&[100]);
        let month = store.layout().diff_dir(date());
        fs::create_dir_all(month.parent().unwrap()).await.unwrap();
        fs::write(&month, "not a directory").await.unwrap();

        let err = store.list_revisions(date()).await.unwrap_err();
        assert!(matches!(err, RevisionError::InvalidDataDirectory { path } if path == month));
    }

    #[tokio::test]
    async fn test_file_in_place_of_entries_dir() {
        let (_dir, store) = setup_test(&[100]);
        let entries_root = store.layout().entries_root().to_path_buf();
        fs::write(&entries_root, "oops").await.unwrap();

        let err = store.record_edit(date(), None, "text").await.unwrap_err();
        assert!(matches!(err, RevisionError::InvalidDataDirectory { path } if path == entries_root));
    }

    #[tokio::test]
    async fn test_same_second_edits_are_bumped() {
        let (_dir, store) = setup_test(&[100]);

        edit(&store, None, "one\n").await;
        let second = edit(&store, Some("one\n"), "two\n").await.unwrap();
        let third = edit(&store, Some("two\n"), "three\n").await.unwrap();
        assert_eq!(second.timestamp, 101);
        assert_eq!(third.timestamp, 102);

        let revisions = store.list_revisions(date()).await.unwrap();
        assert_eq!(revisions.len(), 3);
        assert_eq!(
            store.reconstruct_text(date(), &revisions, 1).await.unwrap(),
            "two\n"
        );
    }

    #[tokio::test]
    async fn test_reconstruct_uses_cache() {
        let dir = TempDir::new().unwrap();
        let layout = JournalLayout::new(dir.path().join("entries"), dir.path().join("diffs"));
        let codec = Arc::new(CountingCodec {
            inner: DiffCodec::default(),
            applied: AtomicI64::new(0),
        });
        let store = RevisionStore::new(
            layout,
            codec.clone(),
            Arc::new(StepClock::new(&[100, 200, 300])),
        );

        edit(&store, None, "Hello\n").await;
        edit(&store, Some("Hello\n"), "Hello world\n").await;
        edit(&store, Some("Hello world\n"), "Hello world!\n").await;
        let revisions = store.list_revisions(date()).await.unwrap();

        let first = store.reconstruct(date(), &revisions, 0).await.unwrap();
        assert_eq!(codec.applied.load(Ordering::SeqCst), 2);

        let second = store.reconstruct(date(), &revisions, 0).await.unwrap();
        assert_eq!(codec.applied.load(Ordering::SeqCst), 2);
        assert_eq!(first, second);
        assert_eq!(fs::read(&first).await.unwrap(), b"Hello\n");
    }

    #[tokio::test]
    async fn test_reconstruct_out_of_range() {
        let (_dir, store) = setup_test(&[100]);
        edit(&store, None, "x").await;
        let revisions = store.list_revisions(date()).await.unwrap();

        let err = store.reconstruct(date(), &revisions, 3).await.unwrap_err();
        assert!(matches!(
            err,
            RevisionError::RevisionNotFound { index: 3, count: 1 }
        ));
    }

    #[tokio::test]
    async fn test_failed_patch_writes_no_cache() {
        let dir = TempDir::new().unwrap();
        let layout = JournalLayout::new(dir.path().join("entries"), dir.path().join("diffs"));
        let store = RevisionStore::new(
            layout,
            Arc::new(DiffCodec::new(MatchMode::Exact)),
            Arc::new(StepClock::new(&[100, 200])),
        );

        edit(&store, None, "Hello\n").await;
        edit(&store, Some("Hello\n"), "Hello world\n").await;
        fs::write(store.layout().entry_path(date()), "Completely different\n")
            .await
            .unwrap();

        let revisions = store.list_revisions(date()).await.unwrap();
        let err = store.reconstruct(date(), &revisions, 0).await.unwrap_err();
        assert!(matches!(err, RevisionError::PatchApply { timestamp: 200, .. }));
        assert!(!fs::try_exists(store.layout().cache_path(date(), 100))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_corrupted_revision() {
        let (_dir, store) = setup_test(&[100, 200]);
        edit(&store, None, "a\n").await;
        edit(&store, Some("a\n"), "b\n").await;
        fs::write(store.layout().revision_path(date(), 200), "garbage")
            .await
            .unwrap();

        let revisions = store.list_revisions(date()).await.unwrap();
        let err = store.reconstruct(date(), &revisions, 0).await.unwrap_err();
        assert!(matches!(err, RevisionError::Corrupted { timestamp: 200, .. }));
    }

    #[tokio::test]
    async fn test_recreation_after_deletion() {
        let (_dir, store) = setup_test(&[100, 200, 300]);
        let entry = store.layout().entry_path(date());

        edit(&store, None, "Draft\n").await;
        store
            .record_edit(date(), Some("Draft\n"), "")
            .await
            .unwrap()
            .unwrap();
        fs::remove_file(&entry).await.unwrap();

        let recreated = edit(&store, None, "Second try\n").await.unwrap();
        assert!(recreated.size_bytes > 0);

        let revisions = store.list_revisions(date()).await.unwrap();
        assert_eq!(revisions.len(), 3);
        assert_eq!(
            store.reconstruct_text(date(), &revisions, 0).await.unwrap(),
            "Draft\n"
        );
        assert_eq!(
            store.reconstruct_text(date(), &revisions, 1).await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_clean_cache_keeps_revisions() {
        let (_dir, store) = setup_test(&[100, 200]);
        edit(&store, None, "a\n").await;
        edit(&store, Some("a\n"), "b\n").await;
        let revisions = store.list_revisions(date()).await.unwrap();
        let cache = store.reconstruct(date(), &revisions, 0).await.unwrap();

        let report = store.clean_cache().await.unwrap();
        assert_eq!(report.removed, vec![cache.clone()]);
        assert!(!cache.exists());

        let revisions = store.list_revisions(date()).await.unwrap();
        assert_eq!(revisions.len(), 2);
        assert_eq!(
            store.reconstruct_text(date(), &revisions, 0).await.unwrap(),
            "a\n"
        );
    }
}
