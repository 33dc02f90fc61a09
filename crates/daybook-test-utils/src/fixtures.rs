//! Temporary journals for tests.

use crate::mocks::ManualClock;
use daybook_revision::{
    DiffCodec, EntryDate, JournalLayout, MatchMode, PatchCodec, RevisionStore, CACHE_SUFFIX,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Shorthand for a date known to be valid.
pub fn date(year: i32, month: u32, day: u32) -> EntryDate {
    EntryDate::from_ymd(year, month, day).expect("valid test date")
}

/// Builder for a journal in a temporary directory.
#[derive(Default)]
pub struct TestJournal {
    entries: Vec<(EntryDate, String)>,
}

impl TestJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry file with no recorded history.
    pub fn with_entry(mut self, date: EntryDate, text: impl Into<String>) -> Self {
        self.entries.push((date, text.into()));
        self
    }

    /// Create the directory tree and seeded entries.
    pub fn build(self) -> BuiltTestJournal {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let journal = BuiltTestJournal { temp_dir };

        for (date, text) in &self.entries {
            journal.write_entry(*date, text);
        }

        journal
    }
}

/// A journal on disk, removed when dropped.
pub struct BuiltTestJournal {
    temp_dir: TempDir,
}

impl BuiltTestJournal {
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn entries_dir(&self) -> PathBuf {
        self.path().join("entries")
    }

    pub fn diffs_dir(&self) -> PathBuf {
        self.path().join("diffs")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.path().join("metadata")
    }

    pub fn layout(&self) -> JournalLayout {
        JournalLayout::new(self.entries_dir(), self.diffs_dir())
    }

    /// Fuzzy-matching store driven by `clock`.
    pub fn store(&self, clock: Arc<ManualClock>) -> RevisionStore {
        self.store_with(Arc::new(DiffCodec::new(MatchMode::Fuzzy)), clock)
    }

    pub fn store_with(&self, codec: Arc<dyn PatchCodec>, clock: Arc<ManualClock>) -> RevisionStore {
        RevisionStore::new(self.layout(), codec, clock)
    }

    pub fn entry_path(&self, date: EntryDate) -> PathBuf {
        self.layout().entry_path(date)
    }

    pub fn write_entry(&self, date: EntryDate, text: &str) {
        let path = self.entry_path(date);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create entry dir");
        }
        std::fs::write(&path, text).expect("Failed to write entry");
    }

    pub fn read_entry(&self, date: EntryDate) -> Option<String> {
        std::fs::read_to_string(self.entry_path(date)).ok()
    }

    /// Do what an edit session does: write `text` over the entry and record it.
    pub async fn edit(&self, store: &RevisionStore, date: EntryDate, text: &str) {
        let before = self.read_entry(date);
        if before.is_some() {
            self.write_entry(date, text);
        }
        store
            .record_edit(date, before.as_deref(), text)
            .await
            .expect("Failed to record edit");
    }

    /// Reconstruction caches anywhere under the diffs root.
    pub fn cache_files(&self) -> Vec<PathBuf> {
        WalkDir::new(self.diffs_dir())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().ends_with(CACHE_SUFFIX))
            .map(|e| e.into_path())
            .collect()
    }

    /// Config JSON pointing the CLI at this journal.
    pub fn config_json(&self, editor: &str) -> String {
        serde_json::json!({
            "data_dir": self.path(),
            "metadata_dir": self.metadata_dir(),
            "editor": editor,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_entries() {
        let journal = TestJournal::new()
            .with_entry(date(2024, 3, 7), "hello\n")
            .build();

        assert_eq!(journal.read_entry(date(2024, 3, 7)).as_deref(), Some("hello\n"));
        assert_eq!(journal.read_entry(date(2024, 3, 8)), None);
        assert!(journal.cache_files().is_empty());
    }

    #[test]
    fn test_config_json_names_dirs() {
        let journal = TestJournal::new().build();
        let value: serde_json::Value =
            serde_json::from_str(&journal.config_json("true")).unwrap();
        assert_eq!(value["editor"], "true");
        assert_eq!(
            value["data_dir"].as_str().map(PathBuf::from),
            Some(journal.path().to_path_buf())
        );
    }
}
