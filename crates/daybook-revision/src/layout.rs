//! On-disk layout of entries and revisions.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffix of reconstruction cache files.
pub const CACHE_SUFFIX: &str = ".tmp";

/// Suffix of a cache file while it is being written.
pub const PARTIAL_SUFFIX: &str = ".partial.tmp";

/// The calendar day an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryDate(NaiveDate);

impl EntryDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// `None` for dates that don't exist on the calendar.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    /// Name of the per-month directory, `YYYY-MM`.
    pub fn month_dir(&self) -> String {
        self.0.format("%Y-%m").to_string()
    }

    /// File name of the entry inside its month directory, `DD`.
    pub fn day_name(&self) -> String {
        format!("{:02}", self.0.day())
    }
}

impl From<NaiveDate> for EntryDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl std::fmt::Display for EntryDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Paths of the two mirrored trees.
///
/// ```text
/// entries_root/
///   2024-03/
///     07                  # live entry text
/// diffs_root/
///   2024-03/
///     07_1709800000       # creation marker (empty)
///     07_1709803600       # reverse patch
///     07_1709800000.tmp   # reconstruction cache
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalLayout {
    entries_root: PathBuf,
    diffs_root: PathBuf,
}

impl JournalLayout {
    pub fn new(entries_root: impl Into<PathBuf>, diffs_root: impl Into<PathBuf>) -> Self {
        Self {
            entries_root: entries_root.into(),
            diffs_root: diffs_root.into(),
        }
    }

    pub fn entries_root(&self) -> &Path {
        &self.entries_root
    }

    pub fn diffs_root(&self) -> &Path {
        &self.diffs_root
    }

    pub fn entry_month_dir(&self, date: EntryDate) -> PathBuf {
        self.entries_root.join(date.month_dir())
    }

    pub fn entry_path(&self, date: EntryDate) -> PathBuf {
        self.entry_month_dir(date).join(date.day_name())
    }

    pub fn diff_dir(&self, date: EntryDate) -> PathBuf {
        self.diffs_root.join(date.month_dir())
    }

    /// `<diffs_root>/<YYYY-MM>/<DD>_<timestamp>`
    pub fn revision_path(&self, date: EntryDate, timestamp: i64) -> PathBuf {
        self.diff_dir(date)
            .join(format!("{}_{}", date.day_name(), timestamp))
    }

    /// `<diffs_root>/<YYYY-MM>/<DD>_<timestamp>.tmp`
    pub fn cache_path(&self, date: EntryDate, timestamp: i64) -> PathBuf {
        self.diff_dir(date)
            .join(format!("{}_{}{}", date.day_name(), timestamp, CACHE_SUFFIX))
    }
}

/// Timestamp of a revision file named `<day>_<timestamp>`.
///
/// Caches and anything else in the directory give `None`.
pub fn parse_revision_name(name: &str, day: &str) -> Option<i64> {
    name.strip_prefix(day)?
        .strip_prefix('_')?
        .parse()
        .ok()
}
