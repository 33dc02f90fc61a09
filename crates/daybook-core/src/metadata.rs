//! Per-month summaries of entries: line and word counts, tags, edit history.
//!
//! Summaries are kept in memory per `(year, month)` and persisted to
//! `<metadata_dir>/<YYYY>-<M>.json` on [`MetadataCache::write_all`]. A month
//! without a saved file is scanned from the entries on first access.

use crate::date::{format_date, last_day, EntryDate};
use crate::editor::read_optional;
use crate::error::CoreResult;
use daybook_revision::RevisionStore;
use daybook_util::{format_size, format_time};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Summary of one day's entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMetadata {
    /// Non-blank lines, tag lines excluded.
    pub lines: usize,
    pub words: usize,
    pub tags: Vec<String>,
    /// Entry size in bytes.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edits: Option<EditSummary>,
}

/// When an entry was created and how often it changed since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSummary {
    pub created: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edit: Option<i64>,
    #[serde(default)]
    pub edit_count: usize,
}

/// Loaded summaries of one month.
#[derive(Debug, Clone, Default)]
pub struct MonthMetadata {
    days: BTreeMap<u32, DayMetadata>,
    dirty: bool,
}

impl MonthMetadata {
    pub fn day(&self, day: u32) -> Option<&DayMetadata> {
        self.days.get(&day)
    }

    /// Days that have an entry, in order.
    pub fn days(&self) -> impl Iterator<Item = (u32, &DayMetadata)> {
        self.days.iter().map(|(day, meta)| (*day, meta))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[derive(Serialize, Deserialize)]
struct MonthFile {
    days: BTreeMap<u32, DayMetadata>,
}

/// Month summaries, loaded once per process and flushed at exit.
pub struct MetadataCache {
    store: Arc<RevisionStore>,
    metadata_dir: PathBuf,
    tags_label: String,
    months: HashMap<(i32, u32), MonthMetadata>,
}

impl MetadataCache {
    pub fn new(
        store: Arc<RevisionStore>,
        metadata_dir: impl Into<PathBuf>,
        tags_label: impl Into<String>,
    ) -> Self {
        Self {
            store,
            metadata_dir: metadata_dir.into(),
            tags_label: tags_label.into(),
            months: HashMap::new(),
        }
    }

    /// `<metadata_dir>/<YYYY>-<M>.json`
    pub fn month_path(&self, year: i32, month: u32) -> PathBuf {
        self.metadata_dir.join(format!("{year}-{month}.json"))
    }

    /// Summaries for a month, loading or scanning them on first access.
    pub async fn get(&mut self, year: i32, month: u32) -> CoreResult<&MonthMetadata> {
        let key = (year, month);
        if !self.months.contains_key(&key) {
            let loaded = self.load(year, month).await?;
            self.months.insert(key, loaded);
        }
        Ok(self.months.entry(key).or_default())
    }

    /// Re-scan one day, typically after it was edited.
    pub async fn refresh_day(&mut self, date: EntryDate) -> CoreResult<Option<DayMetadata>> {
        self.get(date.year(), date.month()).await?;
        let scanned = self.scan_day(date).await?;

        let month = self.months.entry((date.year(), date.month())).or_default();
        match &scanned {
            Some(meta) => {
                month.days.insert(date.day(), meta.clone());
            }
            None => {
                month.days.remove(&date.day());
            }
        }
        month.dirty = true;
        Ok(scanned)
    }

    /// Human-readable summary of a day.
    pub async fn describe(&mut self, date: EntryDate) -> CoreResult<String> {
        let month = self.get(date.year(), date.month()).await?;
        let mut output = vec![format_date(date)];

        let Some(meta) = month.day(date.day()) else {
            output.push("No entry for selected date".to_string());
            return Ok(output.join("\n"));
        };

        output.push(format!(
            "{} lines, {} words, {}",
            meta.lines,
            meta.words,
            format_size(meta.size)
        ));
        if !meta.tags.is_empty() {
            output.push(format!("Tags: {}", meta.tags.join(", ")));
        }
        if let Some(edits) = &meta.edits {
            let mut line = format!("Created: {}", format_time(edits.created, false));
            if let Some(last) = edits.last_edit {
                line.push_str(&format!(
                    ", edited {} times, last: {}",
                    edits.edit_count,
                    format_time(last, false)
                ));
            }
            output.push(line);
        }

        Ok(output.join("\n"))
    }

    /// Save every month changed since it was loaded. Returns how many were written.
    pub async fn write_all(&mut self) -> CoreResult<usize> {
        let dirty: Vec<(i32, u32)> = self
            .months
            .iter()
            .filter(|(_, m)| m.dirty)
            .map(|(key, _)| *key)
            .collect();
        if dirty.is_empty() {
            return Ok(0);
        }

        fs::create_dir_all(&self.metadata_dir).await?;
        for (year, month) in &dirty {
            let path = self.month_path(*year, *month);
            let Some(data) = self.months.get_mut(&(*year, *month)) else {
                continue;
            };
            let file = MonthFile {
                days: data.days.clone(),
            };
            fs::write(&path, serde_json::to_string_pretty(&file)?).await?;
            data.dirty = false;
            debug!("Saved metadata {:?}", path);
        }

        info!("Saved metadata for {} months", dirty.len());
        Ok(dirty.len())
    }

    async fn load(&self, year: i32, month: u32) -> CoreResult<MonthMetadata> {
        let path = self.month_path(year, month);
        if let Some(content) = read_optional(&path).await? {
            match serde_json::from_str::<MonthFile>(&content) {
                Ok(file) => {
                    return Ok(MonthMetadata {
                        days: file.days,
                        dirty: false,
                    })
                }
                Err(e) => warn!("Ignoring unreadable metadata {:?}: {}", path, e),
            }
        }

        let mut metadata = MonthMetadata::default();
        for day in 1..=last_day(year, month).unwrap_or(0) {
            let Some(date) = EntryDate::from_ymd(year, month, day) else {
                continue;
            };
            if let Some(meta) = self.scan_day(date).await? {
                metadata.days.insert(day, meta);
                metadata.dirty = true;
            }
        }
        debug!(
            "Scanned {}-{:02}: {} entries",
            year,
            month,
            metadata.days.len()
        );
        Ok(metadata)
    }

    async fn scan_day(&self, date: EntryDate) -> CoreResult<Option<DayMetadata>> {
        let path = self.store.layout().entry_path(date);
        let Some(text) = read_optional(&path).await? else {
            return Ok(None);
        };

        let (lines, words, tags) = count_text(&text, &self.tags_label);
        let edits = match self.store.list_revisions(date).await {
            Ok(revisions) => summarize_edits(&revisions),
            Err(e) => {
                warn!("Could not list revisions of {}: {}", date, e);
                None
            }
        };

        Ok(Some(DayMetadata {
            lines,
            words,
            tags,
            size: text.len() as u64,
            edits,
        }))
    }
}

/// Count non-blank lines and words; lines starting with `tags_label`
/// contribute comma-separated tags instead.
pub fn count_text(text: &str, tags_label: &str) -> (usize, usize, Vec<String>) {
    let mut lines = 0;
    let mut words = 0;
    let mut tags = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix(tags_label) {
            tags.extend(
                rest.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from),
            );
            continue;
        }
        lines += 1;
        words += line.split_whitespace().count();
    }

    (lines, words, tags)
}

fn summarize_edits(revisions: &[daybook_revision::Revision]) -> Option<EditSummary> {
    let first = revisions.first()?;
    let last = revisions.last().filter(|_| revisions.len() > 1);
    Some(EditSummary {
        created: first.timestamp,
        last_edit: last.map(|r| r.timestamp),
        edit_count: revisions.len() - 1,
    })
}
