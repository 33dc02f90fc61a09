//! Command handlers.

use anyhow::Context;
use daybook_core::date::{format_date, month_days};
use daybook_core::editor::EditOutcome;
use daybook_core::{EntryDate, EntryEditor, ExternalEditor, MetadataCache, ResolvedConfig};
use daybook_revision::RevisionStore;
use daybook_util::{format_size, format_time};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a single invocation works with, built once from the config.
pub struct App {
    config: ResolvedConfig,
    store: Arc<RevisionStore>,
    editor: EntryEditor,
    metadata: MetadataCache,
}

impl App {
    pub fn new(config: ResolvedConfig) -> Self {
        let store = Arc::new(RevisionStore::with_match_mode(
            config.layout(),
            config.patch_match,
        ));
        let editor = EntryEditor::new(
            store.clone(),
            Arc::new(ExternalEditor::new(&config.editor)),
            config.empty_entry,
        );
        let metadata = MetadataCache::new(
            store.clone(),
            &config.metadata_dir,
            config.tags_label.clone(),
        );

        Self {
            config,
            store,
            editor,
            metadata,
        }
    }

    /// Edit one day's entry in the external editor.
    pub async fn edit(&mut self, date: EntryDate) -> anyhow::Result<()> {
        let outcome = self
            .editor
            .edit(date)
            .await
            .with_context(|| format!("editing {date}"))?;

        let message = match &outcome {
            EditOutcome::Created(_) => format!("Created entry for {}", format_date(date)),
            EditOutcome::Modified(revision) => format!(
                "Recorded edit of {} ({})",
                format_date(date),
                format_size(revision.size_bytes)
            ),
            EditOutcome::Unchanged => format!("No changes to {}", format_date(date)),
            EditOutcome::Abandoned => format!("Nothing written for {}", format_date(date)),
            EditOutcome::Deleted(_) => format!("Deleted entry for {}", format_date(date)),
        };

        if !matches!(outcome, EditOutcome::Unchanged | EditOutcome::Abandoned) {
            self.metadata.refresh_day(date).await?;
        }
        println!("{message}");
        Ok(())
    }

    /// List revisions: index, time, and size (or `created` for the first).
    pub async fn history(&self, date: EntryDate, json: bool) -> anyhow::Result<()> {
        let revisions = self.store.list_revisions(date).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&revisions)?);
            return Ok(());
        }

        if revisions.is_empty() {
            println!("No revisions for {}", format_date(date));
            return Ok(());
        }

        for (index, revision) in revisions.iter().enumerate() {
            let detail = if index == 0 {
                "created".to_string()
            } else {
                format_size(revision.size_bytes)
            };
            println!(
                "{:>3}  {}  {}",
                index,
                format_time(revision.timestamp, true),
                detail
            );
        }
        Ok(())
    }

    /// Reconstruct a past version and print or open it.
    pub async fn show(&self, date: EntryDate, index: usize, open: bool) -> anyhow::Result<()> {
        let revisions = self.store.list_revisions(date).await?;
        let path = self
            .store
            .reconstruct(date, &revisions, index)
            .await
            .with_context(|| format!("reconstructing {date} at revision {index}"))?;

        if open {
            self.editor.open_readonly(&path).await?;
        } else {
            let text = tokio::fs::read_to_string(&path).await?;
            print!("{text}");
        }
        Ok(())
    }

    pub async fn info(&mut self, date: EntryDate) -> anyhow::Result<()> {
        println!("{}", self.metadata.describe(date).await?);
        Ok(())
    }

    /// Plain listing of the month's days that have entries.
    pub async fn month(&mut self, year: i32, month: u32) -> anyhow::Result<()> {
        let Some(first) = month_days(year, month).next() else {
            anyhow::bail!("invalid month {year}-{month:02}");
        };
        let title = first.naive().format("%B %Y").to_string();
        let summaries = self.metadata.get(year, month).await?;

        let mut any = false;
        println!("{title}");
        for (day, meta) in summaries.days() {
            any = true;
            let mut line = format!("{:>2}  {:>5} words", day, meta.words);
            if let Some(edits) = &meta.edits {
                if edits.edit_count > 0 {
                    line.push_str(&format!("  {} edits", edits.edit_count));
                }
            }
            if !meta.tags.is_empty() {
                line.push_str(&format!("  [{}]", meta.tags.join(", ")));
            }
            println!("{line}");
        }
        if !any {
            println!("No entries");
        }
        Ok(())
    }

    pub async fn clean(&self) -> anyhow::Result<()> {
        let report = self.store.clean_cache().await?;
        println!("Removed {} cached versions", report.removed.len());
        for (path, reason) in &report.failures {
            eprintln!("Could not clean {}: {}", path.display(), reason);
        }
        Ok(())
    }

    pub fn show_config(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(&self.config)?);
        Ok(())
    }

    /// Flush metadata and, if configured, sweep reconstruction caches.
    pub async fn finish(&mut self) -> anyhow::Result<()> {
        self.metadata.write_all().await?;

        if self.config.clean_on_exit {
            match self.store.clean_cache().await {
                Ok(report) if !report.is_clean() => {
                    warn!("{} caches could not be removed", report.failures.len())
                }
                Ok(report) => info!("Exit cleanup removed {} caches", report.removed.len()),
                Err(e) => warn!("Exit cleanup failed: {}", e),
            }
        }
        Ok(())
    }
}
