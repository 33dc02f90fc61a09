//! Edit sessions: run the user's editor on an entry and record the result.

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use daybook_revision::{EntryDate, Revision, RevisionStore};
use daybook_util::path::with_suffix;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Suffix of the pre-edit copy kept next to an entry during a session.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Runs an editor on a file and waits for it to exit.
#[async_trait]
pub trait EditorLauncher: Send + Sync {
    /// Exit code of the editor, `None` when it was killed by a signal.
    async fn launch(&self, path: &Path) -> CoreResult<Option<i32>>;
}

/// The user's configured editor command.
///
/// The command is split on whitespace and the file path is appended as its
/// own argument, so paths with spaces survive. Shell syntax is not interpreted.
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl EditorLauncher for ExternalEditor {
    async fn launch(&self, path: &Path) -> CoreResult<Option<i32>> {
        let mut parts = self.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(CoreError::EditorLaunch {
                command: self.command.clone(),
                source: std::io::Error::new(ErrorKind::InvalidInput, "empty editor command"),
            });
        };

        debug!("Launching {} on {:?}", self.command, path);
        let status = tokio::process::Command::new(program)
            .args(parts)
            .arg(path)
            .status()
            .await
            .map_err(|source| CoreError::EditorLaunch {
                command: self.command.clone(),
                source,
            })?;

        Ok(status.code())
    }
}

/// What to do with an entry the editor left empty or whitespace-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyEntryPolicy {
    /// Record the empty text like any other edit.
    #[default]
    Keep,
    /// Record the edit, then remove the entry file.
    Delete,
}

/// Result of one edit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// A new entry was written.
    Created(Revision),
    /// An existing entry changed.
    Modified(Revision),
    /// The editor exited without changing anything.
    Unchanged,
    /// The editor left no file for an entry that didn't exist.
    Abandoned,
    /// The entry was removed; the revision undoing the removal, if one was recorded.
    Deleted(Option<Revision>),
}

/// Runs edit sessions against a revision store.
pub struct EntryEditor {
    store: Arc<RevisionStore>,
    launcher: Arc<dyn EditorLauncher>,
    empty_entry: EmptyEntryPolicy,
}

impl EntryEditor {
    pub fn new(
        store: Arc<RevisionStore>,
        launcher: Arc<dyn EditorLauncher>,
        empty_entry: EmptyEntryPolicy,
    ) -> Self {
        Self {
            store,
            launcher,
            empty_entry,
        }
    }

    pub fn store(&self) -> &RevisionStore {
        &self.store
    }

    /// Edit the entry for `date` and record the change.
    ///
    /// The pre-edit text is copied to `<DD>.bak` and kept until the revision
    /// is on disk, so a failed write never loses the previous version.
    pub async fn edit(&self, date: EntryDate) -> CoreResult<EditOutcome> {
        // The editor needs the month directory to save into
        let month_dir = self.store.layout().entry_month_dir(date);
        let created_dir = !fs::try_exists(&month_dir).await?;
        let path = self.store.ensure_entry_dir(date).await?;
        let before = read_optional(&path).await?;

        let backup = with_suffix(&path, BACKUP_SUFFIX);
        if let Some(text) = &before {
            fs::write(&backup, text).await?;
        }

        match self.launcher.launch(&path).await? {
            Some(0) => {}
            Some(code) => warn!("Editor exited with code {} for {}", code, date),
            None => warn!("Editor was terminated by a signal while editing {}", date),
        }

        let after = read_optional(&path).await?;
        let outcome = self.record(date, &path, before.as_deref(), after).await?;

        if before.is_some() {
            fs::remove_file(&backup).await?;
        }
        if created_dir && outcome == EditOutcome::Abandoned {
            // Fails harmlessly if anything else landed there meanwhile
            if let Err(e) = fs::remove_dir(&month_dir).await {
                debug!("Kept month directory {:?}: {}", month_dir, e);
            }
        }
        info!("Edit of {} finished: {:?}", date, outcome);
        Ok(outcome)
    }

    async fn record(
        &self,
        date: EntryDate,
        path: &Path,
        before: Option<&str>,
        after: Option<String>,
    ) -> CoreResult<EditOutcome> {
        let Some(after) = after else {
            return Ok(match before {
                None => EditOutcome::Abandoned,
                // The editor removed the file itself
                Some(before) => {
                    EditOutcome::Deleted(self.store.record_edit(date, Some(before), "").await?)
                }
            });
        };

        if self.empty_entry == EmptyEntryPolicy::Delete && after.trim().is_empty() {
            // Recorded against "", which is what a missing entry reads as
            let revision = match before {
                Some(before) => self.store.record_edit(date, Some(before), "").await?,
                None => None,
            };
            fs::remove_file(path).await?;
            debug!("Removed empty entry {}", date);
            return Ok(match before {
                Some(_) => EditOutcome::Deleted(revision),
                None => EditOutcome::Abandoned,
            });
        }

        let revision = self.store.record_edit(date, before, &after).await?;
        Ok(match (before, revision) {
            (None, Some(revision)) => EditOutcome::Created(revision),
            (Some(_), Some(revision)) => EditOutcome::Modified(revision),
            (_, None) => EditOutcome::Unchanged,
        })
    }

    /// Open a reconstructed version for viewing.
    ///
    /// The file is made read-only first, since caches are reused as-is.
    pub async fn open_readonly(&self, path: &Path) -> CoreResult<()> {
        let mut permissions = fs::metadata(path).await?.permissions();
        permissions.set_readonly(true);
        fs::set_permissions(path, permissions).await?;

        if let Some(code) = self.launcher.launch(path).await? {
            if code != 0 {
                warn!("Viewer exited with code {} for {:?}", code, path);
            }
        }
        Ok(())
    }
}

/// Read a file, treating a missing file as `None`.
pub async fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Backup path used while editing `entry`.
pub fn backup_path(entry: &Path) -> PathBuf {
    with_suffix(entry, BACKUP_SUFFIX)
}
