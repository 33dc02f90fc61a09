//! Removal of stale reconstruction caches.

use crate::layout::CACHE_SUFFIX;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What a janitor pass did.
#[derive(Debug, Default)]
pub struct JanitorReport {
    /// Cache files deleted.
    pub removed: Vec<PathBuf>,

    /// Files or directories that could not be read or deleted, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl JanitorReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delete every file under `root` whose name ends with the cache suffix.
///
/// Errors on single files or directories are recorded and the walk goes on.
/// A missing root is an empty pass.
pub fn clean_tmp(root: &Path) -> JanitorReport {
    let mut report = JanitorReport::default();
    if !root.exists() {
        debug!("No diffs directory at {:?}, nothing to clean", root);
        return report;
    }

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                warn!("Could not read {:?} while cleaning caches: {}", path, e);
                report.failures.push((path, e.to_string()));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let is_cache = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(CACHE_SUFFIX));
        if !is_cache {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!("Removed cache {:?}", entry.path());
                report.removed.push(entry.into_path());
            }
            Err(e) => {
                warn!("Failed to remove cache {:?}: {}", entry.path(), e);
                report.failures.push((entry.into_path(), e.to_string()));
            }
        }
    }

    if !report.removed.is_empty() {
        info!("Removed {} reconstruction caches", report.removed.len());
    }
    report
}
