//! Mock implementations of the clock, codec, and editor seams.

use async_trait::async_trait;
use daybook_core::{CoreResult, EditorLauncher};
use daybook_revision::{Clock, CodecResult, DiffCodec, MatchMode, PatchCodec};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(start),
        })
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// [`DiffCodec`] that counts how often patches are made and applied.
#[derive(Debug)]
pub struct CountingCodec {
    inner: DiffCodec,
    diffs: AtomicUsize,
    applies: AtomicUsize,
}

impl CountingCodec {
    pub fn new(mode: MatchMode) -> Arc<Self> {
        Arc::new(Self {
            inner: DiffCodec::new(mode),
            diffs: AtomicUsize::new(0),
            applies: AtomicUsize::new(0),
        })
    }

    pub fn diffs(&self) -> usize {
        self.diffs.load(Ordering::SeqCst)
    }

    pub fn applies(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }
}

impl PatchCodec for CountingCodec {
    fn reverse_diff(&self, before: &str, after: &str) -> String {
        self.diffs.fetch_add(1, Ordering::SeqCst);
        self.inner.reverse_diff(before, after)
    }

    fn apply(&self, patch: &str, content: &str) -> CodecResult<String> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        self.inner.apply(patch, content)
    }
}

/// One step of a [`ScriptedEditor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    /// Replace the file content.
    Write(String),
    /// Append to the file, creating it if needed.
    Append(String),
    /// Remove the file.
    Delete,
    /// Exit without touching the file.
    Quit,
    /// Exit with a non-zero code without touching the file.
    Fail(i32),
}

/// An editor that plays back queued actions, one per launch.
///
/// Once the script runs out, launches behave like [`EditorAction::Quit`].
#[derive(Debug, Default)]
pub struct ScriptedEditor {
    script: Mutex<VecDeque<EditorAction>>,
    launches: Mutex<Vec<Launch>>,
}

/// What the editor saw when it was launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub path: PathBuf,
    pub content: Option<String>,
    pub readonly: bool,
}

impl ScriptedEditor {
    pub fn new(script: impl IntoIterator<Item = EditorAction>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            launches: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, action: EditorAction) {
        self.script.lock().unwrap().push_back(action);
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }
}

#[async_trait]
impl EditorLauncher for ScriptedEditor {
    async fn launch(&self, path: &Path) -> CoreResult<Option<i32>> {
        // Read before locking; std guards can't be held across an await
        let metadata = tokio::fs::metadata(path).await.ok();
        let content = tokio::fs::read_to_string(path).await.ok();
        self.launches.lock().unwrap().push(Launch {
            path: path.to_path_buf(),
            content,
            readonly: metadata.is_some_and(|m| m.permissions().readonly()),
        });

        let action = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(EditorAction::Quit);
        match action {
            EditorAction::Write(text) => tokio::fs::write(path, text).await?,
            EditorAction::Append(text) => {
                let mut current = tokio::fs::read_to_string(path).await.unwrap_or_default();
                current.push_str(&text);
                tokio::fs::write(path, current).await?;
            }
            EditorAction::Delete => tokio::fs::remove_file(path).await?,
            EditorAction::Quit => {}
            EditorAction::Fail(code) => return Ok(Some(code)),
        }
        Ok(Some(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(5);
        assert_eq!(clock.now(), 105);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn test_counting_codec() {
        let codec = CountingCodec::new(MatchMode::Exact);
        let patch = codec.reverse_diff("a\n", "b\n");
        assert_eq!(codec.apply(&patch, "b\n").unwrap(), "a\n");
        assert_eq!((codec.diffs(), codec.applies()), (1, 1));
    }

    #[tokio::test]
    async fn test_scripted_editor_plays_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("07");
        let editor = ScriptedEditor::new([
            EditorAction::Write("one\n".to_string()),
            EditorAction::Append("two\n".to_string()),
            EditorAction::Fail(2),
        ]);

        assert_eq!(editor.launch(&path).await.unwrap(), Some(0));
        assert_eq!(editor.launch(&path).await.unwrap(), Some(0));
        assert_eq!(editor.launch(&path).await.unwrap(), Some(2));
        assert_eq!(editor.launch(&path).await.unwrap(), Some(0));

        let seen: Vec<_> = editor.launches().into_iter().map(|l| l.content).collect();
        assert_eq!(
            seen,
            vec![
                None,
                Some("one\n".to_string()),
                Some("one\ntwo\n".to_string()),
                Some("one\ntwo\n".to_string()),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_launch_runs_on_spawned_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("07");
        std::fs::write(&path, "before\n").unwrap();
        let editor = ScriptedEditor::new([EditorAction::Write("after\n".to_string())]);

        let task = {
            let editor = editor.clone();
            let path = path.clone();
            tokio::spawn(async move { editor.launch(&path).await })
        };
        assert_eq!(task.await.unwrap().unwrap(), Some(0));

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "after\n");
        assert_eq!(
            editor.launches()[0].content.as_deref(),
            Some("before\n")
        );
    }
}
