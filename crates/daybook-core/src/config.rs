//! Configuration management for daybook.
//!
//! Configuration is loaded from multiple sources and merged:
//! 1. Global config: `~/.config/daybook/config.json` (or `config.jsonc`)
//! 2. Environment variable: `DAYBOOK_CONFIG_CONTENT`
//! 3. Explicit file passed with `--config`
//!
//! Supports JSONC (JSON with comments) and variable substitution:
//! - `{env:VAR_NAME}` - Substitute environment variable
//! - `{file:path}` - Substitute file contents
//!
//! The merged [`Config`] is resolved once into an immutable
//! [`ResolvedConfig`] with every default filled in.

use crate::editor::EmptyEntryPolicy;
use crate::error::{ConfigError, CoreResult};
use daybook_revision::{JournalLayout, MatchMode};
use daybook_util::path::expand_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable holding inline config content.
pub const CONFIG_CONTENT_ENV: &str = "DAYBOOK_CONFIG_CONTENT";

/// Editor used when neither the config nor the environment names one.
pub const DEFAULT_EDITOR: &str = "vim";

/// Label marking a line of comma-separated tags.
pub const DEFAULT_TAGS_LABEL: &str = "TAGS:";

/// Static regex for variable substitution, compiled once.
static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

/// Get the variable substitution regex, compiling it once on first use.
fn var_regex() -> &'static regex::Regex {
    VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{(env|file):([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Configuration as written in a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON Schema reference.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Root of the journal data. `~` is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Entries tree. Defaults to `<data_dir>/entries`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries_dir: Option<String>,

    /// Revisions tree. Defaults to `<data_dir>/diffs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diffs_dir: Option<String>,

    /// Month metadata files. Defaults to `<data_dir>/metadata`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_dir: Option<String>,

    /// Editor command; the entry path is appended as the last argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,

    /// Prefix of tag lines in entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_label: Option<String>,

    /// How strictly reverse patches must match when rebuilding history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_match: Option<MatchMode>,

    /// What to do with an entry left empty by the editor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_entry: Option<EmptyEntryPolicy>,

    /// Remove reconstruction caches when the program exits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_on_exit: Option<bool>,

    /// Log level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

/// Log level names accepted in config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for daybook_util::log::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::Trace,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

/// Configuration with every default applied, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub entries_dir: PathBuf,
    pub diffs_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub editor: String,
    pub tags_label: String,
    pub patch_match: MatchMode,
    pub empty_entry: EmptyEntryPolicy,
    pub clean_on_exit: bool,
    pub log_level: LogLevel,
}

impl ResolvedConfig {
    /// Layout of the entries and revisions trees.
    pub fn layout(&self) -> JournalLayout {
        JournalLayout::new(&self.entries_dir, &self.diffs_dir)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Loading order (later sources override earlier):
    /// 1. Global config from `~/.config/daybook/`
    /// 2. `DAYBOOK_CONFIG_CONTENT` environment variable
    /// 3. `explicit` file, which must exist
    pub async fn load(explicit: Option<&Path>) -> CoreResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        // 1. Load global config
        if let Some(global_dir) = Self::global_config_dir() {
            for name in &["config.json", "config.jsonc"] {
                let path = global_dir.join(name);
                if path.exists() {
                    let loaded = Self::load_file(&path).await?;
                    config = config.merge(loaded);
                    sources.push(path);
                    break;
                }
            }
        }

        // 2. Load from environment variable
        if let Ok(content) = std::env::var(CONFIG_CONTENT_ENV) {
            let content = Self::substitute_variables(&content, Path::new("."))?;
            let loaded = Self::parse_jsonc(&content, "<env>")?;
            config = config.merge(loaded);
        }

        // 3. Load the explicit config file
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            let loaded = Self::load_file(path).await?;
            config = config.merge(loaded);
            sources.push(path.to_path_buf());
        }

        Ok((config, sources))
    }

    /// Get the global config directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        daybook_util::path::config_dir()
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let content = Self::substitute_variables(&content, path)?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    /// Apply defaults, using the process environment for the editor.
    pub fn resolve(self) -> CoreResult<ResolvedConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Apply defaults, looking up environment variables through `env`.
    pub fn resolve_with(self, env: impl Fn(&str) -> Option<String>) -> CoreResult<ResolvedConfig> {
        let data_dir = match &self.data_dir {
            Some(dir) => expand_path(dir, "data_dir")?,
            None => daybook_util::path::data_dir().ok_or_else(|| {
                ConfigError::InvalidPath("Could not determine data directory".to_string())
            })?,
        };

        let subdir = |value: &Option<String>, field: &str, default: &str| match value {
            Some(dir) => expand_path(dir, field),
            None => Ok(data_dir.join(default)),
        };
        let entries_dir = subdir(&self.entries_dir, "entries_dir", "entries")?;
        let diffs_dir = subdir(&self.diffs_dir, "diffs_dir", "diffs")?;
        let metadata_dir = subdir(&self.metadata_dir, "metadata_dir", "metadata")?;

        let editor = self
            .editor
            .or_else(|| env("EDITOR"))
            .or_else(|| env("VISUAL"))
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());

        let tags_label = self
            .tags_label
            .unwrap_or_else(|| DEFAULT_TAGS_LABEL.to_string());
        if tags_label.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "tags_label must not be empty".to_string(),
            }
            .into());
        }

        Ok(ResolvedConfig {
            entries_dir,
            diffs_dir,
            metadata_dir,
            editor,
            tags_label,
            patch_match: self.patch_match.unwrap_or_default(),
            empty_entry: self.empty_entry.unwrap_or_default(),
            clean_on_exit: self.clean_on_exit.unwrap_or(true),
            log_level: self.log_level.unwrap_or_default(),
        })
    }

    /// Parse JSONC (JSON with comments).
    pub fn parse_jsonc(content: &str, source: &str) -> CoreResult<Self> {
        // Strip comments (// and /* */)
        let stripped = Self::strip_comments(content);

        serde_json::from_str(&stripped).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Strip JSON comments.
    fn strip_comments(input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        let mut in_string = false;
        let mut escape_next = false;

        while let Some(c) = chars.next() {
            if escape_next {
                result.push(c);
                escape_next = false;
                continue;
            }

            if c == '\\' && in_string {
                result.push(c);
                escape_next = true;
                continue;
            }

            if c == '"' {
                in_string = !in_string;
                result.push(c);
                continue;
            }

            if in_string || c != '/' {
                result.push(c);
                continue;
            }

            match chars.peek() {
                Some('/') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = ' ';
                    for c in chars.by_ref() {
                        if prev == '*' && c == '/' {
                            break;
                        }
                        // Keep line numbers stable for error messages
                        if c == '\n' {
                            result.push('\n');
                        }
                        prev = c;
                    }
                }
                _ => result.push(c),
            }
        }

        result
    }

    /// Substitute `{env:VAR}` and `{file:path}` references.
    ///
    /// File references are relative to the directory of `config_path`.
    fn substitute_variables(content: &str, config_path: &Path) -> CoreResult<String> {
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        let mut result = content.to_string();

        for cap in var_regex().captures_iter(content) {
            let (Some(full_match), Some(kind), Some(value)) = (cap.get(0), cap.get(1), cap.get(2))
            else {
                continue;
            };
            let value = value.as_str();

            let replacement = match kind.as_str() {
                "env" => std::env::var(value).map_err(|_| ConfigError::EnvVarNotFound {
                    name: value.to_string(),
                })?,
                "file" => {
                    let file_path = config_dir.join(value);
                    std::fs::read_to_string(&file_path)
                        .map_err(|_| ConfigError::FileRefNotFound {
                            path: file_path.display().to_string(),
                        })?
                        .trim()
                        .to_string()
                }
                _ => continue,
            };

            result = result.replace(full_match.as_str(), &replacement);
        }

        Ok(result)
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(self, other: Self) -> Self {
        Self {
            schema: other.schema.or(self.schema),
            data_dir: other.data_dir.or(self.data_dir),
            entries_dir: other.entries_dir.or(self.entries_dir),
            diffs_dir: other.diffs_dir.or(self.diffs_dir),
            metadata_dir: other.metadata_dir.or(self.metadata_dir),
            editor: other.editor.or(self.editor),
            tags_label: other.tags_label.or(self.tags_label),
            patch_match: other.patch_match.or(self.patch_match),
            empty_entry: other.empty_entry.or(self.empty_entry),
            clean_on_exit: other.clean_on_exit.or(self.clean_on_exit),
            log_level: other.log_level.or(self.log_level),
        }
    }
}

fn expand_path(value: &str, field: &str) -> CoreResult<PathBuf> {
    expand_home(value).map_err(|e| ConfigError::InvalidPath(format!("{field}: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_strip_comments() {
        let input = r#"{
            // Line comment
            "editor": "nano", // trailing comment
            /* block comment */
            "tags_label": "val/*not a comment*/ue"
        }"#;

        let result = Config::strip_comments(input);
        assert!(!result.contains("Line comment"));
        assert!(!result.contains("trailing comment"));
        assert!(!result.contains("block comment"));
        assert!(result.contains("val/*not a comment*/ue"));
    }

    #[test]
    fn test_parse_jsonc() {
        let input = r#"{
            // This is a comment
            "editor": "nano -w",
            "patch_match": "exact",
            "empty_entry": "delete",
            "log_level": "debug"
        }"#;

        let config = Config::parse_jsonc(input, "test").unwrap();
        assert_eq!(config.editor.as_deref(), Some("nano -w"));
        assert_eq!(config.patch_match, Some(MatchMode::Exact));
        assert_eq!(config.empty_entry, Some(EmptyEntryPolicy::Delete));
        assert_eq!(config.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_parse_jsonc_rejects_unknown_mode() {
        let err = Config::parse_jsonc(r#"{"patch_match": "sloppy"}"#, "test").unwrap_err();
        assert!(err.to_string().contains("invalid config at test"));
    }

    #[test]
    fn test_merge_config() {
        let base = Config {
            editor: Some("vim".to_string()),
            data_dir: Some("/base".to_string()),
            ..Default::default()
        };
        let other = Config {
            editor: Some("nano".to_string()),
            clean_on_exit: Some(false),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.editor.as_deref(), Some("nano"));
        assert_eq!(merged.data_dir.as_deref(), Some("/base"));
        assert_eq!(merged.clean_on_exit, Some(false));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = Config {
            data_dir: Some("/journal".to_string()),
            ..Default::default()
        };

        let resolved = config.resolve_with(no_env).unwrap();
        assert_eq!(resolved.entries_dir, PathBuf::from("/journal/entries"));
        assert_eq!(resolved.diffs_dir, PathBuf::from("/journal/diffs"));
        assert_eq!(resolved.metadata_dir, PathBuf::from("/journal/metadata"));
        assert_eq!(resolved.editor, DEFAULT_EDITOR);
        assert_eq!(resolved.tags_label, "TAGS:");
        assert_eq!(resolved.patch_match, MatchMode::Fuzzy);
        assert_eq!(resolved.empty_entry, EmptyEntryPolicy::Keep);
        assert!(resolved.clean_on_exit);
    }

    #[test]
    fn test_resolve_explicit_dirs_win() {
        let config = Config {
            data_dir: Some("/journal".to_string()),
            diffs_dir: Some("/elsewhere/history".to_string()),
            ..Default::default()
        };

        let resolved = config.resolve_with(no_env).unwrap();
        assert_eq!(resolved.entries_dir, PathBuf::from("/journal/entries"));
        assert_eq!(resolved.diffs_dir, PathBuf::from("/elsewhere/history"));
    }

    #[test]
    fn test_resolve_editor_from_environment() {
        let config = Config {
            data_dir: Some("/journal".to_string()),
            ..Default::default()
        };
        let resolved = config
            .clone()
            .resolve_with(|name| (name == "VISUAL").then(|| "code --wait".to_string()))
            .unwrap();
        assert_eq!(resolved.editor, "code --wait");

        let resolved = config
            .resolve_with(|name| match name {
                "EDITOR" => Some("nano".to_string()),
                "VISUAL" => Some("code --wait".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(resolved.editor, "nano");
    }

    #[test]
    fn test_resolve_rejects_empty_tags_label() {
        let config = Config {
            data_dir: Some("/journal".to_string()),
            tags_label: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.resolve_with(no_env).is_err());
    }

    #[tokio::test]
    async fn test_load_file_with_file_reference() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("editor.txt"), "emacs -nw\n").unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                // editor kept in a separate file
                "editor": "{file:editor.txt}",
                "clean_on_exit": false
            }"#,
        )
        .unwrap();

        let config = Config::load_file(&path).await.unwrap();
        assert_eq!(config.editor.as_deref(), Some("emacs -nw"));
        assert_eq!(config.clean_on_exit, Some(false));
    }

    #[tokio::test]
    async fn test_load_file_missing_reference() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"editor": "{file:absent.txt}"}"#).unwrap();

        let err = Config::load_file(&path).await.unwrap_err();
        assert!(err.to_string().contains("file reference not found"));
    }

    #[tokio::test]
    async fn test_load_explicit_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        let err = Config::load(Some(&missing)).await.unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_resolved_config_serializes() {
        let config = Config {
            data_dir: Some("/journal".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(config.resolve_with(no_env).unwrap()).unwrap();
        assert_eq!(json["patch_match"], "fuzzy");
        assert_eq!(json["empty_entry"], "keep");
        assert_eq!(json["entries_dir"], "/journal/entries");
    }
}
