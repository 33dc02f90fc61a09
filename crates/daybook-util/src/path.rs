//! Path utilities.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Get the daybook configuration directory.
///
/// This follows XDG conventions on Linux/macOS:
/// - `$XDG_CONFIG_HOME/daybook` if set
/// - `~/.config/daybook` otherwise
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("daybook"))
}

/// Get the default journal data directory.
///
/// - `$XDG_DATA_HOME/daybook` if set
/// - `~/.local/share/daybook` otherwise
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("daybook"))
}

/// Get the daybook logs directory.
pub fn logs_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|p| p.join("daybook").join("logs"))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(Error::invalid_input("empty path"));
    }

    if path == "~" || path.starts_with("~/") {
        let home = dirs::home_dir().ok_or_else(|| Error::not_found("home directory"))?;
        let rest = path.trim_start_matches('~').trim_start_matches('/');
        return Ok(if rest.is_empty() { home } else { home.join(rest) });
    }

    Ok(PathBuf::from(path))
}

/// Append a suffix to the final component of a path (`02` -> `02.bak`).
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        if let Some(dir) = config_dir() {
            assert!(dir.ends_with("daybook"));
        }
    }

    #[test]
    fn test_logs_dir() {
        if let Some(dir) = logs_dir() {
            assert!(dir.ends_with("daybook/logs"));
        }
    }

    #[test]
    fn test_expand_home() {
        let plain = expand_home("/var/journal").unwrap();
        assert_eq!(plain, PathBuf::from("/var/journal"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~").unwrap(), home);
            assert_eq!(expand_home("~/notes").unwrap(), home.join("notes"));
        }

        assert!(expand_home("   ").is_err());
    }

    #[test]
    fn test_with_suffix() {
        let path = Path::new("/data/entries/2024-03/07");
        assert_eq!(
            with_suffix(path, ".tmp"),
            PathBuf::from("/data/entries/2024-03/07.tmp")
        );
    }
}
