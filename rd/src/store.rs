//! Config store: definition-file discovery and loading
//!
//! The reminders directory is a flat namespace keyed by file basename.
//! Subdirectories and files with other extensions are ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::debug;

use crate::condition::SyntaxError;
use crate::definition::{DefinitionFile, ReminderDefinition};

/// A definition could not be turned into a reminder
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unknown watcher type '{0}'")]
    UnknownWatcher(String),

    #[error("Unknown alerter type '{0}'")]
    UnknownAlerter(String),

    #[error("Invalid options for {kind}: {message}")]
    InvalidOptions { kind: String, message: String },

    #[error("Invalid condition: {0}")]
    Condition(#[from] SyntaxError),
}

/// Change detector for a definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

/// Basename used as the reminder's identity
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a definition file by basename
    pub fn path_of(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Whether a path looks like a definition file (by extension only)
    pub fn is_definition(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }

    /// Current definition files and their fingerprints, keyed by basename
    pub async fn scan(&self) -> Result<BTreeMap<String, Fingerprint>, ConfigLoadError> {
        debug!(dir = %self.dir.display(), "ConfigStore::scan: called");
        let read_error = |source| ConfigLoadError::Read {
            path: self.dir.display().to_string(),
            source,
        };

        let mut files = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(read_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
            let path = entry.path();
            if !self.is_definition(&path) {
                continue;
            }

            // Entries can vanish between listing and stat
            let Ok(metadata) = tokio::fs::metadata(&path).await else {
                continue;
            };
            if !metadata.is_file() {
                debug!(path = %path.display(), "ConfigStore::scan: skipping non-file");
                continue;
            }

            files.insert(
                basename(&path),
                Fingerprint {
                    modified: metadata.modified().ok(),
                    len: metadata.len(),
                },
            );
        }

        debug!(count = files.len(), "ConfigStore::scan: done");
        Ok(files)
    }

    /// Load one definition file by basename
    ///
    /// Returns `Ok(None)` for files without a `reminder` section, including
    /// empty and comment-only files.
    pub async fn load(&self, file: &str) -> Result<Option<ReminderDefinition>, ConfigLoadError> {
        let path = self.path_of(file);
        debug!(path = %path.display(), "ConfigStore::load: called");
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigLoadError::Read {
                path: path.display().to_string(),
                source,
            })?;
        parse_definition(&content).map_err(|source| ConfigLoadError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Parse definition-file text
pub fn parse_definition(content: &str) -> Result<Option<ReminderDefinition>, serde_yaml::Error> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    if !value.is_mapping() {
        debug!("parse_definition: no mapping at top level");
        return Ok(None);
    }
    let file: DefinitionFile = serde_yaml::from_value(value)?;
    Ok(file.reminder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID: &str = "reminder:\n  condition: \"$status > 5\"\n";

    fn store(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path(), vec!["yaml".to_string(), "yml".to_string()])
    }

    #[test]
    fn test_parse_skips_non_definitions() {
        assert!(parse_definition("").unwrap().is_none());
        assert!(parse_definition("# just a comment\n").unwrap().is_none());
        assert!(parse_definition("- a\n- b\n").unwrap().is_none());
        assert!(parse_definition("other: {}\n").unwrap().is_none());
        assert!(parse_definition(VALID).unwrap().is_some());
    }

    #[test]
    fn test_parse_error() {
        assert!(parse_definition("reminder: [unclosed").is_err());
        assert!(parse_definition("reminder:\n  watcher:\n    type: static\n").is_err());
    }

    #[tokio::test]
    async fn test_scan_filters_by_extension_and_kind() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.yaml"), VALID).unwrap();
        std::fs::write(dir.path().join("b.yml"), VALID).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested.yaml")).unwrap();

        let files = store(&dir).scan().await.unwrap();
        let names: Vec<_> = files.keys().cloned().collect();
        assert_eq!(names, vec!["a.yaml", "b.yml"]);
        assert_eq!(files["a.yaml"].len, VALID.len() as u64);
    }

    #[tokio::test]
    async fn test_scan_missing_dir() {
        let store = ConfigStore::new("/nonexistent/reminders", vec!["yaml".to_string()]);
        assert!(matches!(store.scan().await, Err(ConfigLoadError::Read { .. })));
    }

    #[tokio::test]
    async fn test_load() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.yaml"), VALID).unwrap();
        std::fs::write(dir.path().join("empty.yaml"), "# nothing here\n").unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "reminder: [").unwrap();
        let store = store(&dir);

        let def = store.load("a.yaml").await.unwrap().unwrap();
        assert_eq!(def.condition, "$status > 5");
        assert!(store.load("empty.yaml").await.unwrap().is_none());
        assert!(matches!(store.load("bad.yaml").await, Err(ConfigLoadError::Parse { .. })));
        assert!(matches!(store.load("gone.yaml").await, Err(ConfigLoadError::Read { .. })));
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename(Path::new("/etc/reminders/a.yaml")), "a.yaml");
    }
}
