//! Directory-backed store: one JSON file per key.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::warn;

use super::KeyValueStore;

/// Directory under the user's data directory used by default.
pub const DEFAULT_DATA_DIR: &str = "game-backlog";

/// Store keeping one JSON file per key inside a directory.
///
/// Writes land in a temporary file in the same directory and are renamed
/// over the target, so a reader never sees a half-written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DATA_DIR)
    }

    /// Directory holding the value files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", sanitize_component(key)))
    }

    fn stage(&self, value: &str) -> Result<NamedTempFile> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let mut staged = NamedTempFile::new_in(&self.root)
            .with_context(|| format!("failed to stage a write in {}", self.root.display()))?;
        staged
            .write_all(value.as_bytes())
            .and_then(|_| staged.flush())
            .context("failed to write staged value")?;
        Ok(staged)
    }

    fn roll_back(&self, committed: Vec<(&str, Option<String>)>) {
        for (key, previous) in committed.into_iter().rev() {
            let restored = match previous {
                Some(value) => self.set(key, &value),
                None => self.remove(key),
            };
            if let Err(err) = restored {
                warn!(key, ?err, "Failed to roll back a partial commit");
            }
        }
    }

    fn commit(&self, key: &str, staged: NamedTempFile) -> Result<()> {
        let path = self.path_for(key);
        staged
            .persist(&path)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let staged = self.stage(value)?;
        self.commit(key, staged)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        // Stage every value and remember the previous ones before touching any target file.
        let mut staged = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let previous = self.get(key)?;
            staged.push((*key, previous, self.stage(value)?));
        }

        let mut committed: Vec<(&str, Option<String>)> = Vec::with_capacity(staged.len());
        for (key, previous, file) in staged {
            if let Err(err) = self.commit(key, file) {
                self.roll_back(committed);
                return Err(err);
            }
            committed.push((key, previous));
        }
        Ok(())
    }
}

fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        "value".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_get_remove_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get("backlog_games")?, None);
        store.set("backlog_games", "[1]")?;
        assert!(store.path_for("backlog_games").exists());
        assert_eq!(store.get("backlog_games")?.as_deref(), Some("[1]"));

        store.set("backlog_games", "[2]")?;
        assert_eq!(store.get("backlog_games")?.as_deref(), Some("[2]"));

        store.remove("backlog_games")?;
        store.remove("backlog_games")?;
        assert_eq!(store.get("backlog_games")?, None);
        Ok(())
    }

    #[test]
    fn set_many_leaves_no_staging_files() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path());
        store.set_many(&[("a", "1".to_string()), ("b", "2".to_string())])?;

        let mut names: Vec<_> = fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.json", "b.json"]);
        Ok(())
    }

    #[test]
    fn set_many_fails_without_touching_earlier_keys() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path());
        store.set("a", "old")?;
        fs::create_dir_all(store.path_for("b").join("blocked"))?;

        let result = store.set_many(&[("a", "new".to_string()), ("b", "2".to_string())]);
        assert!(result.is_err());
        assert_eq!(store.get("a")?.as_deref(), Some("old"));
        Ok(())
    }

    #[test]
    fn roll_back_restores_previous_values() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path());
        store.set("a", "new")?;
        store.set("c", "created")?;

        store.roll_back(vec![("a", Some("old".to_string())), ("c", None)]);
        assert_eq!(store.get("a")?.as_deref(), Some("old"));
        assert_eq!(store.get("c")?, None);
        Ok(())
    }

    #[test]
    fn sanitize_creates_safe_filenames() {
        assert_eq!(sanitize_component("backlog:games/../x"), "backloggamesx");
        assert_eq!(sanitize_component("***"), "value");
    }
}
