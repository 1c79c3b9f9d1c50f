//! Persistence: key-value backends plus the typed store over them.

mod file;
mod memory;

pub use file::{FileStore, DEFAULT_DATA_DIR};
pub use memory::MemoryStore;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    error::BacklogError,
    models::{Game, Tag},
    prefs::Preferences,
    sanitize::{now_millis, sanitize_game_at, sanitize_preferences, sanitize_tag},
};

/// Key holding the game collection.
pub const GAMES_KEY: &str = "backlog_games";
/// Key holding the tag collection.
pub const TAGS_KEY: &str = "backlog_tags";
/// Key holding the preferences object.
pub const PREFS_KEY: &str = "backlog_prefs";
/// Schema version written into export snapshots.
pub const SNAPSHOT_SCHEMA: u32 = 1;

/// Text key-value storage with overwrite semantics.
pub trait KeyValueStore: Send + Sync {
    /// Read the text stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the text stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;

    /// Write several keys as one commit.
    ///
    /// The default writes them one after another. Backends override this
    /// to stage every value first and restore the keys already replaced
    /// when a later write fails.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Games, tags and preferences as one unit, used for import and export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// The game collection.
    pub games: Vec<Game>,
    /// The tag collection.
    pub tags: Vec<Tag>,
    /// User preferences.
    pub prefs: Preferences,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument<'a> {
    schema: u32,
    exported_at: String,
    games: &'a [Game],
    tags: &'a [Tag],
    prefs: &'a Preferences,
}

impl Snapshot {
    /// Serialise as a self-describing export document.
    pub fn to_document(&self, exported_at: DateTime<Utc>) -> Result<String> {
        let document = SnapshotDocument {
            schema: SNAPSHOT_SCHEMA,
            exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            games: &self.games,
            tags: &self.tags,
            prefs: &self.prefs,
        };
        serde_json::to_string_pretty(&document).context("failed to serialize snapshot")
    }

    /// Validate and sanitize an export document.
    ///
    /// Fails with [`BacklogError::InvalidFormat`] unless `text` is a JSON
    /// object whose `games` and `tags` fields are arrays. Tags without a
    /// name are dropped; a missing `prefs` object yields the defaults.
    pub fn parse_document(text: &str) -> Result<Self, BacklogError> {
        let document: Value = serde_json::from_str(text)
            .map_err(|err| BacklogError::invalid_format(format!("not valid JSON: {err}")))?;
        let Some(object) = document.as_object() else {
            return Err(BacklogError::invalid_format("expected a JSON object"));
        };
        let games = object
            .get("games")
            .and_then(Value::as_array)
            .ok_or_else(|| BacklogError::invalid_format("missing `games` array"))?;
        let tags = object
            .get("tags")
            .and_then(Value::as_array)
            .ok_or_else(|| BacklogError::invalid_format("missing `tags` array"))?;

        let now = now_millis();
        Ok(Self {
            games: games.iter().map(|raw| sanitize_game_at(raw, now)).collect(),
            tags: tags.iter().filter_map(sanitize_tag).collect(),
            prefs: object
                .get("prefs")
                .map(sanitize_preferences)
                .unwrap_or_default(),
        })
    }
}

/// Typed access to the persisted games, tags and preferences.
///
/// Reads never fail: a missing key, empty text, unparseable JSON or a
/// backend error yields the empty collection or default preferences.
/// Every record read is re-sanitized.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KeyValueStore>,
}

impl Store {
    /// Wrap a backend.
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Persisted games.
    pub fn games(&self) -> Vec<Game> {
        let now = now_millis();
        self.read_array(GAMES_KEY)
            .iter()
            .map(|raw| sanitize_game_at(raw, now))
            .collect()
    }

    /// Persisted tags, minus records without a name.
    pub fn tags(&self) -> Vec<Tag> {
        self.read_array(TAGS_KEY)
            .iter()
            .filter_map(sanitize_tag)
            .collect()
    }

    /// Persisted preferences merged over the defaults.
    pub fn preferences(&self) -> Preferences {
        self.read_json(PREFS_KEY)
            .map(|value| sanitize_preferences(&value))
            .unwrap_or_default()
    }

    /// Overwrite the persisted games.
    pub fn set_games(&self, games: &[Game]) -> Result<()> {
        self.write(GAMES_KEY, games)
    }

    /// Overwrite the persisted tags.
    pub fn set_tags(&self, tags: &[Tag]) -> Result<()> {
        self.write(TAGS_KEY, tags)
    }

    /// Overwrite the persisted preferences.
    pub fn set_preferences(&self, prefs: &Preferences) -> Result<()> {
        self.write(PREFS_KEY, prefs)
    }

    /// Overwrite games and tags together.
    pub fn set_collection(&self, games: &[Game], tags: &[Tag]) -> Result<()> {
        self.backend
            .set_many(&[
                (GAMES_KEY, encode(GAMES_KEY, games)?),
                (TAGS_KEY, encode(TAGS_KEY, tags)?),
            ])
            .context("failed to write collection")
    }

    /// Overwrite games, tags and preferences in one commit.
    pub fn set_state(&self, games: &[Game], tags: &[Tag], prefs: &Preferences) -> Result<()> {
        self.backend
            .set_many(&[
                (GAMES_KEY, encode(GAMES_KEY, games)?),
                (TAGS_KEY, encode(TAGS_KEY, tags)?),
                (PREFS_KEY, encode(PREFS_KEY, prefs)?),
            ])
            .context("failed to write backlog state")
    }

    /// Read everything currently persisted.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            games: self.games(),
            tags: self.tags(),
            prefs: self.preferences(),
        }
    }

    /// Export the persisted state as one JSON document.
    pub fn export_snapshot(&self) -> Result<String> {
        self.snapshot().to_document(Utc::now())
    }

    /// Replace all persisted state with the contents of an export document.
    ///
    /// Nothing is written when validation fails. On success the three keys
    /// are written in one [`KeyValueStore::set_many`] commit and the
    /// sanitized snapshot is returned.
    pub fn import_snapshot(&self, text: &str) -> Result<Snapshot, BacklogError> {
        let snapshot = Snapshot::parse_document(text)?;
        self.set_state(&snapshot.games, &snapshot.tags, &snapshot.prefs)
            .context("failed to write imported snapshot")?;
        info!(
            games = snapshot.games.len(),
            tags = snapshot.tags.len(),
            "Snapshot imported"
        );
        Ok(snapshot)
    }

    /// Remove every persisted key, returning to first-run state.
    pub fn reset_all(&self) -> Result<()> {
        for key in [GAMES_KEY, TAGS_KEY, PREFS_KEY] {
            self.backend
                .remove(key)
                .with_context(|| format!("failed to remove {key}"))?;
        }
        info!("Persisted state reset");
        Ok(())
    }

    /// Read a user-selected snapshot file.
    pub async fn read_snapshot_file(path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let text = encode(key, value)?;
        self.backend
            .set(key, &text)
            .with_context(|| format!("failed to write {key}"))
    }

    fn read_array(&self, key: &str) -> Vec<Value> {
        match self.read_json(key) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                warn!(key, "Persisted value is not an array; ignoring");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn read_json(&self, key: &str) -> Option<Value> {
        let text = match self.backend.get(key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, ?err, "Failed to read persisted value");
                return None;
            }
        };
        if text.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, %err, "Failed to parse persisted value");
                None
            }
        }
    }
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("failed to serialize {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use tempfile::tempdir;

    use crate::models::{Platform, Status};

    fn seeded() -> (MemoryStore, Store) {
        let backend = MemoryStore::new();
        let store = Store::new(backend.clone());
        backend
            .set(
                GAMES_KEY,
                &json!([
                    {"id": "g1", "title": "Dungeon Pals", "platform": "Switch", "tagIds": ["t1"],
                     "dateAdded": 10, "dateUpdated": 20},
                    {"id": "g2", "title": "Hades", "status": "Played", "dateAdded": 5}
                ])
                .to_string(),
            )
            .expect("memory write");
        backend
            .set(
                TAGS_KEY,
                &json!([
                    {"id": "t1", "name": "Co-op", "color": "#ffaa00", "emoji": "🎮"},
                    {"id": "t2", "name": "  "}
                ])
                .to_string(),
            )
            .expect("memory write");
        (backend, store)
    }

    #[test]
    fn missing_and_corrupt_values_fall_back() {
        let backend = MemoryStore::new();
        let store = Store::new(backend.clone());
        assert!(store.games().is_empty());
        assert_eq!(store.preferences(), Preferences::default());

        backend.set(GAMES_KEY, "").expect("write");
        backend.set(TAGS_KEY, "{not json").expect("write");
        backend.set(PREFS_KEY, "[1,2]").expect("write");
        assert!(store.games().is_empty());
        assert!(store.tags().is_empty());
        assert_eq!(store.preferences(), Preferences::default());
    }

    #[test]
    fn reads_resanitize_records() {
        let (_, store) = seeded();
        let games = store.games();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].platform, Platform::Switch);
        assert_eq!(games[1].status, Status::Played);
        assert_eq!(games[1].date_updated, 5);

        let tags = store.tags();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "Co-op");
    }

    #[test]
    fn export_then_import_restores_state() -> Result<()> {
        let (_, source) = seeded();
        let mut prefs = Preferences::default();
        prefs.search = "pals".to_string();
        prefs.samples_offered = true;
        source.set_preferences(&prefs)?;

        let exported = source.export_snapshot()?;
        let document: Value = serde_json::from_str(&exported)?;
        assert_eq!(document["schema"], json!(1));
        assert!(document["exportedAt"].is_string());

        let target = Store::new(MemoryStore::new());
        let imported = target.import_snapshot(&exported)?;
        assert_eq!(imported, source.snapshot());
        assert_eq!(target.snapshot(), source.snapshot());
        Ok(())
    }

    #[test]
    fn import_rejects_malformed_input_without_writing() {
        let (backend, store) = seeded();
        let before = store.snapshot();
        let keys_before = backend.len();

        for bad in ["{\"foo\":1}", "not json", "[]", "{\"games\": [], \"tags\": {}}"] {
            let err = store.import_snapshot(bad).expect_err("import should fail");
            assert!(matches!(err, BacklogError::InvalidFormat(_)), "{bad}: {err}");
        }
        assert_eq!(store.snapshot(), before);
        assert_eq!(backend.len(), keys_before);
    }

    #[test]
    fn import_without_prefs_uses_defaults() -> Result<()> {
        let store = Store::new(MemoryStore::new());
        let snapshot = store.import_snapshot(r#"{"games": [{"title": "X"}], "tags": []}"#)?;
        assert_eq!(snapshot.games.len(), 1);
        assert_eq!(snapshot.prefs, Preferences::default());
        assert_eq!(store.games(), snapshot.games);
        Ok(())
    }

    #[test]
    fn reset_removes_every_key() -> Result<()> {
        let (backend, store) = seeded();
        store.set_preferences(&Preferences::default())?;
        store.reset_all()?;
        assert!(backend.is_empty());
        assert!(store.games().is_empty());
        Ok(())
    }

    #[test]
    fn file_store_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::new(FileStore::new(dir.path()));
        let imported = store.import_snapshot(
            r#"{"games": [{"id": "g", "title": "Outer Wilds"}], "tags": [{"id": "t", "name": "Space"}]}"#,
        )?;
        let reopened = Store::new(FileStore::new(dir.path()));
        assert_eq!(reopened.games(), imported.games);
        assert_eq!(reopened.tags(), imported.tags);
        Ok(())
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("disk on fire"))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(anyhow!("disk on fire"))
        }
    }

    #[test]
    fn backend_failures_degrade_reads_and_surface_writes() {
        let store = Store::new(BrokenStore);
        assert!(store.games().is_empty());
        assert_eq!(store.preferences(), Preferences::default());
        assert!(store.set_games(&[]).is_err());
        let err = store
            .import_snapshot(r#"{"games": [], "tags": []}"#)
            .expect_err("write should fail");
        assert!(matches!(err, BacklogError::Storage(_)));
    }

    #[tokio::test]
    async fn reads_snapshot_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("export.json");
        std::fs::write(&path, r#"{"games": [], "tags": []}"#)?;
        let text = Store::read_snapshot_file(&path).await?;
        let snapshot = Snapshot::parse_document(&text)?;
        assert!(snapshot.games.is_empty());

        assert!(Store::read_snapshot_file(dir.path().join("missing.json"))
            .await
            .is_err());
        Ok(())
    }
}
