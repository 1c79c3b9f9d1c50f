//! The backlog controller: owns the collection, tags and preferences.

use std::{fs, path::Path};

use anyhow::Context;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{BacklogError, Result},
    filter,
    models::{Game, GamePatch, NewGame, Status, Tag, TagDraft, TagPatch},
    palette,
    prefs::{FilterSpec, Preferences, SortField},
    samples::{SAMPLE_GAMES, SAMPLE_TAGS},
    sanitize::{new_id, now_millis, sanitize_game_at, sanitize_tag},
    sort,
    stats::BacklogStats,
    store::{Snapshot, Store},
};

/// Single owner of the in-memory backlog state.
///
/// Every mutation updates memory and writes through to the [`Store`]
/// before returning, so the next [`Backlog::visible`] call and the next
/// process start both see it.
pub struct Backlog {
    store: Store,
    games: Vec<Game>,
    tags: Vec<Tag>,
    prefs: Preferences,
    clock: fn() -> i64,
}

impl Backlog {
    /// Load state from `store`.
    pub fn open(store: Store) -> Self {
        let games = store.games();
        let tags = store.tags();
        let prefs = store.preferences();
        info!(games = games.len(), tags = tags.len(), "Backlog loaded");
        Self {
            store,
            games,
            tags,
            prefs,
            clock: now_millis,
        }
    }

    /// Replace the clock used for timestamps.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// The full collection in insertion order.
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    /// All tags.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Current preferences.
    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Look up a game.
    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.iter().find(|game| game.id == id)
    }

    /// Look up a tag.
    pub fn tag(&self, id: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.id == id)
    }

    /// Tags referenced by `game`, in its order, skipping ids with no tag.
    pub fn tags_for(&self, game: &Game) -> Vec<&Tag> {
        game.tag_ids.iter().filter_map(|id| self.tag(id)).collect()
    }

    /// Games after the active filters and search, in the preferred order.
    pub fn visible(&self) -> Vec<Game> {
        let filtered = filter::filter(
            &self.games,
            &self.tags,
            &self.prefs.filters,
            &self.prefs.search,
        );
        sort::sort(
            &filtered,
            self.prefs.sort_field,
            self.prefs.sort_direction,
        )
    }

    /// Summary counts over the whole collection.
    pub fn stats(&self) -> BacklogStats {
        BacklogStats::collect(&self.games)
    }

    /// Add a game.
    pub fn create_game(&mut self, fields: NewGame) -> Result<Game> {
        let now = (self.clock)();
        let mut raw = serde_json::to_value(&fields).context("failed to encode new game")?;
        if let Value::Object(record) = &mut raw {
            record.insert("id".to_string(), Value::String(new_id()));
            record.insert("dateAdded".to_string(), now.into());
            record.insert("dateUpdated".to_string(), now.into());
        }
        let game = sanitize_game_at(&raw, now);
        let mut games = self.games.clone();
        games.push(game.clone());
        self.commit_games(games)?;
        debug!(id = %game.id, title = %game.title, "Game created");
        Ok(game)
    }

    /// Merge `patch` over a game and re-sanitize the result.
    pub fn update_game(&mut self, id: &str, patch: GamePatch) -> Result<Game> {
        let index = self.game_index(id)?;
        let now = (self.clock)();
        let mut raw =
            serde_json::to_value(&self.games[index]).context("failed to encode game")?;
        let changes = serde_json::to_value(&patch).context("failed to encode patch")?;
        if let (Value::Object(record), Value::Object(changes)) = (&mut raw, changes) {
            record.extend(changes);
            record.insert("dateUpdated".to_string(), now.into());
        }
        let updated = sanitize_game_at(&raw, now);
        let mut games = self.games.clone();
        games[index] = updated.clone();
        self.commit_games(games)?;
        debug!(id, "Game updated");
        Ok(updated)
    }

    /// Remove a game. Returns whether it existed.
    pub fn delete_game(&mut self, id: &str) -> Result<bool> {
        let games: Vec<Game> = self
            .games
            .iter()
            .filter(|game| game.id != id)
            .cloned()
            .collect();
        if games.len() == self.games.len() {
            return Ok(false);
        }
        self.commit_games(games)?;
        debug!(id, "Game deleted");
        Ok(true)
    }

    /// Flip the favorite flag.
    pub fn toggle_favorite(&mut self, id: &str) -> Result<Game> {
        let favorite = !self.game(id).ok_or_else(|| BacklogError::game_not_found(id))?.favorite;
        self.update_game(
            id,
            GamePatch {
                favorite: Some(favorite),
                ..GamePatch::default()
            },
        )
    }

    /// Advance the status one step, wrapping after the last.
    pub fn cycle_status(&mut self, id: &str) -> Result<Game> {
        let status = self
            .game(id)
            .ok_or_else(|| BacklogError::game_not_found(id))?
            .status
            .next();
        self.set_status(id, status)
    }

    /// Mark a game as played.
    pub fn quick_mark_played(&mut self, id: &str) -> Result<Game> {
        self.set_status(id, Status::Played)
    }

    /// Replace a game's notes.
    pub fn set_notes(&mut self, id: &str, notes: impl Into<String>) -> Result<Game> {
        self.update_game(
            id,
            GamePatch {
                notes: Some(notes.into()),
                ..GamePatch::default()
            },
        )
    }

    /// Attach `tag_id` to a game, or detach it when already attached.
    pub fn toggle_game_tag(&mut self, id: &str, tag_id: &str) -> Result<Game> {
        let mut tag_ids = self
            .game(id)
            .ok_or_else(|| BacklogError::game_not_found(id))?
            .tag_ids
            .clone();
        FilterSpec::toggle(&mut tag_ids, tag_id.to_string());
        self.update_game(
            id,
            GamePatch {
                tag_ids: Some(tag_ids),
                ..GamePatch::default()
            },
        )
    }

    fn set_status(&mut self, id: &str, status: Status) -> Result<Game> {
        self.update_game(
            id,
            GamePatch {
                status: Some(status),
                ..GamePatch::default()
            },
        )
    }

    /// Add a tag. The name is required.
    pub fn create_tag(&mut self, draft: TagDraft) -> Result<Tag> {
        let id = new_id();
        let color = draft
            .color
            .filter(|color| palette::is_hex_color(color.trim()))
            .unwrap_or_else(|| palette::pastel_from_seed(&id));
        let raw = serde_json::json!({
            "id": id,
            "name": draft.name,
            "color": color,
            "emoji": draft.emoji,
        });
        let tag = sanitize_tag(&raw).ok_or(BacklogError::RequiredFieldMissing("name"))?;
        let mut tags = self.tags.clone();
        tags.push(tag.clone());
        self.commit_tags(tags)?;
        debug!(id = %tag.id, name = %tag.name, "Tag created");
        Ok(tag)
    }

    /// Return the tag named `name` ignoring case, creating it when missing.
    pub fn find_or_create_tag(&mut self, name: &str) -> Result<Tag> {
        let needle = name.trim().to_lowercase();
        if let Some(existing) = self
            .tags
            .iter()
            .find(|tag| tag.name.to_lowercase() == needle)
        {
            return Ok(existing.clone());
        }
        self.create_tag(TagDraft::named(name))
    }

    /// Edit a tag. Names are not checked for uniqueness here.
    pub fn update_tag(&mut self, id: &str, patch: TagPatch) -> Result<Tag> {
        let index = self
            .tags
            .iter()
            .position(|tag| tag.id == id)
            .ok_or_else(|| BacklogError::tag_not_found(id))?;
        let mut raw = serde_json::to_value(&self.tags[index]).context("failed to encode tag")?;
        if let Value::Object(record) = &mut raw {
            if let Some(name) = patch.name {
                record.insert("name".to_string(), Value::String(name));
            }
            if let Some(color) = patch.color {
                record.insert("color".to_string(), Value::String(color));
            }
            if let Some(emoji) = patch.emoji {
                record.insert("emoji".to_string(), emoji.map(Value::String).unwrap_or_default());
            }
        }
        let tag = sanitize_tag(&raw).ok_or(BacklogError::RequiredFieldMissing("name"))?;
        let mut tags = self.tags.clone();
        tags[index] = tag.clone();
        self.commit_tags(tags)?;
        debug!(id, "Tag updated");
        Ok(tag)
    }

    /// Remove a tag and strip it from every game that references it.
    ///
    /// Games and tags are written in one commit. Returns whether the tag existed.
    pub fn delete_tag(&mut self, id: &str) -> Result<bool> {
        let tags: Vec<Tag> = self.tags.iter().filter(|tag| tag.id != id).cloned().collect();
        if tags.len() == self.tags.len() {
            return Ok(false);
        }

        let now = (self.clock)();
        let mut games = self.games.clone();
        let mut affected = 0usize;
        for game in games.iter_mut().filter(|game| game.has_tag(id)) {
            game.tag_ids.retain(|tag_id| tag_id != id);
            game.date_updated = now;
            affected += 1;
        }
        if self.prefs.filters.tag_ids.iter().any(|tag_id| tag_id == id) {
            let mut prefs = self.prefs.clone();
            prefs.filters.tag_ids.retain(|tag_id| tag_id != id);
            self.store.set_state(&games, &tags, &prefs)?;
            self.prefs = prefs;
        } else {
            self.store.set_collection(&games, &tags)?;
        }
        self.games = games;
        self.tags = tags;
        debug!(id, affected, "Tag deleted");
        Ok(true)
    }

    /// Replace the preferences wholesale.
    pub fn set_preferences(&mut self, prefs: Preferences) -> Result<()> {
        self.commit_preferences(prefs)
    }

    /// Apply `change` to the preferences and persist them.
    pub fn update_preferences(&mut self, change: impl FnOnce(&mut Preferences)) -> Result<()> {
        let mut prefs = self.prefs.clone();
        change(&mut prefs);
        self.commit_preferences(prefs)
    }

    /// Set the search text.
    pub fn set_search(&mut self, search: impl Into<String>) -> Result<()> {
        let search = search.into();
        self.update_preferences(|prefs| prefs.search = search)
    }

    /// Sort by `field`, flipping the direction when it is already the active field.
    pub fn set_sort(&mut self, field: SortField) -> Result<()> {
        self.update_preferences(|prefs| {
            if prefs.sort_field == field {
                prefs.sort_direction = prefs.sort_direction.flipped();
            } else {
                prefs.sort_field = field;
            }
        })
    }

    /// Flip the sort direction.
    pub fn toggle_sort_direction(&mut self) -> Result<()> {
        self.update_preferences(|prefs| prefs.sort_direction = prefs.sort_direction.flipped())
    }

    /// Switch between the dark and light themes.
    pub fn toggle_theme(&mut self) -> Result<()> {
        self.update_preferences(|prefs| prefs.theme = prefs.theme.toggled())
    }

    /// Switch between the grid and list views.
    pub fn toggle_view_mode(&mut self) -> Result<()> {
        self.update_preferences(|prefs| prefs.view_mode = prefs.view_mode.toggled())
    }

    /// Remember the last visited route.
    pub fn set_last_route(&mut self, route: impl Into<String>) -> Result<()> {
        let route = route.into();
        self.update_preferences(|prefs| prefs.last_route = route)
    }

    /// Apply `change` to the active filters.
    pub fn update_filters(&mut self, change: impl FnOnce(&mut FilterSpec)) -> Result<()> {
        self.update_preferences(|prefs| change(&mut prefs.filters))
    }

    /// Drop every filter predicate and the search text.
    pub fn clear_filters(&mut self) -> Result<()> {
        self.update_preferences(|prefs| {
            prefs.filters = FilterSpec::default();
            prefs.search.clear();
        })
    }

    /// Add the sample tags and games, reusing tags that already exist by name.
    pub fn load_samples(&mut self) -> Result<usize> {
        let mut tag_ids = Vec::with_capacity(SAMPLE_TAGS.len());
        for sample in SAMPLE_TAGS {
            let tag = match self
                .tags
                .iter()
                .find(|tag| tag.name.eq_ignore_ascii_case(sample.name))
            {
                Some(existing) => existing.clone(),
                None => self.create_tag(TagDraft {
                    name: sample.name.to_string(),
                    color: Some(sample.color.to_string()),
                    emoji: Some(sample.emoji.to_string()),
                })?,
            };
            tag_ids.push((sample.name, tag.id));
        }

        for sample in SAMPLE_GAMES {
            let ids = sample
                .tags
                .iter()
                .filter_map(|name| {
                    tag_ids
                        .iter()
                        .find(|(tag_name, _)| tag_name == name)
                        .map(|(_, id)| id.clone())
                })
                .collect();
            self.create_game(NewGame {
                title: sample.title.to_string(),
                platform: sample.platform,
                release_date: Some(sample.release_date.to_string()),
                status: sample.status,
                playtime: sample.playtime,
                tag_ids: ids,
                notes: sample.notes.to_string(),
                favorite: sample.favorite,
                image_url: None,
            })?;
        }

        self.update_preferences(|prefs| {
            prefs.samples_offered = true;
            prefs.samples_loaded = true;
        })?;
        info!(games = SAMPLE_GAMES.len(), "Sample library loaded");
        Ok(SAMPLE_GAMES.len())
    }

    /// Record that the sample library was offered and declined.
    pub fn dismiss_samples(&mut self) -> Result<()> {
        self.update_preferences(|prefs| prefs.samples_offered = true)
    }

    /// Whether the first-run sample offer should be shown.
    pub fn should_offer_samples(&self) -> bool {
        !self.prefs.samples_offered && self.games.is_empty()
    }

    /// Export the current state as one JSON document.
    pub fn export_snapshot(&self) -> Result<String> {
        let snapshot = Snapshot {
            games: self.games.clone(),
            tags: self.tags.clone(),
            prefs: self.prefs.clone(),
        };
        Ok(snapshot.to_document(Utc::now())?)
    }

    /// Write an export document to `path`.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let document = self.export_snapshot()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, document).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "Snapshot exported");
        Ok(())
    }

    /// Replace all state with an export document. State is untouched on failure.
    pub fn import_snapshot(&mut self, text: &str) -> Result<()> {
        let Snapshot { games, tags, prefs } = self.store.import_snapshot(text)?;
        self.games = games;
        self.tags = tags;
        self.prefs = prefs;
        Ok(())
    }

    /// Forget everything, persisted and in memory.
    pub fn reset_all(&mut self) -> Result<()> {
        self.store.reset_all()?;
        self.games.clear();
        self.tags.clear();
        self.prefs = Preferences::default();
        Ok(())
    }

    fn game_index(&self, id: &str) -> Result<usize> {
        self.games
            .iter()
            .position(|game| game.id == id)
            .ok_or_else(|| BacklogError::game_not_found(id))
    }

    // Memory only changes once the write has succeeded.
    fn commit_games(&mut self, games: Vec<Game>) -> Result<()> {
        self.store.set_games(&games)?;
        self.games = games;
        Ok(())
    }

    fn commit_tags(&mut self, tags: Vec<Tag>) -> Result<()> {
        self.store.set_tags(&tags)?;
        self.tags = tags;
        Ok(())
    }

    fn commit_preferences(&mut self, prefs: Preferences) -> Result<()> {
        self.store.set_preferences(&prefs)?;
        self.prefs = prefs;
        Ok(())
    }
}
