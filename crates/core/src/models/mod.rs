//! Shared domain models.

mod catalog;

pub use catalog::{Platform, Playtime, Status};

use serde::{Deserialize, Serialize};

use crate::palette;

/// Longest title kept by the sanitizer, in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Longest notes body kept by the sanitizer, in characters.
pub const MAX_NOTES_LEN: usize = 5000;
/// Longest image URL kept by the sanitizer, in characters.
pub const MAX_URL_LEN: usize = 2048;
/// Longest tag name kept by the sanitizer, in characters.
pub const MAX_TAG_NAME_LEN: usize = 40;
/// Longest tag emoji kept by the sanitizer, in characters.
pub const MAX_EMOJI_LEN: usize = 2;

/// A catalogued game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Opaque id assigned at creation.
    pub id: String,
    /// Trimmed title.
    pub title: String,
    /// Platform the game is played on.
    pub platform: Platform,
    /// ISO-like release date, if known.
    #[serde(default)]
    pub release_date: Option<String>,
    /// Progress status.
    pub status: Status,
    /// Estimated time-to-beat bucket.
    pub playtime: Playtime,
    /// Referenced tag ids; may contain ids of deleted tags.
    #[serde(default)]
    pub tag_ids: Vec<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Favorite flag.
    #[serde(default)]
    pub favorite: bool,
    /// Cover image URL, if any.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Creation time in epoch milliseconds.
    pub date_added: i64,
    /// Last modification time in epoch milliseconds.
    pub date_updated: i64,
}

/// What to show as a game's cover art.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cover {
    /// A user-supplied image.
    Url(String),
    /// Generated stand-in derived from the title.
    Placeholder {
        /// One or two uppercase letters.
        initials: String,
        /// Background color as `#rrggbb`.
        color: String,
    },
}

impl Game {
    /// Cover image, or a deterministic placeholder when no URL is set.
    pub fn cover(&self) -> Cover {
        match self.image_url.as_deref() {
            Some(url) if !url.is_empty() => Cover::Url(url.to_string()),
            _ => self.placeholder(),
        }
    }

    /// Placeholder cover, also used when a cover URL fails to load.
    pub fn placeholder(&self) -> Cover {
        Cover::Placeholder {
            initials: palette::initials(&self.title),
            color: palette::pastel_from_seed(&self.title.to_lowercase()),
        }
    }

    /// Release date for display.
    pub fn release_label(&self) -> &str {
        match self.release_date.as_deref() {
            Some(date) if !date.is_empty() => date,
            _ => "Unknown",
        }
    }

    /// Whether the game references `tag_id`.
    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tag_ids.iter().any(|id| id == tag_id)
    }
}

/// A color-coded label that games can reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Opaque id.
    pub id: String,
    /// Trimmed, non-empty name.
    pub name: String,
    /// Swatch color, `#rgb` or `#rrggbb`.
    pub color: String,
    /// Optional short glyph shown next to the name.
    #[serde(default)]
    pub emoji: Option<String>,
}

impl Tag {
    /// Name prefixed with the emoji, when there is one.
    pub fn display_name(&self) -> String {
        match self.emoji.as_deref() {
            Some(emoji) if !emoji.is_empty() => format!("{} {}", emoji, self.name),
            _ => self.name.clone(),
        }
    }
}

/// Fields for a game about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct NewGame {
    pub title: String,
    pub platform: Platform,
    pub release_date: Option<String>,
    pub status: Status,
    pub playtime: Playtime,
    pub tag_ids: Vec<String>,
    pub notes: String,
    pub favorite: bool,
    pub image_url: Option<String>,
}

impl NewGame {
    /// Start from a title with every other field at its default.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update for a game. `None` leaves the field untouched.
///
/// The nullable fields use a nested option so a patch can clear them:
/// `Some(None)` removes the release date or image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct GamePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playtime: Option<Playtime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
}

/// Fields for a tag about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct TagDraft {
    pub name: String,
    /// Swatch color; a generated pastel is used when absent or invalid.
    pub color: Option<String>,
    pub emoji: Option<String>,
}

impl TagDraft {
    /// Draft with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update for a tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub emoji: Option<Option<String>>,
}
