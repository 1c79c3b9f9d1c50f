//! User preferences and the active filter specification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Platform, Playtime, Status};

/// Route shown when nothing else has been visited.
pub const DEFAULT_ROUTE: &str = "#/library";

/// Color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark background.
    #[default]
    Dark,
    /// Light background.
    Light,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Layout of the library view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Cover cards.
    #[default]
    Grid,
    /// Dense rows.
    List,
}

impl ViewMode {
    /// The other view mode.
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        }
    }
}

/// Field the library is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Case-insensitive title.
    Title,
    /// Parsed release date.
    ReleaseDate,
    /// Platform declaration order.
    Platform,
    /// Status rank.
    Status,
    /// Playtime rank.
    Playtime,
    /// Creation timestamp.
    #[default]
    DateAdded,
    /// Modification timestamp.
    DateUpdated,
    /// Favorites after non-favorites.
    Favorite,
}

impl SortField {
    /// Every field, in the order a picker cycles through them.
    pub const ALL: [SortField; 8] = [
        SortField::Title,
        SortField::ReleaseDate,
        SortField::Platform,
        SortField::Status,
        SortField::Playtime,
        SortField::DateAdded,
        SortField::DateUpdated,
        SortField::Favorite,
    ];

    /// Persisted key.
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::ReleaseDate => "releaseDate",
            SortField::Platform => "platform",
            SortField::Status => "status",
            SortField::Playtime => "playtime",
            SortField::DateAdded => "dateAdded",
            SortField::DateUpdated => "dateUpdated",
            SortField::Favorite => "favorite",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            SortField::Title => "Title",
            SortField::ReleaseDate => "Release date",
            SortField::Platform => "Platform",
            SortField::Status => "Status",
            SortField::Playtime => "Playtime",
            SortField::DateAdded => "Date added",
            SortField::DateUpdated => "Last updated",
            SortField::Favorite => "Favorite",
        }
    }

    /// Parse a persisted key.
    pub fn parse(input: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == input)
    }

    /// The following field, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Active filter predicates. Empty sets disable their predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    /// Allowed platforms.
    pub platforms: Vec<Platform>,
    /// Allowed statuses.
    pub statuses: Vec<Status>,
    /// Allowed playtime buckets.
    pub playtimes: Vec<Playtime>,
    /// Tag ids; a game matches if it carries any of them.
    pub tag_ids: Vec<String>,
    /// Only show favorites.
    pub favorites_only: bool,
}

impl FilterSpec {
    /// Whether any predicate is active.
    pub fn is_active(&self) -> bool {
        !self.platforms.is_empty()
            || !self.statuses.is_empty()
            || !self.playtimes.is_empty()
            || !self.tag_ids.is_empty()
            || self.favorites_only
    }

    /// Add `value` to the set if absent, remove it otherwise.
    pub fn toggle<T: PartialEq>(set: &mut Vec<T>, value: T) {
        if let Some(position) = set.iter().position(|item| *item == value) {
            set.remove(position);
        } else {
            set.push(value);
        }
    }
}

/// Process-wide user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Color scheme.
    pub theme: Theme,
    /// Field the library is sorted by.
    pub sort_field: SortField,
    /// Sort direction.
    pub sort_direction: SortDirection,
    /// Library layout.
    pub view_mode: ViewMode,
    /// Active filters.
    pub filters: FilterSpec,
    /// Free-text search.
    pub search: String,
    /// Last visited route, restored at startup.
    pub last_route: String,
    /// Whether the sample library has been offered.
    pub samples_offered: bool,
    /// Whether the sample library was loaded.
    pub samples_loaded: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            view_mode: ViewMode::default(),
            filters: FilterSpec::default(),
            search: String::new(),
            last_route: DEFAULT_ROUTE.to_string(),
            samples_offered: false,
            samples_loaded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_cycles() {
        assert_eq!(SortField::Title.next(), SortField::ReleaseDate);
        assert_eq!(SortField::Favorite.next(), SortField::Title);
        assert_eq!(SortField::parse("dateUpdated"), Some(SortField::DateUpdated));
        assert_eq!(SortField::parse("rating"), None);
    }

    #[test]
    fn defaults_serialize_camel_case() -> serde_json::Result<()> {
        let value = serde_json::to_value(Preferences::default())?;
        assert_eq!(value["sortField"], serde_json::json!("dateAdded"));
        assert_eq!(value["sortDirection"], serde_json::json!("desc"));
        assert_eq!(value["viewMode"], serde_json::json!("grid"));
        assert_eq!(value["filters"]["favoritesOnly"], serde_json::json!(false));
        assert_eq!(value["lastRoute"], serde_json::json!(DEFAULT_ROUTE));
        Ok(())
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut spec = FilterSpec::default();
        FilterSpec::toggle(&mut spec.platforms, Platform::Switch);
        assert!(spec.is_active());
        FilterSpec::toggle(&mut spec.platforms, Platform::Switch);
        assert!(!spec.is_active());
    }
}
