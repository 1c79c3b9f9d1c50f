//! Filter engine: narrows the collection to games matching every active predicate.

use std::collections::HashMap;

use crate::{
    models::{Game, Tag},
    prefs::FilterSpec,
};

/// Return the games matching `spec` and `search`, preserving input order.
///
/// Empty predicate sets match everything. The search text is matched
/// case-insensitively against the title, the notes, and the names of the
/// game's tags; tag ids without a matching tag contribute nothing.
pub fn filter(games: &[Game], tags: &[Tag], spec: &FilterSpec, search: &str) -> Vec<Game> {
    let names: HashMap<&str, &str> = tags
        .iter()
        .map(|tag| (tag.id.as_str(), tag.name.as_str()))
        .collect();
    let needle = search.trim().to_lowercase();

    games
        .iter()
        .filter(|game| matches_spec(game, spec))
        .filter(|game| needle.is_empty() || search_haystack(game, &names).contains(&needle))
        .cloned()
        .collect()
}

/// Whether `game` satisfies every non-search predicate of `spec`.
pub fn matches_spec(game: &Game, spec: &FilterSpec) -> bool {
    if spec.favorites_only && !game.favorite {
        return false;
    }
    if !spec.platforms.is_empty() && !spec.platforms.contains(&game.platform) {
        return false;
    }
    if !spec.statuses.is_empty() && !spec.statuses.contains(&game.status) {
        return false;
    }
    if !spec.playtimes.is_empty() && !spec.playtimes.contains(&game.playtime) {
        return false;
    }
    if !spec.tag_ids.is_empty() && !spec.tag_ids.iter().any(|id| game.has_tag(id)) {
        return false;
    }
    true
}

fn search_haystack(game: &Game, names: &HashMap<&str, &str>) -> String {
    let tag_names = game
        .tag_ids
        .iter()
        .filter_map(|id| names.get(id.as_str()).copied())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {} {}", game.title, game.notes, tag_names).to_lowercase()
}
