//! Parse-and-default normalisation of untrusted records.
//!
//! Every record read from storage or an import file passes through here.
//! Each field is checked on its own and falls back to a default when it is
//! missing, has the wrong JSON type, or is not a member of its enumeration,
//! so a corrupted record degrades instead of failing the whole load.
//! Sanitizing an already sanitized record returns it unchanged.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    models::{
        Game, Platform, Playtime, Status, Tag, MAX_EMOJI_LEN, MAX_NOTES_LEN, MAX_TAG_NAME_LEN,
        MAX_TITLE_LEN, MAX_URL_LEN,
    },
    palette,
    prefs::{FilterSpec, Preferences, DEFAULT_ROUTE},
};

const MAX_DATE_LEN: usize = 64;

/// Fresh opaque identifier.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Normalise a raw game record, stamping missing timestamps with the current time.
pub fn sanitize_game(raw: &Value) -> Game {
    sanitize_game_at(raw, now_millis())
}

/// Normalise a raw game record, using `now` for missing timestamps.
pub fn sanitize_game_at(raw: &Value, now: i64) -> Game {
    let empty = Map::new();
    let record = raw.as_object().unwrap_or(&empty);

    let date_added = timestamp(record.get("dateAdded")).unwrap_or(now);
    let date_updated = timestamp(record.get("dateUpdated")).unwrap_or(date_added);

    Game {
        id: identifier(record.get("id")),
        title: text(record.get("title"), MAX_TITLE_LEN),
        platform: enumerated(record.get("platform"), Platform::parse),
        release_date: optional_text(record.get("releaseDate"), MAX_DATE_LEN),
        status: enumerated(record.get("status"), Status::parse),
        playtime: enumerated(record.get("playtime"), Playtime::parse),
        tag_ids: id_list(record.get("tagIds")),
        notes: record
            .get("notes")
            .and_then(Value::as_str)
            .map(|notes| truncate(notes, MAX_NOTES_LEN))
            .unwrap_or_default(),
        favorite: record
            .get("favorite")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        image_url: optional_text(record.get("imageUrl"), MAX_URL_LEN),
        date_added,
        date_updated,
    }
}

/// Normalise a raw tag record. Returns `None` when the name is empty after trimming.
pub fn sanitize_tag(raw: &Value) -> Option<Tag> {
    let record = raw.as_object()?;
    let name = text(record.get("name"), MAX_TAG_NAME_LEN);
    if name.is_empty() {
        return None;
    }

    let id = identifier(record.get("id"));
    let color = record
        .get("color")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|color| palette::is_hex_color(color))
        .map(str::to_string)
        .unwrap_or_else(|| palette::pastel_from_seed(&id));

    Some(Tag {
        id,
        name,
        color,
        emoji: optional_text(record.get("emoji"), MAX_EMOJI_LEN),
    })
}

/// Merge a raw preferences object over the defaults, field by field.
pub fn sanitize_preferences(raw: &Value) -> Preferences {
    let defaults = Preferences::default();
    let Some(record) = raw.as_object() else {
        return defaults;
    };

    let filters = record
        .get("filters")
        .map(sanitize_filters)
        .unwrap_or(defaults.filters);
    let last_route = optional_text(record.get("lastRoute"), MAX_URL_LEN)
        .unwrap_or_else(|| DEFAULT_ROUTE.to_string());

    Preferences {
        theme: typed(record, "theme").unwrap_or(defaults.theme),
        sort_field: typed(record, "sortField").unwrap_or(defaults.sort_field),
        sort_direction: typed(record, "sortDirection").unwrap_or(defaults.sort_direction),
        view_mode: typed(record, "viewMode").unwrap_or(defaults.view_mode),
        filters,
        search: record
            .get("search")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(defaults.search),
        last_route,
        samples_offered: typed(record, "samplesOffered").unwrap_or(defaults.samples_offered),
        samples_loaded: typed(record, "samplesLoaded").unwrap_or(defaults.samples_loaded),
    }
}

fn sanitize_filters(raw: &Value) -> FilterSpec {
    let Some(record) = raw.as_object() else {
        return FilterSpec::default();
    };
    FilterSpec {
        platforms: enum_list(record.get("platforms"), Platform::parse),
        statuses: enum_list(record.get("statuses"), Status::parse),
        playtimes: enum_list(record.get("playtimes"), Playtime::parse),
        tag_ids: id_list(record.get("tagIds")),
        favorites_only: record
            .get("favoritesOnly")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn typed<T: DeserializeOwned>(record: &Map<String, Value>, key: &str) -> Option<T> {
    record
        .get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

fn identifier(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => new_id(),
    }
}

fn timestamp(value: Option<&Value>) -> Option<i64> {
    let Value::Number(number) = value? else {
        return None;
    };
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|float| float.is_finite())
            .map(|float| float.round() as i64)
    })
}

fn enumerated<T: Default>(value: Option<&Value>, parse: fn(&str) -> Option<T>) -> T {
    value
        .and_then(Value::as_str)
        .and_then(parse)
        .unwrap_or_default()
}

fn enum_list<T: PartialEq>(value: Option<&Value>, parse: fn(&str) -> Option<T>) -> Vec<T> {
    let mut items = Vec::new();
    for parsed in value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter_map(parse)
    {
        if !items.contains(&parsed) {
            items.push(parsed);
        }
    }
    items
}

fn id_list(value: Option<&Value>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for item in value.and_then(Value::as_array).into_iter().flatten() {
        let id = match item {
            Value::String(id) => id.trim().to_string(),
            Value::Number(id) => id.to_string(),
            _ => continue,
        };
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn text(value: Option<&Value>, max_len: usize) -> String {
    optional_text(value, max_len).unwrap_or_default()
}

fn optional_text(value: Option<&Value>, max_len: usize) -> Option<String> {
    let raw = value?.as_str()?;
    let capped = truncate(raw.trim(), max_len);
    let trimmed = capped.trim_end();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn truncate(input: &str, max_len: usize) -> String {
    input.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    use crate::prefs::{SortDirection, SortField, Theme};

    #[test]
    fn title_only_gets_defaults() {
        let game = sanitize_game_at(&json!({"title": "X"}), 42);
        assert_eq!(game.title, "X");
        assert_eq!(game.platform, Platform::Pc);
        assert_eq!(game.status, Status::Unplayed);
        assert_eq!(game.playtime, Playtime::Average);
        assert_eq!(game.playtime.label(), "Average (20-40 hours)");
        assert!(game.tag_ids.is_empty());
        assert!(!game.favorite);
        assert_eq!(game.date_added, 42);
        assert_eq!(game.date_updated, 42);
        assert!(!game.id.is_empty());
    }

    #[test]
    fn long_rfc3339_release_dates_survive() {
        let date = "2020-01-01T00:00:00.123456789+05:30";
        let game = sanitize_game_at(&json!({"title": "X", "releaseDate": date}), 0);
        assert_eq!(game.release_date.as_deref(), Some(date));
        assert!(crate::sort::release_timestamp(&game) > 0);
    }

    #[test]
    fn wrong_types_fall_back_per_field() {
        let game = sanitize_game_at(
            &json!({
                "id": "keep-me",
                "title": 12,
                "platform": "Dreamcast",
                "status": "Played",
                "playtime": ["Long"],
                "tagIds": "t1",
                "notes": {"text": "x"},
                "favorite": "yes",
                "imageUrl": "   ",
                "dateAdded": "yesterday",
                "dateUpdated": 99,
            }),
            7,
        );
        assert_eq!(game.id, "keep-me");
        assert_eq!(game.title, "");
        assert_eq!(game.platform, Platform::Pc);
        assert_eq!(game.status, Status::Played);
        assert_eq!(game.playtime, Playtime::Average);
        assert!(game.tag_ids.is_empty());
        assert_eq!(game.notes, "");
        assert!(!game.favorite);
        assert_eq!(game.image_url, None);
        assert_eq!(game.date_added, 7);
        assert_eq!(game.date_updated, 99);
    }

    #[test]
    fn non_object_becomes_default_game() {
        let game = sanitize_game_at(&json!("garbage"), 1);
        assert_eq!(game.title, "");
        assert_eq!(game.status, Status::Unplayed);
    }

    #[test]
    fn trims_caps_and_dedupes() {
        let long_title = "a".repeat(MAX_TITLE_LEN + 50);
        let game = sanitize_game_at(
            &json!({
                "title": format!("  {long_title}  "),
                "tagIds": [" t1", "t1", "", 5, null, "t2"],
                "releaseDate": " 2020-02-02 ",
            }),
            1,
        );
        assert_eq!(game.title.chars().count(), MAX_TITLE_LEN);
        assert_eq!(game.tag_ids, vec!["t1", "5", "t2"]);
        assert_eq!(game.release_date.as_deref(), Some("2020-02-02"));
    }

    #[test]
    fn tag_with_blank_name_is_dropped() {
        assert!(sanitize_tag(&json!({"id": "t1", "name": "   "})).is_none());
        assert!(sanitize_tag(&json!({"id": "t1"})).is_none());
        assert!(sanitize_tag(&json!(null)).is_none());
    }

    #[test]
    fn tag_color_falls_back_to_id_pastel() {
        let tag = sanitize_tag(&json!({"id": "t1", "name": " Co-op ", "color": "blue"}))
            .expect("tag kept");
        assert_eq!(tag.name, "Co-op");
        assert_eq!(tag.color, palette::pastel_from_seed("t1"));

        let again = sanitize_tag(&serde_json::to_value(&tag).expect("serialize")).expect("kept");
        assert_eq!(again, tag);
    }

    #[test]
    fn tag_emoji_is_capped() {
        let tag = sanitize_tag(&json!({"id": "t", "name": "x", "color": "#fff", "emoji": "abc"}))
            .expect("tag kept");
        assert_eq!(tag.emoji.as_deref(), Some("ab"));
        assert_eq!(tag.color, "#fff");
    }

    #[test]
    fn preferences_merge_over_defaults() {
        let prefs = sanitize_preferences(&json!({
            "theme": "light",
            "sortField": "bogus",
            "sortDirection": "asc",
            "filters": {"platforms": ["Switch", "Saturn"], "favoritesOnly": true},
            "futureField": 1,
        }));
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.sort_field, SortField::DateAdded);
        assert_eq!(prefs.sort_direction, SortDirection::Asc);
        assert_eq!(prefs.filters.platforms, vec![Platform::Switch]);
        assert!(prefs.filters.favorites_only);
        assert_eq!(prefs.last_route, DEFAULT_ROUTE);

        assert_eq!(sanitize_preferences(&json!(3)), Preferences::default());
    }

    fn arb_field() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[ a-zA-Z0-9#()<>+-]{0,24}".prop_map(Value::String),
            prop::sample::select(vec![
                "PC",
                "Switch",
                "In Progress",
                "played",
                "Marathon (150+ hours)",
                "#abc",
            ])
            .prop_map(|s| json!(s)),
            prop::collection::vec("[a-z0-9 ]{0,6}", 0..4).prop_map(|v| json!(v)),
        ]
    }

    fn arb_record() -> impl Strategy<Value = Value> {
        prop::collection::vec(
            (
                prop::sample::select(vec![
                    "id",
                    "title",
                    "platform",
                    "releaseDate",
                    "status",
                    "playtime",
                    "tagIds",
                    "notes",
                    "favorite",
                    "imageUrl",
                    "dateAdded",
                    "dateUpdated",
                    "name",
                    "color",
                    "emoji",
                ]),
                arb_field(),
            ),
            0..12,
        )
        .prop_map(|fields| {
            let mut record = Map::new();
            for (key, value) in fields {
                record.insert(key.to_string(), value);
            }
            Value::Object(record)
        })
    }

    proptest! {
        #[test]
        fn prop_game_sanitize_is_idempotent(raw in arb_record()) {
            let once = sanitize_game_at(&raw, 1_000);
            let value = serde_json::to_value(&once).expect("serialize game");
            let twice = sanitize_game_at(&value, 2_000);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_tag_sanitize_is_idempotent(raw in arb_record()) {
            if let Some(once) = sanitize_tag(&raw) {
                let value = serde_json::to_value(&once).expect("serialize tag");
                prop_assert_eq!(sanitize_tag(&value), Some(once));
            }
        }
    }
}
