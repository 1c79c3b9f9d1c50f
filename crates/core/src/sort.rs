//! Sort engine.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate};

use crate::{
    models::Game,
    prefs::{SortDirection, SortField},
};

/// Return a new ordering of `games` by `field` in `direction`.
///
/// Ascending order is total: ties on the field are broken by id. The
/// descending order is the exact reverse of the ascending one.
pub fn sort(games: &[Game], field: SortField, direction: SortDirection) -> Vec<Game> {
    let mut sorted = games.to_vec();
    match field {
        SortField::Title => {
            sorted.sort_by_cached_key(|game| (game.title.to_lowercase(), game.id.clone()))
        }
        SortField::ReleaseDate => {
            sorted.sort_by_cached_key(|game| (release_timestamp(game), game.id.clone()))
        }
        _ => sorted.sort_by(|a, b| compare(a, b, field).then_with(|| a.id.cmp(&b.id))),
    }
    if direction == SortDirection::Desc {
        sorted.reverse();
    }
    sorted
}

fn compare(a: &Game, b: &Game, field: SortField) -> Ordering {
    match field {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::ReleaseDate => release_timestamp(a).cmp(&release_timestamp(b)),
        SortField::Platform => a.platform.rank().cmp(&b.platform.rank()),
        SortField::Status => a.status.rank().cmp(&b.status.rank()),
        SortField::Playtime => a.playtime.rank().cmp(&b.playtime.rank()),
        SortField::DateAdded => a.date_added.cmp(&b.date_added),
        SortField::DateUpdated => a.date_updated.cmp(&b.date_updated),
        SortField::Favorite => a.favorite.cmp(&b.favorite),
    }
}

/// Release date in epoch milliseconds; absent or unparseable dates are 0.
pub fn release_timestamp(game: &Game) -> i64 {
    game.release_date
        .as_deref()
        .and_then(parse_release_date)
        .unwrap_or(0)
}

/// Parse `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or RFC 3339 into epoch milliseconds.
pub fn parse_release_date(input: &str) -> Option<i64> {
    let input = input.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Some(datetime.timestamp_millis());
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{input}-01"), "%Y-%m-%d").ok())
        .or_else(|| {
            let year = input.parse::<i32>().ok()?;
            NaiveDate::from_ymd_opt(year, 1, 1)
        })?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}
