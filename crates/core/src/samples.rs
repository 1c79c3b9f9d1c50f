//! Built-in sample library offered on first run.

use crate::models::{Platform, Playtime, Status};

/// A tag created by the sample library.
#[derive(Debug, Clone, Copy)]
pub struct SampleTag {
    /// Tag name, also used to link sample games.
    pub name: &'static str,
    /// Swatch color.
    pub color: &'static str,
    /// Glyph shown next to the name.
    pub emoji: &'static str,
}

/// A game created by the sample library.
#[derive(Debug, Clone, Copy)]
pub struct SampleGame {
    /// Title.
    pub title: &'static str,
    /// Platform.
    pub platform: Platform,
    /// Release date.
    pub release_date: &'static str,
    /// Status.
    pub status: Status,
    /// Playtime bucket.
    pub playtime: Playtime,
    /// Names of the sample tags to attach.
    pub tags: &'static [&'static str],
    /// Notes.
    pub notes: &'static str,
    /// Favorite flag.
    pub favorite: bool,
}

/// Tags created before the sample games.
pub const SAMPLE_TAGS: &[SampleTag] = &[
    SampleTag {
        name: "Co-op",
        color: "#a7f3d0",
        emoji: "🤝",
    },
    SampleTag {
        name: "Cozy",
        color: "#fde68a",
        emoji: "☕",
    },
    SampleTag {
        name: "Roguelike",
        color: "#fca5a5",
        emoji: "🎲",
    },
    SampleTag {
        name: "Story",
        color: "#c4b5fd",
        emoji: "📖",
    },
];

/// Sample games.
pub const SAMPLE_GAMES: &[SampleGame] = &[
    SampleGame {
        title: "Hades",
        platform: Platform::Switch,
        release_date: "2020-09-17",
        status: Status::Played,
        playtime: Playtime::Average,
        tags: &["Roguelike", "Story"],
        notes: "Cleared heat 8 with the spear.",
        favorite: true,
    },
    SampleGame {
        title: "Stardew Valley",
        platform: Platform::Pc,
        release_date: "2016-02-26",
        status: Status::Continuous,
        playtime: Playtime::Marathon,
        tags: &["Cozy", "Co-op"],
        notes: "Year 3 farm, greenhouse done.",
        favorite: true,
    },
    SampleGame {
        title: "Outer Wilds",
        platform: Platform::Pc,
        release_date: "2019-05-28",
        status: Status::Unplayed,
        playtime: Playtime::Short,
        tags: &["Story"],
        notes: "Go in blind.",
        favorite: false,
    },
    SampleGame {
        title: "It Takes Two",
        platform: Platform::Ps5,
        release_date: "2021-03-26",
        status: Status::InProgress,
        playtime: Playtime::Short,
        tags: &["Co-op", "Story"],
        notes: "Chapter 4 with a friend on weekends.",
        favorite: false,
    },
    SampleGame {
        title: "Slay the Spire",
        platform: Platform::SteamDeck,
        release_date: "2019-01-23",
        status: Status::Paused,
        playtime: Playtime::Long,
        tags: &["Roguelike"],
        notes: "",
        favorite: false,
    },
    SampleGame {
        title: "Disco Elysium",
        platform: Platform::Pc,
        release_date: "2019-10-15",
        status: Status::Abandoned,
        playtime: Playtime::Long,
        tags: &["Story"],
        notes: "Stopped at day 3, want to restart.",
        favorite: false,
    },
];
