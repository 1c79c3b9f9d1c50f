//! Fixed, ordered enumerations used by game records.
//!
//! Declaration order is meaningful: it is the rank used by the sort engine
//! and the order `Status::next` walks through.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! catalog_enum {
    (
        $(#[$meta:meta])*
        $name:ident, fallback = $fallback:ident {
            $( $variant:ident => $label:literal, [$($alias:literal),*] ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $(
                #[doc = $label]
                $variant,
            )+
        }

        impl $name {
            /// Every value in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Display label, also used as the persisted representation.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Position within [`Self::ALL`].
            pub fn rank(self) -> usize {
                self as usize
            }

            /// Parse a label or short alias, ignoring case and surrounding whitespace.
            pub fn parse(input: &str) -> Option<Self> {
                let needle = input.trim();
                $(
                    if needle.eq_ignore_ascii_case($label)
                        $(|| needle.eq_ignore_ascii_case($alias))*
                    {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$fallback
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                $name::parse(&raw).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} '{raw}'",
                        stringify!($name).to_lowercase()
                    ))
                })
            }
        }
    };
}

catalog_enum! {
    /// Platform a game is owned on.
    Platform, fallback = Pc {
        Pc => "PC", ["pc", "windows"],
        Ps5 => "PlayStation 5", ["ps5"],
        Ps4 => "PlayStation 4", ["ps4"],
        XboxSeries => "Xbox Series X|S", ["xbox_series", "xsx"],
        XboxOne => "Xbox One", ["xbox_one", "xone"],
        Switch => "Switch", ["nintendo switch", "nsw"],
        SteamDeck => "Steam Deck", ["steam_deck", "deck"],
        Mobile => "Mobile", ["ios", "android"],
        Retro => "Retro", [],
        Other => "Other", [],
    }
}

catalog_enum! {
    /// Progress through a game.
    Status, fallback = Unplayed {
        Unplayed => "Unplayed", ["unplayed", "backlog"],
        InProgress => "In Progress", ["in_progress", "playing"],
        Paused => "Paused", ["on_hold"],
        Played => "Played", ["completed", "finished"],
        Abandoned => "Abandoned", ["dropped"],
        Continuous => "Continuous", ["endless", "ongoing"],
    }
}

catalog_enum! {
    /// Estimated time to finish, bucketed.
    Playtime, fallback = Average {
        Quick => "Quick (<5 hours)", ["quick"],
        Short => "Short (5-20 hours)", ["short"],
        Average => "Average (20-40 hours)", ["average"],
        Long => "Long (40-80 hours)", ["long"],
        VeryLong => "Very Long (80-150 hours)", ["very_long", "very long"],
        Marathon => "Marathon (150+ hours)", ["marathon"],
    }
}

impl Status {
    /// The following status, wrapping from the last back to the first.
    pub fn next(self) -> Self {
        let all = Self::ALL;
        all[(self.rank() + 1) % all.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_cycles_and_wraps() {
        assert_eq!(Status::Unplayed.next(), Status::InProgress);
        assert_eq!(Status::Abandoned.next(), Status::Continuous);
        assert_eq!(Status::Continuous.next(), Status::Unplayed);
    }

    #[test]
    fn parses_labels_and_aliases() {
        assert_eq!(Platform::parse("switch"), Some(Platform::Switch));
        assert_eq!(Platform::parse(" PlayStation 5 "), Some(Platform::Ps5));
        assert_eq!(Status::parse("in progress"), Some(Status::InProgress));
        assert_eq!(Playtime::parse("very_long"), Some(Playtime::VeryLong));
        assert_eq!(Playtime::parse("forever"), None);
    }

    #[test]
    fn serializes_by_label() -> serde_json::Result<()> {
        let value = serde_json::to_value(Playtime::Marathon)?;
        assert_eq!(value, serde_json::json!("Marathon (150+ hours)"));
        let parsed: Status = serde_json::from_value(serde_json::json!("Paused"))?;
        assert_eq!(parsed, Status::Paused);
        Ok(())
    }

    #[test]
    fn ranks_follow_declaration_order() {
        assert!(Status::Unplayed.rank() < Status::Played.rank());
        assert!(Status::Played.rank() < Status::Abandoned.rank());
        assert_eq!(Playtime::default(), Playtime::Average);
        assert_eq!(Platform::default(), Platform::Pc);
    }
}
