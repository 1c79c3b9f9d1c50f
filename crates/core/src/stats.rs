//! Collection summary counts.

use crate::models::{Game, Platform, Status};

/// Counts over a set of games.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacklogStats {
    /// Number of games.
    pub total: usize,
    /// Number of favorites.
    pub favorites: usize,
    /// Count per status, in status order, zero counts included.
    pub by_status: Vec<(Status, usize)>,
    /// Count per platform, in platform order, zero counts omitted.
    pub by_platform: Vec<(Platform, usize)>,
}

impl BacklogStats {
    /// Tally `games`.
    pub fn collect(games: &[Game]) -> Self {
        let mut status_counts = vec![0usize; Status::ALL.len()];
        let mut platform_counts = vec![0usize; Platform::ALL.len()];
        for game in games {
            status_counts[game.status.rank()] += 1;
            platform_counts[game.platform.rank()] += 1;
        }

        Self {
            total: games.len(),
            favorites: games.iter().filter(|game| game.favorite).count(),
            by_status: Status::ALL.iter().copied().zip(status_counts).collect(),
            by_platform: Platform::ALL
                .iter()
                .copied()
                .zip(platform_counts)
                .filter(|(_, count)| *count > 0)
                .collect(),
        }
    }

    /// Count for one status.
    pub fn status_count(&self, status: Status) -> usize {
        self.by_status
            .iter()
            .find(|(candidate, _)| *candidate == status)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Share of games marked played, 0.0 for an empty collection.
    pub fn completion_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.status_count(Status::Played) as f64 / self.total as f64
        }
    }
}
