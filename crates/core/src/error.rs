//! Error type shared by the backlog operations.

use thiserror::Error;

/// Errors surfaced by [`crate::Backlog`] and [`crate::store::Store`].
///
/// Malformed field values never show up here: the sanitizer coerces them
/// to defaults instead.
#[derive(Debug, Error)]
pub enum BacklogError {
    /// An operation referenced a game or tag id that is not in the collection.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind, `"game"` or `"tag"`.
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// An import payload was not JSON or lacked the `games`/`tags` arrays.
    #[error("invalid import format: {0}")]
    InvalidFormat(String),

    /// Form validation rejected a submission.
    #[error("required field missing: {0}")]
    RequiredFieldMissing(&'static str),

    /// The storage backend failed to write.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl BacklogError {
    pub(crate) fn game_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "game",
            id: id.into(),
        }
    }

    pub(crate) fn tag_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "tag",
            id: id.into(),
        }
    }

    pub(crate) fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Whether this error is the silent-no-op kind for mutation paths.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience alias for results carrying a [`BacklogError`].
pub type Result<T, E = BacklogError> = std::result::Result<T, E>;
