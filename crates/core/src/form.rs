//! Form-level validation for the add/edit game form.

use crate::{
    error::{BacklogError, Result},
    models::{NewGame, Platform, Playtime, Status},
};

/// Raw values as typed or selected in the game form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameForm {
    /// Title input.
    pub title: String,
    /// Selected platform label, empty when nothing is selected.
    pub platform: String,
    /// Release date input.
    pub release_date: String,
    /// Selected status label.
    pub status: String,
    /// Selected playtime label.
    pub playtime: String,
    /// Selected tag ids.
    pub tag_ids: Vec<String>,
    /// Notes input.
    pub notes: String,
    /// Favorite checkbox.
    pub favorite: bool,
    /// Cover URL input.
    pub image_url: String,
}

impl GameForm {
    /// Form pre-filled with the default selections.
    pub fn with_defaults() -> Self {
        Self {
            platform: Platform::default().label().to_string(),
            status: Status::default().label().to_string(),
            playtime: Playtime::default().label().to_string(),
            ..Self::default()
        }
    }

    /// Check the required fields and convert into a [`NewGame`].
    ///
    /// Fails with [`BacklogError::RequiredFieldMissing`] naming the first
    /// field that is empty or not a valid selection.
    pub fn validate(&self) -> Result<NewGame> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BacklogError::RequiredFieldMissing("title"));
        }
        let platform =
            Platform::parse(&self.platform).ok_or(BacklogError::RequiredFieldMissing("platform"))?;
        let status =
            Status::parse(&self.status).ok_or(BacklogError::RequiredFieldMissing("status"))?;
        let playtime =
            Playtime::parse(&self.playtime).ok_or(BacklogError::RequiredFieldMissing("playtime"))?;

        Ok(NewGame {
            title: title.to_string(),
            platform,
            release_date: non_empty(&self.release_date),
            status,
            playtime,
            tag_ids: self.tag_ids.clone(),
            notes: self.notes.clone(),
            favorite: self.favorite,
            image_url: non_empty(&self.image_url),
        })
    }
}

fn non_empty(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
