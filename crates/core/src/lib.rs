#![warn(clippy::all, missing_docs)]

//! Core logic for the personal game backlog.
//!
//! This crate hosts the data models, the sanitizer guarding the persisted
//! schema, key-value persistence with import/export, the filter and sort
//! engines, and the [`Backlog`] controller used by the terminal UI and any
//! future frontends.

pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod form;
pub mod library;
pub mod models;
pub mod palette;
pub mod prefs;
pub mod samples;
pub mod sanitize;
pub mod sort;
pub mod stats;
pub mod store;

pub use config::AppConfig;
pub use debounce::Debouncer;
pub use error::BacklogError;
pub use filter::filter;
pub use form::GameForm;
pub use library::Backlog;
pub use models::{Cover, Game, GamePatch, NewGame, Platform, Playtime, Status, Tag, TagDraft, TagPatch};
pub use prefs::{FilterSpec, Preferences, SortDirection, SortField, Theme, ViewMode};
pub use sanitize::{sanitize_game, sanitize_preferences, sanitize_tag};
pub use sort::sort;
pub use stats::BacklogStats;
pub use store::{FileStore, KeyValueStore, MemoryStore, Snapshot, Store};
