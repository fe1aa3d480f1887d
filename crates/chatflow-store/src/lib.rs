//! # chatflow-store
//!
//! Local persistence for the ChatFlow client: a small SQLite key-value table
//! and the user preference record (theme, sound, desktop notifications)
//! layered on top of it.
//!
//! Storage is synchronous and local. When the backing store fails, the
//! in-memory preference values keep governing the session.

pub mod database;
pub mod kv;
pub mod migrations;
pub mod preferences;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use kv::{KeyValueStore, MemoryStore};
pub use preferences::{PreferenceStore, Preferences, ResolvedTheme, Theme};
