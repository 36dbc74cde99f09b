//! Rows mirrored from the upstream catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Artist,
    Album,
    Track,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Artist => write!(f, "artist"),
            EntityKind::Album => write!(f, "album"),
            EntityKind::Track => write!(f, "track"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EntityStoreError {
    /// Plain inserts fail on an existing primary key, without touching the row.
    #[error("{kind} {id} already exists")]
    Duplicate { kind: EntityKind, id: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Malformed stored payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

impl EntityStoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, EntityStoreError::Duplicate { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumType {
    Album,
    Single,
    Compilation,
}

impl AlbumType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AlbumType::Album => "album",
            AlbumType::Single => "single",
            AlbumType::Compilation => "compilation",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "album" => Some(AlbumType::Album),
            "single" => Some(AlbumType::Single),
            "compilation" => Some(AlbumType::Compilation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub external_url: String,
    pub image_url: String,
    /// Upstream artist payload, served back verbatim on warm lookups.
    pub detailed_data: JsonValue,
    /// One-way latch: set once the whole discography has been mirrored.
    pub albums_scanned: bool,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub total_tracks: i64,
    pub album_type: AlbumType,
    /// "YYYY", "YYYY-MM" or "YYYY-MM-DD" as reported upstream.
    pub release_date: String,
    pub external_url: String,
    pub image_url: String,
    pub detailed_data: JsonValue,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub album_id: String,
    pub name: String,
    pub duration_ms: i64,
    pub external_url: String,
    pub detailed_data: JsonValue,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlbumArtistLink {
    pub album_id: String,
    pub artist_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
    pub album_artist_links: usize,
}
