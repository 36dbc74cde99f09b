//! SQLite schema definitions for the mirrored catalog.
//!
//! Ids are the upstream base62 ids. Full upstream payloads are kept as JSON text
//! in `detailed_data` so that cached lookups can return them unchanged.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("external_url", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text, non_null = true),
        sqlite_column!("detailed_data", &SqlType::Text, non_null = true), // JSON
        sqlite_column!(
            "albums_scanned",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    composite_key: &[],
    indices: &[],
};

const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("total_tracks", &SqlType::Integer, non_null = true),
        sqlite_column!("album_type", &SqlType::Text, non_null = true), // 'album', 'single', 'compilation'
        sqlite_column!("release_date", &SqlType::Text, non_null = true),
        sqlite_column!("external_url", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text, non_null = true),
        sqlite_column!("detailed_data", &SqlType::Text, non_null = true), // JSON
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    composite_key: &[],
    indices: &[],
};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("album_id", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("duration_ms", &SqlType::Integer, non_null = true),
        sqlite_column!("external_url", &SqlType::Text, non_null = true),
        sqlite_column!("detailed_data", &SqlType::Text, non_null = true), // JSON
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    composite_key: &[],
    indices: &[("idx_tracks_album", "album_id")],
};

const ALBUM_ARTISTS_TABLE: Table = Table {
    name: "album_artists",
    columns: &[
        sqlite_column!("album_id", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
    ],
    composite_key: &["album_id", "artist_id"],
    indices: &[("idx_album_artists_artist", "artist_id")],
};

// Declared for parity with the album association; the cascade does not fill it.
const TRACK_ARTISTS_TABLE: Table = Table {
    name: "track_artists",
    columns: &[
        sqlite_column!("track_id", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
    ],
    composite_key: &["track_id", "artist_id"],
    indices: &[("idx_track_artists_artist", "artist_id")],
};

pub const ENTITY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        ARTISTS_TABLE,
        ALBUMS_TABLE,
        TRACKS_TABLE,
        ALBUM_ARTISTS_TABLE,
        TRACK_ARTISTS_TABLE,
    ],
    migration: None,
}];
