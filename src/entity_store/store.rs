//! SQLite-backed entity store implementation.

use super::models::*;
use super::schema::ENTITY_VERSIONED_SCHEMAS;
use super::trait_def::{EntityStore, EntityStoreResult};
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

const ARTIST_COLUMNS: &str =
    "id, name, external_url, image_url, detailed_data, albums_scanned, updated_at";
const ALBUM_COLUMNS: &str =
    "id, name, total_tracks, album_type, release_date, external_url, image_url, detailed_data, updated_at";
const TRACK_COLUMNS: &str =
    "id, album_id, name, duration_ms, external_url, detailed_data, updated_at";

/// SQLite-backed entity store.
#[derive(Clone)]
pub struct SqliteEntityStore {
    read_conn: Arc<Mutex<Connection>>,
    write_conn: Arc<Mutex<Connection>>,
}

impl SqliteEntityStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open entity database")?;

        migrate_if_needed(&mut write_conn, ENTITY_VERSIONED_SCHEMAS, "entity")?;

        write_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on entity write connection")?;

        let read_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open entity database for reading")?;

        let stats = Self::count_rows(&read_conn)?;
        info!(
            "Entity store ready: {} artists, {} albums, {} tracks",
            stats.artists, stats.albums, stats.tracks
        );

        Ok(Self {
            read_conn: Arc::new(Mutex::new(read_conn)),
            write_conn: Arc::new(Mutex::new(write_conn)),
        })
    }

    fn count_rows(conn: &Connection) -> rusqlite::Result<EntityStats> {
        let count = |table: &str| -> rusqlite::Result<usize> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        };
        Ok(EntityStats {
            artists: count("artists")?,
            albums: count("albums")?,
            tracks: count("tracks")?,
            album_artist_links: count("album_artists")?,
        })
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Map a primary key conflict to `Duplicate`, leave everything else as is.
fn map_insert_error(err: rusqlite::Error, kind: EntityKind, id: &str) -> EntityStoreError {
    if let rusqlite::Error::SqliteFailure(ffi_err, _) = &err {
        if ffi_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY {
            return EntityStoreError::Duplicate {
                kind,
                id: id.to_string(),
            };
        }
    }
    EntityStoreError::Sqlite(err)
}

// Rows are read as raw columns first; JSON decoding happens outside rusqlite's
// closure so that a bad payload surfaces as `Serialization`, not as a SQLite error.
struct RawArtist {
    id: String,
    name: String,
    external_url: String,
    image_url: String,
    detailed_data: String,
    albums_scanned: bool,
    updated_at: i64,
}

fn read_artist_row(row: &Row) -> rusqlite::Result<RawArtist> {
    Ok(RawArtist {
        id: row.get(0)?,
        name: row.get(1)?,
        external_url: row.get(2)?,
        image_url: row.get(3)?,
        detailed_data: row.get(4)?,
        albums_scanned: row.get::<_, i64>(5)? != 0,
        updated_at: row.get(6)?,
    })
}

impl RawArtist {
    fn decode(self) -> EntityStoreResult<Artist> {
        Ok(Artist {
            id: self.id,
            name: self.name,
            external_url: self.external_url,
            image_url: self.image_url,
            detailed_data: serde_json::from_str(&self.detailed_data)?,
            albums_scanned: self.albums_scanned,
            updated_at: self.updated_at,
        })
    }
}

struct RawAlbum {
    id: String,
    name: String,
    total_tracks: i64,
    album_type: String,
    release_date: String,
    external_url: String,
    image_url: String,
    detailed_data: String,
    updated_at: i64,
}

fn read_album_row(row: &Row) -> rusqlite::Result<RawAlbum> {
    Ok(RawAlbum {
        id: row.get(0)?,
        name: row.get(1)?,
        total_tracks: row.get(2)?,
        album_type: row.get(3)?,
        release_date: row.get(4)?,
        external_url: row.get(5)?,
        image_url: row.get(6)?,
        detailed_data: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

impl RawAlbum {
    fn decode(self) -> EntityStoreResult<Album> {
        let album_type = AlbumType::from_db_str(&self.album_type).ok_or_else(|| {
            EntityStoreError::InvalidValue(format!(
                "album {} has unknown type '{}'",
                self.id, self.album_type
            ))
        })?;
        Ok(Album {
            id: self.id,
            name: self.name,
            total_tracks: self.total_tracks,
            album_type,
            release_date: self.release_date,
            external_url: self.external_url,
            image_url: self.image_url,
            detailed_data: serde_json::from_str(&self.detailed_data)?,
            updated_at: self.updated_at,
        })
    }
}

struct RawTrack {
    id: String,
    album_id: String,
    name: String,
    duration_ms: i64,
    external_url: String,
    detailed_data: String,
    updated_at: i64,
}

fn read_track_row(row: &Row) -> rusqlite::Result<RawTrack> {
    Ok(RawTrack {
        id: row.get(0)?,
        album_id: row.get(1)?,
        name: row.get(2)?,
        duration_ms: row.get(3)?,
        external_url: row.get(4)?,
        detailed_data: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl RawTrack {
    fn decode(self) -> EntityStoreResult<Track> {
        Ok(Track {
            id: self.id,
            album_id: self.album_id,
            name: self.name,
            duration_ms: self.duration_ms,
            external_url: self.external_url,
            detailed_data: serde_json::from_str(&self.detailed_data)?,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn get_artist(&self, id: &str) -> EntityStoreResult<Option<Artist>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM artists WHERE id = ?1",
            ARTIST_COLUMNS
        ))?;
        let raw = stmt.query_row(params![id], read_artist_row).optional()?;
        raw.map(RawArtist::decode).transpose()
    }

    async fn get_artists(&self, ids: &[String]) -> EntityStoreResult<Vec<Artist>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM artists WHERE id IN ({})",
            ARTIST_COLUMNS,
            placeholders(ids.len())
        ))?;
        let raws = stmt
            .query_map(params_from_iter(ids.iter()), read_artist_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawArtist::decode).collect()
    }

    async fn insert_artist(&self, artist: &Artist) -> EntityStoreResult<()> {
        let detailed_data = serde_json::to_string(&artist.detailed_data)?;
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artists (id, name, external_url, image_url, detailed_data, albums_scanned, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                artist.id,
                artist.name,
                artist.external_url,
                artist.image_url,
                detailed_data,
                artist.albums_scanned as i64,
                now_secs(),
            ],
        )
        .map_err(|e| map_insert_error(e, EntityKind::Artist, &artist.id))?;
        Ok(())
    }

    async fn set_albums_scanned(&self, artist_id: &str) -> EntityStoreResult<bool> {
        let conn = self.write_conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE artists SET albums_scanned = 1, updated_at = ?2
             WHERE id = ?1 AND albums_scanned = 0",
            params![artist_id, now_secs()],
        )?;
        Ok(changed > 0)
    }

    async fn get_album(&self, id: &str) -> EntityStoreResult<Option<Album>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM albums WHERE id = ?1",
            ALBUM_COLUMNS
        ))?;
        let raw = stmt.query_row(params![id], read_album_row).optional()?;
        raw.map(RawAlbum::decode).transpose()
    }

    async fn get_albums(&self, ids: &[String]) -> EntityStoreResult<Vec<Album>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM albums WHERE id IN ({})",
            ALBUM_COLUMNS,
            placeholders(ids.len())
        ))?;
        let raws = stmt
            .query_map(params_from_iter(ids.iter()), read_album_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawAlbum::decode).collect()
    }

    async fn insert_album(&self, album: &Album) -> EntityStoreResult<()> {
        let detailed_data = serde_json::to_string(&album.detailed_data)?;
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO albums (id, name, total_tracks, album_type, release_date, external_url, image_url, detailed_data, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                album.id,
                album.name,
                album.total_tracks,
                album.album_type.to_db_str(),
                album.release_date,
                album.external_url,
                album.image_url,
                detailed_data,
                now_secs(),
            ],
        )
        .map_err(|e| map_insert_error(e, EntityKind::Album, &album.id))?;
        Ok(())
    }

    async fn get_albums_by_artist(&self, artist_id: &str) -> EntityStoreResult<Vec<Album>> {
        let conn = self.read_conn.lock().unwrap();
        let columns = ALBUM_COLUMNS
            .split(", ")
            .map(|c| format!("al.{}", c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM albums al
             INNER JOIN album_artists aa ON aa.album_id = al.id
             WHERE aa.artist_id = ?1
             ORDER BY al.release_date DESC, al.id",
            columns
        ))?;
        let raws = stmt
            .query_map(params![artist_id], read_album_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawAlbum::decode).collect()
    }

    async fn upsert_album_artist_links(&self, links: &[AlbumArtistLink]) -> EntityStoreResult<()> {
        if links.is_empty() {
            return Ok(());
        }
        let conn = self.write_conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO album_artists (album_id, artist_id) VALUES (?1, ?2)
                 ON CONFLICT(album_id, artist_id) DO NOTHING",
            )?;
            for link in links {
                stmt.execute(params![link.album_id, link.artist_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn get_album_artist_links(
        &self,
        album_id: &str,
    ) -> EntityStoreResult<Vec<AlbumArtistLink>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT album_id, artist_id FROM album_artists WHERE album_id = ?1 ORDER BY artist_id",
        )?;
        let links = stmt
            .query_map(params![album_id], |row| {
                Ok(AlbumArtistLink {
                    album_id: row.get(0)?,
                    artist_id: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    async fn get_track(&self, id: &str) -> EntityStoreResult<Option<Track>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM tracks WHERE id = ?1",
            TRACK_COLUMNS
        ))?;
        let raw = stmt.query_row(params![id], read_track_row).optional()?;
        raw.map(RawTrack::decode).transpose()
    }

    async fn upsert_tracks(&self, tracks: &[Track]) -> EntityStoreResult<()> {
        if tracks.is_empty() {
            return Ok(());
        }
        let payloads = tracks
            .iter()
            .map(|t| serde_json::to_string(&t.detailed_data))
            .collect::<Result<Vec<_>, _>>()?;
        let now = now_secs();

        let conn = self.write_conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO tracks (id, album_id, name, duration_ms, external_url, detailed_data, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    album_id = excluded.album_id,
                    name = excluded.name,
                    duration_ms = excluded.duration_ms,
                    external_url = excluded.external_url,
                    detailed_data = excluded.detailed_data,
                    updated_at = excluded.updated_at",
            )?;
            for (track, detailed_data) in tracks.iter().zip(payloads.iter()) {
                stmt.execute(params![
                    track.id,
                    track.album_id,
                    track.name,
                    track.duration_ms,
                    track.external_url,
                    detailed_data,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn get_tracks_by_album(&self, album_id: &str) -> EntityStoreResult<Vec<Track>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM tracks WHERE album_id = ?1 ORDER BY id",
            TRACK_COLUMNS
        ))?;
        let raws = stmt
            .query_map(params![album_id], read_track_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawTrack::decode).collect()
    }

    async fn get_stats(&self) -> EntityStoreResult<EntityStats> {
        let conn = self.read_conn.lock().unwrap();
        Ok(Self::count_rows(&conn)?)
    }
}
