//! EntityStore trait definition.

use super::models::{Album, AlbumArtistLink, Artist, EntityStats, EntityStoreError, Track};
use async_trait::async_trait;

pub type EntityStoreResult<T> = std::result::Result<T, EntityStoreError>;

/// Local mirror of upstream catalog entities.
///
/// `insert_*` fail with [`EntityStoreError::Duplicate`] when the id is already
/// present and leave the existing row untouched. `upsert_*` never fail on
/// duplicates. Concurrent writers for the same id are expected.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // =========================================================================
    // Artists
    // =========================================================================

    async fn get_artist(&self, id: &str) -> EntityStoreResult<Option<Artist>>;

    /// Get every stored artist among `ids`. Missing ids are skipped.
    async fn get_artists(&self, ids: &[String]) -> EntityStoreResult<Vec<Artist>>;

    async fn insert_artist(&self, artist: &Artist) -> EntityStoreResult<()>;

    /// Latch `albums_scanned` to true. Returns whether this call flipped it.
    async fn set_albums_scanned(&self, artist_id: &str) -> EntityStoreResult<bool>;

    // =========================================================================
    // Albums
    // =========================================================================

    async fn get_album(&self, id: &str) -> EntityStoreResult<Option<Album>>;

    async fn get_albums(&self, ids: &[String]) -> EntityStoreResult<Vec<Album>>;

    async fn insert_album(&self, album: &Album) -> EntityStoreResult<()>;

    /// Albums linked to an artist through the album-artist association.
    async fn get_albums_by_artist(&self, artist_id: &str) -> EntityStoreResult<Vec<Album>>;

    async fn upsert_album_artist_links(&self, links: &[AlbumArtistLink]) -> EntityStoreResult<()>;

    async fn get_album_artist_links(&self, album_id: &str)
        -> EntityStoreResult<Vec<AlbumArtistLink>>;

    // =========================================================================
    // Tracks
    // =========================================================================

    async fn get_track(&self, id: &str) -> EntityStoreResult<Option<Track>>;

    /// Insert or replace tracks keyed by track id, in a single transaction.
    async fn upsert_tracks(&self, tracks: &[Track]) -> EntityStoreResult<()>;

    async fn get_tracks_by_album(&self, album_id: &str) -> EntityStoreResult<Vec<Track>>;

    // =========================================================================
    // Statistics
    // =========================================================================

    async fn get_stats(&self) -> EntityStoreResult<EntityStats>;
}
