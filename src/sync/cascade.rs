use super::projection::{album_row, album_track_rows, artist_row};
use super::SyncSettings;
use crate::entity_store::{AlbumArtistLink, EntityStore};
use crate::error::{CatalogError, CatalogResult};
use crate::server::metrics::set_catalog_items;
use crate::upstream::{
    fetch_all_artist_albums, AlbumDetail, ArtistDetail, CatalogGateway, SimplifiedAlbum,
};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Multi-entity writes that mirror upstream data into the entity store.
///
/// Every step is idempotent: existence-checked inserts for artists and albums,
/// upserts for links and tracks. Concurrent cascades over the same ids are
/// expected and need no coordination.
#[derive(Clone)]
pub struct CatalogCascade {
    gateway: Arc<dyn CatalogGateway>,
    store: Arc<dyn EntityStore>,
    settings: SyncSettings,
}

impl CatalogCascade {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        store: Arc<dyn EntityStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            settings,
        }
    }

    /// Insert an already fetched artist. An artist stored concurrently by someone
    /// else counts as success.
    pub async fn store_artist(&self, detail: &ArtistDetail) -> CatalogResult<()> {
        match self.store.insert_artist(&artist_row(detail)?).await {
            Ok(()) => {
                debug!("Stored artist {}", detail.id);
                Ok(())
            }
            Err(e) if e.is_duplicate() => {
                debug!("Artist {} already stored", detail.id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn add_artist_if_missing(&self, artist_id: &str) -> CatalogResult<()> {
        if self.store.get_artist(artist_id).await?.is_some() {
            return Ok(());
        }
        let detail = self
            .gateway
            .get_artist(artist_id)
            .await
            .map_err(CatalogError::upstream)?;
        self.store_artist(&detail).await
    }

    /// Mirror one full album: its creator artists, the album row, the
    /// album-artist links and its tracks, in that order.
    pub async fn add_album_with_links(&self, album: &AlbumDetail) -> CatalogResult<()> {
        if album.artists.is_empty() {
            return Err(CatalogError::InvariantViolation(format!(
                "album {} has no artists",
                album.id
            )));
        }

        let mut seen = HashSet::new();
        let artist_ids: Vec<String> = album
            .artists
            .iter()
            .filter(|a| seen.insert(a.id.as_str()))
            .map(|a| a.id.clone())
            .collect();

        let existing: HashSet<String> = self
            .store
            .get_artists(&artist_ids)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();
        // Artist details never trigger further fetches
        for artist_id in artist_ids.iter().filter(|id| !existing.contains(*id)) {
            let detail = self
                .gateway
                .get_artist(artist_id)
                .await
                .map_err(CatalogError::upstream)?;
            self.store_artist(&detail).await?;
        }

        match self.store.insert_album(&album_row(album)?).await {
            Ok(()) => debug!("Stored album {}", album.id),
            Err(e) if e.is_duplicate() => debug!("Album {} already stored", album.id),
            Err(e) => return Err(e.into()),
        }

        let links: Vec<AlbumArtistLink> = artist_ids
            .iter()
            .map(|artist_id| AlbumArtistLink {
                album_id: album.id.clone(),
                artist_id: artist_id.clone(),
            })
            .collect();
        self.store.upsert_album_artist_links(&links).await?;

        let tracks = album_track_rows(album)?;
        self.store.upsert_tracks(&tracks).await?;

        debug!(
            "Album {} mirrored with {} artists and {} tracks",
            album.id,
            links.len(),
            tracks.len()
        );
        Ok(())
    }

    async fn mirror_album(&self, album_id: &str) -> CatalogResult<()> {
        // The simplified listing carries no tracks
        let detail = self
            .gateway
            .get_album(album_id)
            .await
            .map_err(CatalogError::upstream)?;
        self.add_album_with_links(&detail).await
    }

    /// Mirror every album of an artist, then latch its `albums_scanned` flag.
    ///
    /// Album details are fetched `cascade_concurrency` at a time. Albums already
    /// stored are only linked to the artist. A failing album does not stop the
    /// others, but the latch stays unset so a later lookup rescans; the first
    /// failure is returned.
    pub async fn add_albums_for_artist(
        &self,
        artist_id: &str,
        albums: Vec<SimplifiedAlbum>,
    ) -> CatalogResult<()> {
        let total = albums.len();
        let concurrency = self.settings.cascade_concurrency.max(1);

        let ids: Vec<String> = albums.iter().map(|a| a.id.clone()).collect();
        let stored: HashSet<String> = self
            .store
            .get_albums(&ids)
            .await?
            .into_iter()
            .map(|album| album.id)
            .collect();
        if !stored.is_empty() {
            let links: Vec<AlbumArtistLink> = stored
                .iter()
                .map(|album_id| AlbumArtistLink {
                    album_id: album_id.clone(),
                    artist_id: artist_id.to_string(),
                })
                .collect();
            self.store.upsert_album_artist_links(&links).await?;
            debug!(
                "{} of {} albums of artist {} already stored",
                stored.len(),
                total,
                artist_id
            );
        }
        let missing: Vec<SimplifiedAlbum> = albums
            .into_iter()
            .filter(|a| !stored.contains(&a.id))
            .collect();

        let results: Vec<(String, CatalogResult<()>)> = stream::iter(missing)
            .map(|simplified| {
                let cascade = self.clone();
                async move {
                    let result = cascade.mirror_album(&simplified.id).await;
                    (simplified.id, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut first_error = None;
        for (album_id, result) in results {
            if let Err(e) = result {
                warn!(
                    "Could not mirror album {} of artist {}: {}",
                    album_id, artist_id, e
                );
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        if self.store.set_albums_scanned(artist_id).await? {
            info!("Artist {} discography mirrored ({} albums)", artist_id, total);
        }
        self.refresh_item_gauges().await;
        Ok(())
    }

    /// Warm the whole catalog of the artist behind a cold album or track lookup.
    ///
    /// `origin` is the album that was asked for; it is mirrored too even when the
    /// artist listing does not include it.
    pub async fn warm_artist_catalog(
        &self,
        artist_id: &str,
        origin: SimplifiedAlbum,
    ) -> CatalogResult<()> {
        self.add_artist_if_missing(artist_id).await?;

        let mut albums = fetch_all_artist_albums(
            self.gateway.as_ref(),
            artist_id,
            self.settings.album_page_size,
            &self.settings.album_group,
        )
        .await
        .map_err(CatalogError::upstream)?;
        if !albums.iter().any(|a| a.id == origin.id) {
            albums.push(origin);
        }

        self.add_albums_for_artist(artist_id, albums).await
    }

    async fn refresh_item_gauges(&self) {
        match self.store.get_stats().await {
            Ok(stats) => set_catalog_items(stats.artists, stats.albums, stats.tracks),
            Err(e) => warn!("Could not read entity stats: {}", e),
        }
    }
}
