use super::background::BackgroundTasks;
use super::cascade::CatalogCascade;
use super::projection::{simplified_album_of, to_json};
use super::SyncSettings;
use crate::entity_store::EntityStore;
use crate::error::{CatalogError, CatalogResult};
use crate::server::metrics::record_cache_lookup;
use crate::upstream::{fetch_all_artist_albums, CatalogGateway, SearchKind, SimplifiedAlbum};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

/// Payload of an artist lookup.
///
/// On a warm lookup the albums are the stored detailed data of every linked
/// album; otherwise they are the simplified albums as upstream listed them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistView {
    pub artist: JsonValue,
    pub albums: Vec<JsonValue>,
}

fn first_artist_id(album: &SimplifiedAlbum) -> CatalogResult<String> {
    album.artists.first().map(|a| a.id.clone()).ok_or_else(|| {
        CatalogError::InvariantViolation(format!("album {} has no artists", album.id))
    })
}

/// Cache-aside lookups over the entity store, backed by the upstream catalog.
///
/// Lookups never wait for the store to be populated: whatever upstream returned
/// is handed back right away and the mirroring runs in [`BackgroundTasks`].
#[derive(Clone)]
pub struct SyncEngine {
    gateway: Arc<dyn CatalogGateway>,
    store: Arc<dyn EntityStore>,
    cascade: CatalogCascade,
    tasks: BackgroundTasks,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        store: Arc<dyn EntityStore>,
        tasks: BackgroundTasks,
        settings: SyncSettings,
    ) -> Self {
        let cascade = CatalogCascade::new(gateway.clone(), store.clone(), settings.clone());
        Self {
            gateway,
            store,
            cascade,
            tasks,
            settings,
        }
    }

    pub fn background_tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    async fn fetch_artist_albums(&self, artist_id: &str) -> CatalogResult<Vec<SimplifiedAlbum>> {
        fetch_all_artist_albums(
            self.gateway.as_ref(),
            artist_id,
            self.settings.album_page_size,
            &self.settings.album_group,
        )
        .await
        .map_err(CatalogError::upstream)
    }

    pub async fn get_artist_view(&self, artist_id: &str) -> CatalogResult<ArtistView> {
        let stored = self.store.get_artist(artist_id).await?;

        match stored {
            Some(artist) if artist.albums_scanned => {
                debug!("Artist {} served from store", artist_id);
                record_cache_lookup("artist", "hit");
                let albums = self.store.get_albums_by_artist(artist_id).await?;
                Ok(ArtistView {
                    artist: artist.detailed_data,
                    albums: albums.into_iter().map(|a| a.detailed_data).collect(),
                })
            }
            Some(artist) => {
                debug!("Artist {} stored but discography not scanned", artist_id);
                record_cache_lookup("artist", "partial");
                let albums = self.fetch_artist_albums(artist_id).await?;
                let view = ArtistView {
                    artist: artist.detailed_data,
                    albums: albums.iter().map(to_json).collect::<CatalogResult<_>>()?,
                };

                let cascade = self.cascade.clone();
                let artist_id = artist_id.to_string();
                self.tasks.spawn("artist_albums_cascade", async move {
                    cascade.add_albums_for_artist(&artist_id, albums).await
                });
                Ok(view)
            }
            None => {
                debug!("Artist {} not stored, fetching from upstream", artist_id);
                record_cache_lookup("artist", "miss");
                let (detail, albums) = tokio::try_join!(
                    async {
                        self.gateway
                            .get_artist(artist_id)
                            .await
                            .map_err(CatalogError::upstream)
                    },
                    self.fetch_artist_albums(artist_id)
                )?;
                let view = ArtistView {
                    artist: to_json(&detail)?,
                    albums: albums.iter().map(to_json).collect::<CatalogResult<_>>()?,
                };

                let cascade = self.cascade.clone();
                let artist_id = artist_id.to_string();
                self.tasks.spawn("artist_cascade", async move {
                    // The albums are linked to the artist row, which must exist first
                    cascade.store_artist(&detail).await?;
                    cascade.add_albums_for_artist(&artist_id, albums).await
                });
                Ok(view)
            }
        }
    }

    pub async fn get_album_view(&self, album_id: &str) -> CatalogResult<JsonValue> {
        if let Some(album) = self.store.get_album(album_id).await? {
            debug!("Album {} served from store", album_id);
            record_cache_lookup("album", "hit");
            return Ok(album.detailed_data);
        }

        debug!("Album {} not stored, fetching from upstream", album_id);
        record_cache_lookup("album", "miss");
        let detail = self
            .gateway
            .get_album(album_id)
            .await
            .map_err(CatalogError::upstream)?;
        let origin = simplified_album_of(&detail);
        let artist_id = first_artist_id(&origin)?;
        let view = to_json(&detail)?;

        let cascade = self.cascade.clone();
        self.tasks.spawn("album_warm_cascade", async move {
            cascade.warm_artist_catalog(&artist_id, origin).await
        });
        Ok(view)
    }

    pub async fn get_track_view(&self, track_id: &str) -> CatalogResult<JsonValue> {
        if let Some(track) = self.store.get_track(track_id).await? {
            debug!("Track {} served from store", track_id);
            record_cache_lookup("track", "hit");
            return Ok(track.detailed_data);
        }

        debug!("Track {} not stored, fetching from upstream", track_id);
        record_cache_lookup("track", "miss");
        let detail = self
            .gateway
            .get_track(track_id)
            .await
            .map_err(CatalogError::upstream)?;
        let artist_id = first_artist_id(&detail.album)?;
        let view = to_json(&detail)?;

        let cascade = self.cascade.clone();
        let origin = detail.album;
        self.tasks.spawn("track_warm_cascade", async move {
            cascade.warm_artist_catalog(&artist_id, origin).await
        });
        Ok(view)
    }

    /// Upstream search results, unchanged and never mirrored.
    pub async fn search(&self, kind: SearchKind, query: &str) -> CatalogResult<JsonValue> {
        self.gateway
            .search(kind, query, self.settings.search_limit)
            .await
            .map_err(CatalogError::upstream)
    }
}
