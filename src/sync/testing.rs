//! In-memory upstream catalog for sync tests.

use crate::upstream::{
    AlbumDetail, ArtistDetail, CatalogGateway, Paging, SearchKind, SimplifiedAlbum, TrackDetail,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub fn artist_detail(id: &str) -> ArtistDetail {
    serde_json::from_value(json!({
        "id": id,
        "name": format!("Artist {}", id),
        "external_urls": {"spotify": format!("https://open.example/artist/{}", id)},
        "images": [{"url": format!("https://img/{}", id), "width": 640, "height": 640}],
        "genres": ["rock"],
        "popularity": 50
    }))
    .unwrap()
}

pub fn album_detail(id: &str, artist_ids: &[&str], track_count: usize) -> AlbumDetail {
    let artists: Vec<JsonValue> = artist_ids
        .iter()
        .map(|a| json!({"id": a, "name": format!("Artist {}", a)}))
        .collect();
    let tracks: Vec<JsonValue> = (0..track_count)
        .map(|n| {
            json!({
                "id": format!("{}-t{}", id, n),
                "name": format!("Track {}", n),
                "duration_ms": 180_000 + n as i64,
                "track_number": n + 1,
                "artists": artists.clone()
            })
        })
        .collect();

    serde_json::from_value(json!({
        "id": id,
        "name": format!("Album {}", id),
        "album_type": "album",
        "total_tracks": track_count,
        "release_date": "2001-01-01",
        "label": "Label",
        "artists": artists,
        "tracks": {"items": tracks, "total": track_count, "limit": 50, "offset": 0}
    }))
    .unwrap()
}

pub fn simplified(album: &AlbumDetail) -> SimplifiedAlbum {
    crate::sync::projection::simplified_album_of(album)
}

/// Counts every call; albums can be made to fail.
#[derive(Default)]
pub struct FakeCatalog {
    artists: Mutex<HashMap<String, ArtistDetail>>,
    albums: Mutex<HashMap<String, AlbumDetail>>,
    tracks: Mutex<HashMap<String, TrackDetail>>,
    listings: Mutex<HashMap<String, Vec<SimplifiedAlbum>>>,
    failing_albums: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn add_artist(&self, artist: ArtistDetail) {
        self.artists
            .lock()
            .unwrap()
            .insert(artist.id.clone(), artist);
    }

    /// Register an album and list it under its first artist.
    pub fn add_album(&self, album: AlbumDetail) {
        if let Some(first) = album.artists.first() {
            self.listings
                .lock()
                .unwrap()
                .entry(first.id.clone())
                .or_default()
                .push(simplified(&album));
        }
        self.albums.lock().unwrap().insert(album.id.clone(), album);
    }

    /// Register an album that no artist listing returns.
    pub fn add_unlisted_album(&self, album: AlbumDetail) {
        self.albums.lock().unwrap().insert(album.id.clone(), album);
    }

    pub fn add_track(&self, track: TrackDetail) {
        self.tracks.lock().unwrap().insert(track.id.clone(), track);
    }

    pub fn fail_album(&self, id: &str) {
        self.failing_albums.lock().unwrap().insert(id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    async fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CatalogGateway for FakeCatalog {
    async fn get_artist(&self, id: &str) -> Result<ArtistDetail> {
        self.record(format!("artist:{}", id)).await;
        self.artists
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("status 404 for artist {}", id))
    }

    async fn get_album(&self, id: &str) -> Result<AlbumDetail> {
        self.record(format!("album:{}", id)).await;
        if self.failing_albums.lock().unwrap().contains(id) {
            anyhow::bail!("status 503 for album {}", id);
        }
        self.albums
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("status 404 for album {}", id))
    }

    async fn get_track(&self, id: &str) -> Result<TrackDetail> {
        self.record(format!("track:{}", id)).await;
        self.tracks
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("status 404 for track {}", id))
    }

    async fn search(&self, kind: SearchKind, query: &str, limit: u32) -> Result<JsonValue> {
        self.record(format!("search:{}:{}:{}", kind.as_query_type(), query, limit))
            .await;
        let mut body = serde_json::Map::new();
        body.insert(
            kind.response_key().to_string(),
            json!({"items": [], "limit": limit, "offset": 0, "total": 0}),
        );
        Ok(JsonValue::Object(body))
    }

    async fn list_artist_albums(
        &self,
        artist_id: &str,
        limit: u32,
        offset: u32,
        _include_groups: &str,
    ) -> Result<Paging<SimplifiedAlbum>> {
        self.record(format!("artist_albums:{}:{}", artist_id, offset))
            .await;
        let listing = self
            .listings
            .lock()
            .unwrap()
            .get(artist_id)
            .cloned()
            .unwrap_or_default();
        let items: Vec<SimplifiedAlbum> = listing
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(Paging {
            items,
            total: None,
            limit: Some(limit),
            offset: Some(offset),
            next: None,
        })
    }
}
