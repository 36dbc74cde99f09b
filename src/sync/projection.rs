//! Reshaping of upstream payloads into stored rows.
//!
//! Upstream describes a track differently depending on where it appears: inside
//! an album the track has no album reference, while the single-track response
//! embeds a full album. Both are reduced to [`TrackWithAlbum`], which is what
//! gets stored as a track's detailed data.

use crate::entity_store::{Album, AlbumType, Artist, EntityStoreError, Track};
use crate::error::{CatalogError, CatalogResult};
use crate::upstream::{
    first_image_url, AlbumDetail, ArtistDetail, SimplifiedAlbum, SimplifiedArtist,
    SimplifiedTrack, TrackDetail, TrackWithAlbum,
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

const SIMPLIFIED_ALBUM_EXTRA: &[&str] = &["uri", "href", "type", "release_date_precision"];
const SIMPLIFIED_TRACK_EXTRA: &[&str] = &[
    "explicit",
    "track_number",
    "disc_number",
    "preview_url",
    "uri",
    "href",
    "type",
];
const SIMPLIFIED_ARTIST_EXTRA: &[&str] = &["uri", "href", "type"];

fn keep_extra(extra: &Map<String, JsonValue>, keys: &[&str]) -> Map<String, JsonValue> {
    extra
        .iter()
        .filter(|(k, _)| keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub fn to_json<T: Serialize>(value: &T) -> CatalogResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| CatalogError::Store(EntityStoreError::from(e)))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn simplify_artists(artists: &[SimplifiedArtist]) -> Vec<SimplifiedArtist> {
    artists
        .iter()
        .map(|a| SimplifiedArtist {
            id: a.id.clone(),
            name: a.name.clone(),
            external_urls: a.external_urls.clone(),
            extra: keep_extra(&a.extra, SIMPLIFIED_ARTIST_EXTRA),
        })
        .collect()
}

/// Album reference embedded in every track projection of `album`.
pub fn simplified_album_of(album: &AlbumDetail) -> SimplifiedAlbum {
    SimplifiedAlbum {
        id: album.id.clone(),
        name: album.name.clone(),
        album_type: album.album_type.clone(),
        total_tracks: album.total_tracks,
        release_date: album.release_date.clone(),
        external_urls: album.external_urls.clone(),
        images: album.images.clone(),
        artists: album.artists.clone(),
        extra: keep_extra(&album.extra, SIMPLIFIED_ALBUM_EXTRA),
    }
}

pub fn album_track_projections(album: &AlbumDetail) -> Vec<TrackWithAlbum> {
    let album_ref = simplified_album_of(album);
    album
        .tracks
        .items
        .iter()
        .map(|track| TrackWithAlbum {
            track: track.clone(),
            album: album_ref.clone(),
        })
        .collect()
}

pub fn track_detail_projection(detail: &TrackDetail) -> TrackWithAlbum {
    let album = &detail.album;
    TrackWithAlbum {
        track: SimplifiedTrack {
            id: detail.id.clone(),
            name: detail.name.clone(),
            duration_ms: detail.duration_ms,
            external_urls: detail.external_urls.clone(),
            artists: simplify_artists(&detail.artists),
            extra: keep_extra(&detail.extra, SIMPLIFIED_TRACK_EXTRA),
        },
        album: SimplifiedAlbum {
            extra: keep_extra(&album.extra, SIMPLIFIED_ALBUM_EXTRA),
            ..album.clone()
        },
    }
}

pub fn artist_row(detail: &ArtistDetail) -> CatalogResult<Artist> {
    Ok(Artist {
        id: detail.id.clone(),
        name: detail.name.clone(),
        external_url: detail.external_urls.primary(),
        image_url: first_image_url(&detail.images),
        detailed_data: to_json(detail)?,
        albums_scanned: false,
        updated_at: now(),
    })
}

pub fn album_row(detail: &AlbumDetail) -> CatalogResult<Album> {
    let album_type = AlbumType::from_db_str(&detail.album_type).ok_or_else(|| {
        CatalogError::InvariantViolation(format!(
            "album {} has unknown type {:?}",
            detail.id, detail.album_type
        ))
    })?;

    Ok(Album {
        id: detail.id.clone(),
        name: detail.name.clone(),
        total_tracks: detail.total_tracks,
        album_type,
        release_date: detail.release_date.clone(),
        external_url: detail.external_urls.primary(),
        image_url: first_image_url(&detail.images),
        detailed_data: to_json(detail)?,
        updated_at: now(),
    })
}

pub fn album_track_rows(detail: &AlbumDetail) -> CatalogResult<Vec<Track>> {
    album_track_projections(detail)
        .into_iter()
        .map(|projection| {
            Ok(Track {
                id: projection.track.id.clone(),
                album_id: detail.id.clone(),
                name: projection.track.name.clone(),
                duration_ms: projection.track.duration_ms,
                external_url: projection.track.external_urls.primary(),
                detailed_data: to_json(&projection)?,
                updated_at: now(),
            })
        })
        .collect()
}
