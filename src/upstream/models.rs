//! Payloads of the upstream catalog API.
//!
//! Only the fields the mirror reads are typed; everything else is kept in `extra`
//! so that re-serializing a payload gives back what upstream sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ExternalUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify: Option<String>,
}

impl ExternalUrls {
    pub fn primary(&self) -> String {
        self.spotify.clone().unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// First image url, or empty when upstream has none.
pub fn first_image_url(images: &[Image]) -> String {
    images.first().map(|i| i.url.clone()).unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SimplifiedArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ArtistDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SimplifiedAlbum {
    pub id: String,
    pub name: String,
    pub album_type: String,
    pub total_tracks: i64,
    pub release_date: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SimplifiedTrack {
    pub id: String,
    pub name: String,
    pub duration_ms: i64,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Offset/limit page as returned by listing and search endpoints.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AlbumDetail {
    pub id: String,
    pub name: String,
    pub album_type: String,
    pub total_tracks: i64,
    pub release_date: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
    pub tracks: Paging<SimplifiedTrack>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TrackDetail {
    pub id: String,
    pub name: String,
    pub duration_ms: i64,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
    pub album: SimplifiedAlbum,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Track shape shared by the album response and the single-track response.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TrackWithAlbum {
    #[serde(flatten)]
    pub track: SimplifiedTrack,
    pub album: SimplifiedAlbum,
}

/// Client-credentials grant response.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CredentialGrant {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchKind {
    Artist,
    Album,
    Track,
}

impl SearchKind {
    pub fn as_query_type(&self) -> &'static str {
        match self {
            SearchKind::Artist => "artist",
            SearchKind::Album => "album",
            SearchKind::Track => "track",
        }
    }

    /// Key under which the search response nests the paged results.
    pub fn response_key(&self) -> &'static str {
        match self {
            SearchKind::Artist => "artists",
            SearchKind::Album => "albums",
            SearchKind::Track => "tracks",
        }
    }
}
