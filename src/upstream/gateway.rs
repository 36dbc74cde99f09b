//! Call surface of the upstream catalog API.

use super::models::{
    AlbumDetail, ArtistDetail, CredentialGrant, Paging, SearchKind, SimplifiedAlbum, TrackDetail,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Obtains a fresh access credential without user interaction.
#[async_trait]
pub trait CredentialGrantor: Send + Sync {
    async fn grant_credential(&self) -> Result<CredentialGrant>;
}

/// Hands out the bearer token to put on outbound catalog calls.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn get_artist(&self, id: &str) -> Result<ArtistDetail>;

    /// Full album, including its track list.
    async fn get_album(&self, id: &str) -> Result<AlbumDetail>;

    /// Single track, including a simplified album reference.
    async fn get_track(&self, id: &str) -> Result<TrackDetail>;

    /// Paged search results, passed through as upstream shaped them.
    async fn search(&self, kind: SearchKind, query: &str, limit: u32) -> Result<JsonValue>;

    async fn list_artist_albums(
        &self,
        artist_id: &str,
        limit: u32,
        offset: u32,
        include_groups: &str,
    ) -> Result<Paging<SimplifiedAlbum>>;
}
