//! HTTP clients for the upstream catalog and its accounts service.

use super::gateway::{CatalogGateway, CredentialGrantor, CredentialSource};
use super::models::{
    AlbumDetail, ArtistDetail, CredentialGrant, Paging, SearchKind, SimplifiedAlbum, TrackDetail,
};
use crate::server::metrics::record_upstream_request;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

fn build_http_client(timeout_sec: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_sec))
        .build()
        .context("Failed to create HTTP client")
}

/// Requests credentials with the client-credentials grant.
pub struct ClientCredentialsGrantor {
    client: reqwest::Client,
    accounts_url: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentialsGrantor {
    pub fn new(
        accounts_url: String,
        client_id: String,
        client_secret: String,
        timeout_sec: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout_sec)?,
            accounts_url,
            client_id,
            client_secret,
        })
    }
}

#[async_trait]
impl CredentialGrantor for ClientCredentialsGrantor {
    async fn grant_credential(&self) -> Result<CredentialGrant> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.accounts_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Failed to reach accounts service");

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                record_upstream_request("token", false, start.elapsed());
                anyhow::bail!("Credential grant rejected: status {}", r.status());
            }
            Err(e) => {
                record_upstream_request("token", false, start.elapsed());
                return Err(e);
            }
        };

        let grant = response
            .json::<CredentialGrant>()
            .await
            .context("Failed to parse credential grant");
        record_upstream_request("token", grant.is_ok(), start.elapsed());
        grant
    }
}

/// Bearer-authenticated client for the upstream catalog API.
pub struct UpstreamCatalogClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
}

impl UpstreamCatalogClient {
    pub fn new(
        base_url: String,
        credentials: Arc<dyn CredentialSource>,
        timeout_sec: u64,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client: build_http_client(timeout_sec)?,
            base_url,
            credentials,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let start = Instant::now();
        let result = self.send_get(path, query).await;
        record_upstream_request(endpoint, result.is_ok(), start.elapsed());
        result
    }

    async fn send_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let token = self
            .credentials
            .access_token()
            .await
            .context("No upstream credential available")?;

        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to reach upstream at {}", path))?;

        if !response.status().is_success() {
            anyhow::bail!("Upstream {} failed: status {}", path, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse upstream response for {}", path))
    }
}

#[async_trait]
impl CatalogGateway for UpstreamCatalogClient {
    async fn get_artist(&self, id: &str) -> Result<ArtistDetail> {
        self.get_json("artist", &format!("/artists/{}", id), &[])
            .await
    }

    async fn get_album(&self, id: &str) -> Result<AlbumDetail> {
        self.get_json("album", &format!("/albums/{}", id), &[]).await
    }

    async fn get_track(&self, id: &str) -> Result<TrackDetail> {
        self.get_json("track", &format!("/tracks/{}", id), &[]).await
    }

    async fn search(&self, kind: SearchKind, query: &str, limit: u32) -> Result<JsonValue> {
        self.get_json(
            "search",
            "/search",
            &[
                ("q", query.to_string()),
                ("type", kind.as_query_type().to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn list_artist_albums(
        &self,
        artist_id: &str,
        limit: u32,
        offset: u32,
        include_groups: &str,
    ) -> Result<Paging<SimplifiedAlbum>> {
        self.get_json(
            "artist_albums",
            &format!("/artists/{}/albums", artist_id),
            &[
                ("include_groups", include_groups.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ],
        )
        .await
    }
}
