//! HTTP client for the catalog routes

use reqwest::{Client, Response};

pub struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get_artist(&self, id: &str) -> Response {
        self.get(&format!("/v1/artist/{}", id)).await
    }

    pub async fn get_album(&self, id: &str) -> Response {
        self.get(&format!("/v1/album/{}", id)).await
    }

    pub async fn get_track(&self, id: &str) -> Response {
        self.get(&format!("/v1/track/{}", id)).await
    }

    pub async fn search(&self, kind: &str, name: &str) -> Response {
        self.client
            .get(format!("{}/v1/search/{}", self.base_url, kind))
            .query(&[("name", name)])
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn health(&self) -> Response {
        self.get("/health").await
    }
}
