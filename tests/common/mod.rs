//! Common test infrastructure
//!
//! Every test gets its own [`TestServer`]: fresh SQLite stores in a temp dir,
//! the real token manager and upstream client, and a [`FakeUpstream`] serving
//! both the catalog API and the accounts token endpoint.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestClient, TestServer, ARTIST_1_ID};
//!
//! #[tokio::test]
//! async fn test_get_artist() {
//!     let server = TestServer::spawn().await;
//!     server.upstream.add_artist_with_albums(ARTIST_1_ID, 2, 3);
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.get_artist(ARTIST_1_ID).await;
//!     assert_eq!(response.status(), reqwest::StatusCode::OK);
//! }
//! ```

#![allow(dead_code)]

mod client;
mod constants;
mod server;
mod upstream;

// Public API - this is what tests import
pub use client::TestClient;
pub use constants::*;
#[allow(unused_imports)]
pub use server::{now_ms, SeededCredential, TestServer, TestServerOptions};
#[allow(unused_imports)]
pub use upstream::{EventLog, FakeUpstream};
