//! Test server lifecycle management
//!
//! Wires the real token manager, upstream client and sync engine against a
//! [`FakeUpstream`], and serves the HTTP app on an ephemeral port.

use super::constants::*;
use super::upstream::{EventLog, FakeUpstream};
use anyhow::Result;
use async_trait::async_trait;
use catalog_mirror_server::credential_store::{
    CredentialFields, CredentialStore, SqliteCredentialStore,
};
use catalog_mirror_server::entity_store::{EntityStore, SqliteEntityStore};
use catalog_mirror_server::server::{make_app, ServerConfig};
use catalog_mirror_server::sync::{BackgroundTasks, SyncEngine, SyncSettings};
use catalog_mirror_server::token::{
    CredentialRecord, TokenCipher, TokenLifecycleManager, CREDENTIAL_KEY,
};
use catalog_mirror_server::upstream::{ClientCredentialsGrantor, UpstreamCatalogClient};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Credential store that records every write in the shared [`EventLog`].
pub struct RecordingCredentialStore {
    inner: SqliteCredentialStore,
    log: EventLog,
}

#[async_trait]
impl CredentialStore for RecordingCredentialStore {
    async fn read_fields(&self, key: &str) -> Result<Option<CredentialFields>> {
        self.inner.read_fields(key).await
    }

    async fn write_fields(&self, key: &str, fields: &CredentialFields) -> Result<()> {
        self.inner.write_fields(key, fields).await?;
        self.log.push(format!("persist {}", key));
        Ok(())
    }
}

/// Credential written to the store before the server starts.
pub struct SeededCredential {
    pub token: String,
    pub created_at_ms: i64,
    pub expires_in_sec: i64,
}

pub struct TestServerOptions {
    pub settings: SyncSettings,
    pub seeded_credential: Option<SeededCredential>,
    /// Block on the first credential before serving, as the binary does.
    pub wait_for_credential: bool,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            settings: SyncSettings::default(),
            seeded_credential: None,
            wait_for_credential: true,
        }
    }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct TestServer {
    pub base_url: String,
    pub upstream: FakeUpstream,
    pub log: EventLog,
    pub entity_store: Arc<SqliteEntityStore>,
    pub credential_store: Arc<RecordingCredentialStore>,
    pub token_manager: Arc<TokenLifecycleManager>,
    pub tasks: BackgroundTasks,
    /// Delay until the next credential check, when the server waited for one.
    pub first_check: Option<Duration>,
    shutdown: CancellationToken,
    _temp_dir: TempDir,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestServerOptions::default()).await
    }

    pub async fn spawn_with(options: TestServerOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let log = EventLog::default();
        let upstream = FakeUpstream::spawn(log.clone()).await;

        let entity_store = Arc::new(
            SqliteEntityStore::new(temp_dir.path().join("entities.db"))
                .expect("Failed to open entity store"),
        );
        let credential_store = Arc::new(RecordingCredentialStore {
            inner: SqliteCredentialStore::new(temp_dir.path().join("credentials.db"))
                .expect("Failed to open credential store"),
            log: log.clone(),
        });

        let cipher = TokenCipher::new(TOKEN_ENCRYPTION_KEY).expect("Failed to build cipher");
        if let Some(seed) = options.seeded_credential {
            let record = CredentialRecord {
                encrypted_token: cipher.encrypt(&seed.token).expect("Failed to encrypt"),
                expires_in_sec: seed.expires_in_sec,
                created_at_ms: seed.created_at_ms,
            };
            // Straight to the inner store so the seed is not logged
            credential_store
                .inner
                .write_fields(CREDENTIAL_KEY, &record.to_fields())
                .await
                .expect("Failed to seed credential");
        }

        let grantor = Arc::new(
            ClientCredentialsGrantor::new(
                upstream.accounts_url.clone(),
                CLIENT_ID.to_string(),
                CLIENT_SECRET.to_string(),
                5,
            )
            .expect("Failed to build grantor"),
        );
        let token_manager = Arc::new(TokenLifecycleManager::new(
            credential_store.clone(),
            grantor,
            cipher,
        ));
        let gateway = Arc::new(
            UpstreamCatalogClient::new(upstream.base_url.clone(), token_manager.clone(), 5)
                .expect("Failed to build upstream client"),
        );

        let shutdown = CancellationToken::new();
        let first_check = if options.wait_for_credential {
            token_manager.wait_for_credential(&shutdown).await
        } else {
            None
        };

        let tasks = BackgroundTasks::new();
        let store: Arc<dyn EntityStore> = entity_store.clone();
        let engine = Arc::new(SyncEngine::new(
            gateway,
            store.clone(),
            tasks.clone(),
            options.settings,
        ));
        let app = make_app(ServerConfig::default(), engine, store);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local address");
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await;
        });

        Self {
            base_url: format!("http://{}", addr),
            upstream,
            log,
            entity_store,
            credential_store,
            token_manager,
            tasks,
            first_check,
            shutdown,
            _temp_dir: temp_dir,
        }
    }

    /// Wait for every background cascade started so far.
    pub async fn wait_for_background(&self) {
        self.tasks.wait_idle().await;
    }

    pub async fn stored_credential(&self) -> Option<CredentialRecord> {
        let fields = self
            .credential_store
            .read_fields(CREDENTIAL_KEY)
            .await
            .expect("Failed to read credential")?;
        Some(CredentialRecord::from_fields(&fields).expect("Stored credential is malformed"))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
