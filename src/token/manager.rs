use super::cipher::TokenCipher;
use super::record::{checked_expiry_ms, CredentialRecord, TokenError, CREDENTIAL_KEY};
use super::schedule::{next_check_delay, REFRESH_MARGIN_MS, RETRY_BACKOFF};
use crate::credential_store::CredentialStore;
use crate::server::metrics::record_token_refresh;
use crate::upstream::{CredentialGrantor, CredentialSource};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
struct ActiveCredential {
    token: String,
    expires_at_ms: i64,
}

/// Wall-clock source, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Owns the single upstream access credential shared by every outbound call.
///
/// The credential is persisted encrypted in the [`CredentialStore`] so that
/// restarts and sibling processes reuse it instead of asking for a new one.
pub struct TokenLifecycleManager {
    store: Arc<dyn CredentialStore>,
    grantor: Arc<dyn CredentialGrantor>,
    cipher: TokenCipher,
    clock: Arc<dyn Clock>,
    active: RwLock<Option<ActiveCredential>>,
    refresh_guard: tokio::sync::Mutex<()>,
}

impl TokenLifecycleManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        grantor: Arc<dyn CredentialGrantor>,
        cipher: TokenCipher,
    ) -> Self {
        Self {
            store,
            grantor,
            cipher,
            clock: Arc::new(SystemClock),
            active: RwLock::new(None),
            refresh_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // The guarded value is replaced whole, so a poisoned lock still holds a consistent one
    fn install(&self, token: String, expires_at_ms: i64) {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active = Some(ActiveCredential {
            token,
            expires_at_ms,
        });
    }

    fn installed_unexpired(&self) -> Option<String> {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now_ms();
        active
            .as_ref()
            .filter(|c| now < c.expires_at_ms)
            .map(|c| c.token.clone())
    }

    /// Load the stored credential, installing it when still valid.
    ///
    /// Returns the milliseconds the installed credential has left, rounded down
    /// to whole seconds. A missing or expired record triggers a refresh; a record
    /// that cannot be parsed or decrypted is returned as an error.
    pub async fn check_credential(&self) -> Result<i64, TokenError> {
        self.check_credential_within(0).await
    }

    /// [`Self::check_credential`], treating a record that expires within
    /// `margin_ms` as already expired.
    async fn check_credential_within(&self, margin_ms: i64) -> Result<i64, TokenError> {
        let fields = self
            .store
            .read_fields(CREDENTIAL_KEY)
            .await
            .map_err(TokenError::Store)?;

        let Some(fields) = fields else {
            info!("No stored upstream credential, requesting one");
            return self.refresh().await;
        };

        let record = CredentialRecord::from_fields(&fields)?;
        let expires_at_ms = record.expires_at_ms();
        let now = self.clock.now_ms();
        if now >= expires_at_ms {
            info!("Stored upstream credential expired, requesting a new one");
            return self.refresh().await;
        }
        if now.saturating_add(margin_ms) >= expires_at_ms {
            info!(
                "Stored upstream credential expires in {} ms, renewing",
                expires_at_ms - now
            );
            return self.refresh().await;
        }

        let token = self.cipher.decrypt(&record.encrypted_token)?;
        self.install(token, expires_at_ms);

        let time_left_ms = (expires_at_ms - now) / 1000 * 1000;
        debug!("Upstream credential valid for another {} ms", time_left_ms);
        Ok(time_left_ms)
    }

    /// Grant, persist and install a new credential.
    ///
    /// The record is written before the credential is installed, so no outbound
    /// call ever uses a token that is not yet durable.
    pub async fn refresh(&self) -> Result<i64, TokenError> {
        let result = self.grant_and_persist().await;
        record_token_refresh(result.is_ok());
        result
    }

    async fn grant_and_persist(&self) -> Result<i64, TokenError> {
        let grant = self
            .grantor
            .grant_credential()
            .await
            .map_err(TokenError::Grant)?;

        let created_at_ms = self.clock.now_ms();
        let expires_at_ms = checked_expiry_ms(created_at_ms, grant.expires_in)
            .filter(|_| grant.expires_in > 0)
            .ok_or_else(|| {
                TokenError::Grant(anyhow::anyhow!(
                    "grant lifetime of {}s is out of range",
                    grant.expires_in
                ))
            })?;

        let record = CredentialRecord {
            encrypted_token: self.cipher.encrypt(&grant.access_token)?,
            expires_in_sec: grant.expires_in,
            created_at_ms,
        };
        self.store
            .write_fields(CREDENTIAL_KEY, &record.to_fields())
            .await
            .map_err(TokenError::Store)?;

        self.install(grant.access_token, expires_at_ms);
        info!(
            "Upstream credential refreshed, expires in {}s",
            grant.expires_in
        );
        Ok(expires_at_ms - created_at_ms)
    }

    /// Make sure a valid credential is installed, returning its remaining lifetime in ms.
    ///
    /// A bad stored record is logged and replaced by a fresh grant.
    pub async fn ensure_credential_fresh(&self) -> Result<i64, TokenError> {
        self.ensure_credential_fresh_within(0).await
    }

    async fn ensure_credential_fresh_within(&self, margin_ms: i64) -> Result<i64, TokenError> {
        match self.check_credential_within(margin_ms).await {
            Err(e) if e.is_bad_record() => {
                error!("Discarding stored upstream credential: {}", e);
                self.refresh().await
            }
            other => other,
        }
    }

    /// Block until a credential is installed, retrying on failure.
    ///
    /// Returns the delay until the next scheduled check, or `None` on shutdown.
    pub async fn wait_for_credential(&self, shutdown: &CancellationToken) -> Option<Duration> {
        loop {
            match self.ensure_credential_fresh_within(REFRESH_MARGIN_MS).await {
                Ok(remaining_ms) => return Some(next_check_delay(remaining_ms)),
                Err(e) => {
                    warn!(
                        "Could not obtain upstream credential, retrying in {:?}: {}",
                        RETRY_BACKOFF, e
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(RETRY_BACKOFF) => {}
                        _ = shutdown.cancelled() => return None,
                    }
                }
            }
        }
    }

    /// Self-rescheduling renewal loop. Runs until `shutdown` is cancelled.
    ///
    /// A credential within [`REFRESH_MARGIN_MS`] of expiry is renewed at the check.
    pub async fn run_refresh_loop(
        self: Arc<Self>,
        first_delay: Duration,
        shutdown: CancellationToken,
    ) {
        let mut delay = first_delay;
        loop {
            debug!("Next upstream credential check in {:?}", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    info!("Credential refresh loop stopped");
                    return;
                }
            }

            delay = {
                let _guard = self.refresh_guard.lock().await;
                match self.ensure_credential_fresh_within(REFRESH_MARGIN_MS).await {
                    Ok(remaining_ms) => next_check_delay(remaining_ms),
                    Err(e) => {
                        error!(
                            "Upstream credential check failed, retrying in {:?}: {}",
                            RETRY_BACKOFF, e
                        );
                        RETRY_BACKOFF
                    }
                }
            };
        }
    }
}

#[async_trait]
impl CredentialSource for TokenLifecycleManager {
    async fn access_token(&self) -> anyhow::Result<String> {
        if let Some(token) = self.installed_unexpired() {
            return Ok(token);
        }

        let _guard = self.refresh_guard.lock().await;
        // Another caller may have refreshed while we waited
        if let Some(token) = self.installed_unexpired() {
            return Ok(token);
        }

        self.ensure_credential_fresh().await?;
        self.installed_unexpired()
            .ok_or_else(|| anyhow::anyhow!("Upstream credential expired right after refresh"))
    }
}
