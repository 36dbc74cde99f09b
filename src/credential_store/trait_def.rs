//! CredentialStore trait definition.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Field map stored under a single key.
pub type CredentialFields = HashMap<String, String>;

/// Durable key -> field map storage shared by every process that talks to upstream.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read every field stored under `key`, or `None` if the key has no fields.
    async fn read_fields(&self, key: &str) -> Result<Option<CredentialFields>>;

    /// Write `fields` under `key`, replacing the values of fields that already exist.
    /// Fields not named in `fields` are left untouched.
    async fn write_fields(&self, key: &str, fields: &CredentialFields) -> Result<()>;
}
