//! In-memory credential store, for tests and throwaway runs.

use super::trait_def::{CredentialFields, CredentialStore};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryCredentialStore {
    entries: Mutex<HashMap<String, CredentialFields>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn read_fields(&self, key: &str) -> Result<Option<CredentialFields>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).filter(|f| !f.is_empty()).cloned())
    }

    async fn write_fields(&self, key: &str, fields: &CredentialFields) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key.to_string()).or_default();
        for (field, value) in fields {
            entry.insert(field.clone(), value.clone());
        }
        Ok(())
    }
}
