//! SQLite-backed credential store implementation.

use super::schema::CREDENTIAL_VERSIONED_SCHEMAS;
use super::trait_def::{CredentialFields, CredentialStore};
use crate::sqlite_persistence::migrate_if_needed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-backed credential store. Each `(key, field)` pair is one row.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCredentialStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn = Connection::open_with_flags(
            db_path.as_ref(),
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open credential database")?;

        migrate_if_needed(&mut conn, CREDENTIAL_VERSIONED_SCHEMAS, "credential")?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on credential connection")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn read_fields(&self, key: &str) -> Result<Option<CredentialFields>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT field, value FROM credential_fields WHERE key = ?1")?;
        let fields = stmt
            .query_map(params![key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<CredentialFields>>()?;

        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fields))
        }
    }

    async fn write_fields(&self, key: &str, fields: &CredentialFields) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO credential_fields (key, field, value, written_at)
                 VALUES (?1, ?2, ?3, cast(strftime('%s','now') as int))
                 ON CONFLICT(key, field) DO UPDATE SET
                    value = excluded.value,
                    written_at = excluded.written_at",
            )?;
            for (field, value) in fields {
                stmt.execute(params![key, field, value])?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to write credential fields for {}", key))?;
        Ok(())
    }
}
