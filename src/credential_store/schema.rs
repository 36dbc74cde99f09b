//! SQLite schema definitions for the credential database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

const CREDENTIAL_FIELDS_TABLE: Table = Table {
    name: "credential_fields",
    columns: &[
        sqlite_column!("key", &SqlType::Text, non_null = true),
        sqlite_column!("field", &SqlType::Text, non_null = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
        sqlite_column!(
            "written_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    composite_key: &["key", "field"],
    indices: &[],
};

pub const CREDENTIAL_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[CREDENTIAL_FIELDS_TABLE],
    migration: None,
}];
