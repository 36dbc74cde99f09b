//! Catalog Mirror Server Library
//!
//! Cache-aside mirror of an upstream music catalog, exposed for testing and reuse.

pub mod config;
pub mod credential_store;
pub mod entity_store;
pub mod error;
pub mod server;
pub mod sqlite_persistence;
pub mod sync;
pub mod token;
pub mod upstream;

// Re-export commonly used types for convenience
pub use credential_store::{CredentialStore, InMemoryCredentialStore, SqliteCredentialStore};
pub use entity_store::{EntityStore, SqliteEntityStore};
pub use error::{CatalogError, CatalogResult};
pub use server::{run_server, RequestsLoggingLevel};
pub use sync::{BackgroundTasks, SyncEngine, SyncSettings};
pub use token::{TokenCipher, TokenLifecycleManager};
pub use upstream::{CatalogGateway, ClientCredentialsGrantor, UpstreamCatalogClient};
