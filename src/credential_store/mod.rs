mod memory;
mod schema;
mod store;
mod trait_def;

pub use memory::InMemoryCredentialStore;
pub use store::SqliteCredentialStore;
pub use trait_def::{CredentialFields, CredentialStore};
