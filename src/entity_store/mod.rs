mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{
    Album, AlbumArtistLink, AlbumType, Artist, EntityKind, EntityStats, EntityStoreError, Track,
};
pub use store::SqliteEntityStore;
pub use trait_def::{EntityStore, EntityStoreResult};
