mod background;
mod cascade;
mod engine;
mod projection;

#[cfg(test)]
pub(crate) mod testing;

pub use background::BackgroundTasks;
pub use cascade::CatalogCascade;
pub use engine::{ArtistView, SyncEngine};
pub use projection::{album_track_projections, track_detail_projection};

use crate::upstream::ALBUM_PAGE_SIZE;

/// Tuning of upstream fetches made while syncing.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub album_page_size: u32,
    /// `include_groups` filter used when listing an artist's albums.
    pub album_group: String,
    /// Album details fetched in parallel by one artist cascade. 1 is sequential.
    pub cascade_concurrency: usize,
    pub search_limit: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            album_page_size: ALBUM_PAGE_SIZE,
            album_group: "album".to_string(),
            cascade_concurrency: 1,
            search_limit: 15,
        }
    }
}
