use super::gateway::CatalogGateway;
use super::models::SimplifiedAlbum;
use anyhow::{Context, Result};
use tracing::debug;

/// Page size used by upstream when listing an artist's albums.
pub const ALBUM_PAGE_SIZE: u32 = 50;

/// Collect every album of an artist, one page at a time.
///
/// Stops at the first page holding fewer than `page_size` items; the upstream
/// "next" link is not consulted.
pub async fn fetch_all_artist_albums(
    gateway: &dyn CatalogGateway,
    artist_id: &str,
    page_size: u32,
    include_groups: &str,
) -> Result<Vec<SimplifiedAlbum>> {
    let mut albums = Vec::new();
    let mut offset = 0;

    loop {
        let page = gateway
            .list_artist_albums(artist_id, page_size, offset, include_groups)
            .await
            .with_context(|| {
                format!(
                    "Failed to list albums of artist {} at offset {}",
                    artist_id, offset
                )
            })?;

        let page_len = page.items.len();
        debug!(
            "Artist {} albums page at offset {}: {} items",
            artist_id, offset, page_len
        );
        albums.extend(page.items);

        if page_len < page_size as usize {
            break;
        }
        offset += page_size;
    }

    Ok(albums)
}
