mod client;
mod gateway;
mod models;
mod pagination;

pub use client::{ClientCredentialsGrantor, UpstreamCatalogClient};
pub use gateway::{CatalogGateway, CredentialGrantor, CredentialSource};
pub use models::{
    first_image_url, AlbumDetail, ArtistDetail, CredentialGrant, ExternalUrls, Image, Paging,
    SearchKind, SimplifiedAlbum, SimplifiedArtist, SimplifiedTrack, TrackDetail, TrackWithAlbum,
};
pub use pagination::{fetch_all_artist_albums, ALBUM_PAGE_SIZE};
