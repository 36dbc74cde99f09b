//! Shared constants for end-to-end tests

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const TOKEN_ENCRYPTION_KEY: &str = "test-token-encryption-key";

/// Lifetime of every credential the fake accounts service grants, in seconds.
pub const GRANT_EXPIRES_IN_SEC: i64 = 3600;

/// Prefix of every access token the fake accounts service grants.
pub const GRANTED_TOKEN_PREFIX: &str = "granted";

pub const ARTIST_1_ID: &str = "A1";
pub const ARTIST_1_NAME: &str = "Artist A1";
pub const ARTIST_2_ID: &str = "A2";

/// Default page size of the artist album listing.
pub const ALBUM_PAGE_SIZE: usize = 50;

/// Album id of the `n`-th album of `artist_id`, as served by the fake upstream.
pub fn album_id(artist_id: &str, n: usize) -> String {
    format!("{}AL{}", artist_id, n)
}

/// Track id of the `n`-th track of `album_id`, as served by the fake upstream.
pub fn track_id(album_id: &str, n: usize) -> String {
    format!("{}T{}", album_id, n)
}
