//! Fake upstream catalog and accounts service, served over real HTTP.

use super::constants::*;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Ordered record of what happened across the fake upstream and the credential store.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.snapshot()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    /// Index of the first event starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.snapshot().iter().position(|e| e.starts_with(prefix))
    }
}

#[derive(Default)]
struct CatalogData {
    artists: HashMap<String, JsonValue>,
    albums: HashMap<String, JsonValue>,
    tracks: HashMap<String, JsonValue>,
    listings: HashMap<String, Vec<JsonValue>>,
}

#[derive(Clone)]
struct UpstreamState {
    data: Arc<Mutex<CatalogData>>,
    log: EventLog,
    grants: Arc<AtomicUsize>,
    reject_grants: Arc<AtomicBool>,
}

fn artist_json(id: &str) -> JsonValue {
    json!({
        "id": id,
        "name": format!("Artist {}", id),
        "type": "artist",
        "external_urls": {"spotify": format!("https://open.example/artist/{}", id)},
        "images": [{"url": format!("https://img.example/{}", id), "width": 640, "height": 640}],
        "genres": ["rock"],
        "popularity": 40
    })
}

fn simplified_artist_json(id: &str) -> JsonValue {
    json!({"id": id, "name": format!("Artist {}", id), "type": "artist"})
}

fn simplified_album_json(album_id: &str, artist_id: &str, track_count: usize) -> JsonValue {
    json!({
        "id": album_id,
        "name": format!("Album {}", album_id),
        "album_type": "album",
        "album_group": "album",
        "type": "album",
        "total_tracks": track_count,
        "release_date": "1999-05-01",
        "release_date_precision": "day",
        "external_urls": {"spotify": format!("https://open.example/album/{}", album_id)},
        "images": [{"url": format!("https://img.example/{}", album_id)}],
        "artists": [simplified_artist_json(artist_id)]
    })
}

fn simplified_track_json(track_id: &str, n: usize, artist_id: &str) -> JsonValue {
    json!({
        "id": track_id,
        "name": format!("Track {}", track_id),
        "duration_ms": 200_000 + n as i64,
        "track_number": n + 1,
        "disc_number": 1,
        "explicit": false,
        "type": "track",
        "artists": [simplified_artist_json(artist_id)]
    })
}

fn paging(items: Vec<JsonValue>, total: usize, limit: usize, offset: usize) -> JsonValue {
    json!({"items": items, "total": total, "limit": limit, "offset": offset, "next": null})
}

fn not_found(what: &str, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": {"status": 404, "message": format!("{} {} not found", what, id)}})),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with(&format!("Bearer {}-", GRANTED_TOKEN_PREFIX)))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"status": 401, "message": "Invalid access token"}})),
    )
        .into_response()
}

async fn grant(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let has_basic_auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Basic "))
        .unwrap_or(false);
    if !has_basic_auth || form.get("grant_type").map(String::as_str) != Some("client_credentials") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_request"}))).into_response();
    }
    if state.reject_grants.load(Ordering::SeqCst) {
        state.log.push("grant rejected");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"}))).into_response();
    }

    let n = state.grants.fetch_add(1, Ordering::SeqCst) + 1;
    state.log.push("grant");
    Json(json!({
        "access_token": format!("{}-{}", GRANTED_TOKEN_PREFIX, n),
        "token_type": "Bearer",
        "expires_in": GRANT_EXPIRES_IN_SEC
    }))
    .into_response()
}

async fn get_artist(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.log.push(format!("GET /artists/{}", id));
    match state.data.lock().unwrap().artists.get(&id) {
        Some(artist) => Json(artist.clone()).into_response(),
        None => not_found("artist", &id),
    }
}

async fn get_artist_albums(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let offset: usize = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    state
        .log
        .push(format!("GET /artists/{}/albums offset={} limit={}", id, offset, limit));

    let data = state.data.lock().unwrap();
    let Some(listing) = data.listings.get(&id) else {
        return not_found("artist", &id);
    };
    let items: Vec<JsonValue> = listing.iter().skip(offset).take(limit).cloned().collect();
    Json(paging(items, listing.len(), limit, offset)).into_response()
}

async fn get_album(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.log.push(format!("GET /albums/{}", id));
    match state.data.lock().unwrap().albums.get(&id) {
        Some(album) => Json(album.clone()).into_response(),
        None => not_found("album", &id),
    }
}

async fn get_track(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.log.push(format!("GET /tracks/{}", id));
    match state.data.lock().unwrap().tracks.get(&id) {
        Some(track) => Json(track.clone()).into_response(),
        None => not_found("track", &id),
    }
}

async fn search(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let kind = params.get("type").cloned().unwrap_or_default();
    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let query = params.get("q").cloned().unwrap_or_default();
    state
        .log
        .push(format!("GET /search type={} q={} limit={}", kind, query, limit));

    let data = state.data.lock().unwrap();
    let items: Vec<JsonValue> = match kind.as_str() {
        "artist" => data.artists.values().cloned().collect(),
        "album" => data.listings.values().flatten().cloned().collect(),
        "track" => data.tracks.values().cloned().collect(),
        _ => return (StatusCode::BAD_REQUEST, "unsupported type").into_response(),
    };
    let total = items.len();
    let items = items.into_iter().take(limit).collect();
    let mut body = serde_json::Map::new();
    body.insert(format!("{}s", kind), paging(items, total, limit, 0));
    Json(JsonValue::Object(body)).into_response()
}

/// Upstream API and accounts service on one ephemeral port.
pub struct FakeUpstream {
    pub base_url: String,
    pub accounts_url: String,
    state: UpstreamState,
}

impl FakeUpstream {
    pub async fn spawn(log: EventLog) -> Self {
        let state = UpstreamState {
            data: Arc::new(Mutex::new(CatalogData::default())),
            log,
            grants: Arc::new(AtomicUsize::new(0)),
            reject_grants: Arc::new(AtomicBool::new(false)),
        };

        let app = Router::new()
            .route("/api/token", post(grant))
            .route("/v1/artists/{id}", get(get_artist))
            .route("/v1/artists/{id}/albums", get(get_artist_albums))
            .route("/v1/albums/{id}", get(get_album))
            .route("/v1/tracks/{id}", get(get_track))
            .route("/v1/search", get(search))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake upstream");
        let addr = listener.local_addr().expect("Failed to get local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}/v1", addr),
            accounts_url: format!("http://{}/api/token", addr),
            state,
        }
    }

    /// Publish an artist with `album_count` albums of `tracks_per_album` tracks each.
    pub fn add_artist_with_albums(&self, artist_id: &str, album_count: usize, tracks_per_album: usize) {
        let mut data = self.state.data.lock().unwrap();
        data.artists
            .insert(artist_id.to_string(), artist_json(artist_id));

        let mut listing = Vec::with_capacity(album_count);
        for n in 0..album_count {
            let album_id = album_id(artist_id, n);
            let simplified = simplified_album_json(&album_id, artist_id, tracks_per_album);

            let tracks: Vec<JsonValue> = (0..tracks_per_album)
                .map(|t| simplified_track_json(&track_id(&album_id, t), t, artist_id))
                .collect();
            for (t, track) in tracks.iter().enumerate() {
                let mut detail = track.clone();
                detail["album"] = simplified.clone();
                detail["popularity"] = json!(10 + t);
                data.tracks.insert(track_id(&album_id, t), detail);
            }

            let mut detail = simplified.clone();
            detail["tracks"] = paging(tracks, tracks_per_album, 50, 0);
            detail["label"] = json!("Fake Records");
            detail["popularity"] = json!(25);
            data.albums.insert(album_id, detail);

            listing.push(simplified);
        }
        data.listings.insert(artist_id.to_string(), listing);
    }

    /// Successful grants served so far.
    pub fn grants(&self) -> usize {
        self.state.grants.load(Ordering::SeqCst)
    }

    pub fn reject_grants(&self, reject: bool) {
        self.state.reject_grants.store(reject, Ordering::SeqCst);
    }
}
