/// Spotify Web API catalog provider
///
/// Authenticates with the client-credentials flow and keeps the resulting
/// access token in memory until shortly before Spotify expires it.
///
/// API Flow:
/// 1. Token: POST /api/token on the accounts host → bearer token
/// 2. Search: /v1/search?type=album → album candidates
/// 3. Lookup: /v1/albums/{id} and /v1/artists/{id} → canonical album, artwork
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        CatalogAlbum, SpotifyAlbum, SpotifyArtist, SpotifySearchResponse, SpotifyTokenResponse,
    },
    services::catalog::{clamp_limit, CatalogProvider},
};
use reqwest::{Client as HttpClient, StatusCode, Url};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const SEARCH_CACHE_TTL: u64 = 86_400; // 1 day
const ALBUM_CACHE_TTL: u64 = 604_800; // 1 week

/// Tokens are treated as expired this long before Spotify says they are
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct SpotifyClient {
    http_client: HttpClient,
    client_id: String,
    client_secret: String,
    api_url: String,
    accounts_url: String,
    cache: Cache,
    token: Arc<Mutex<Option<AccessToken>>>,
}

impl SpotifyClient {
    pub fn new(
        cache: Cache,
        client_id: String,
        client_secret: String,
        api_url: String,
        accounts_url: String,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            client_id,
            client_secret,
            api_url,
            accounts_url,
            cache,
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns a valid access token, fetching a new one on a cache miss
    async fn access_token(&self) -> AppResult<String> {
        let mut token = self.token.lock().await;

        if let Some(cached) = token.as_ref() {
            if Instant::now() < cached.expires_at {
                tracing::debug!("Spotify token cache hit");
                return Ok(cached.value.clone());
            }
        }

        tracing::info!("Spotify token cache miss");
        let url = format!("{}/api/token", self.accounts_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "Spotify token fetch failed");
            return Err(AppError::ExternalApi(
                "Failed to authenticate with Spotify".to_string(),
            ));
        }

        let payload: SpotifyTokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(payload.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *token = Some(AccessToken {
            value: payload.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        tracing::info!(expires_in_seconds = payload.expires_in, "Spotify token fetched");
        Ok(payload.access_token)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Builds an API URL, percent-encoding each path segment
    fn api_url(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| AppError::Internal(format!("Invalid Spotify API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Spotify API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET with bearer auth; a 401 drops the cached token and retries once
    async fn authorized_get(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> AppResult<reqwest::Response> {
        for attempt in 0..2 {
            let token = self.access_token().await?;
            let response = self
                .http_client
                .get(url.clone())
                .bearer_auth(token)
                .query(query)
                .send()
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                tracing::warn!("Spotify rejected cached token, refreshing");
                self.invalidate_token().await;
                continue;
            }

            return Ok(response);
        }

        Err(AppError::ExternalApi(
            "Spotify rejected a freshly issued token".to_string(),
        ))
    }

    async fn fetch_search(&self, query: &str, limit: u8) -> AppResult<Vec<CatalogAlbum>> {
        let url = self.api_url(&["v1", "search"])?;
        let response = self
            .authorized_get(
                url,
                &[
                    ("q", query.to_string()),
                    ("type", "album".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(query, status = %status, "Spotify search failed");
            return Err(AppError::ExternalApi(
                "Failed to query Spotify albums".to_string(),
            ));
        }

        let payload: SpotifySearchResponse = response.json().await?;
        let albums: Vec<CatalogAlbum> = payload
            .albums
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .map(CatalogAlbum::from)
            .collect();

        tracing::info!(
            query,
            results = albums.len(),
            provider = "spotify",
            "Album search completed"
        );

        Ok(albums)
    }

    async fn fetch_album(&self, album_id: &str) -> AppResult<Option<CatalogAlbum>> {
        let url = self.api_url(&["v1", "albums", album_id])?;
        let response = self.authorized_get(url, &[]).await?;

        // Spotify answers 400 for ids that are not well-formed, which is what a
        // hallucinated id usually looks like
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST
        ) {
            tracing::warn!(spotify_album_id = album_id, status = %response.status(), "Album not found");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(spotify_album_id = album_id, status = %status, "Album lookup failed");
            return Err(AppError::ExternalApi(
                "Failed to fetch Spotify album by id".to_string(),
            ));
        }

        let album: SpotifyAlbum = response.json().await?;
        Ok(Some(album.into()))
    }

    async fn fetch_artist_image(&self, artist_id: &str) -> AppResult<String> {
        let url = self.api_url(&["v1", "artists", artist_id])?;
        let response = self.authorized_get(url, &[]).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(String::new());
        }

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApi(format!(
                "Spotify artist lookup returned status {}",
                status
            )));
        }

        let artist: SpotifyArtist = response.json().await?;
        Ok(artist
            .images
            .into_iter()
            .next()
            .map(|image| image.url)
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl CatalogProvider for SpotifyClient {
    async fn search_albums(&self, query: &str, limit: u8) -> AppResult<Vec<CatalogAlbum>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }
        let limit = clamp_limit(limit);

        cached!(
            self.cache,
            CacheKey::AlbumSearch {
                query: query.to_string(),
                limit,
            },
            SEARCH_CACHE_TTL,
            self.fetch_search(query, limit)
        )
    }

    async fn get_album(&self, album_id: &str) -> AppResult<Option<CatalogAlbum>> {
        cached!(
            self.cache,
            CacheKey::Album(album_id.to_string()),
            ALBUM_CACHE_TTL,
            self.fetch_album(album_id)
        )
    }

    async fn get_artist_image(&self, artist_id: &str) -> AppResult<String> {
        cached!(
            self.cache,
            CacheKey::ArtistImage(artist_id.to_string()),
            ALBUM_CACHE_TTL,
            self.fetch_artist_image(artist_id)
        )
    }

    fn name(&self) -> &'static str {
        "spotify"
    }
}
