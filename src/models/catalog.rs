use serde::{Deserialize, Serialize};

/// An album as resolved from the music catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAlbum {
    pub id: String,
    pub name: String,
    pub artist_name: String,
    /// Primary artist id, used to look up artist artwork
    #[serde(default)]
    pub artist_id: Option<String>,
    pub image_url: String,
}

// ============================================================================
// Spotify Web API Types
// ============================================================================

/// Response from POST /api/token (client credentials)
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    #[allow(dead_code)]
    pub token_type: String,
    pub expires_in: u64,
}

/// Response from GET /v1/search?type=album
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySearchResponse {
    #[serde(default)]
    pub albums: Option<SpotifyPage<SpotifyAlbum>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Album object, shared by search results and GET /v1/albums/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtistRef>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
    #[allow(dead_code)]
    pub width: Option<u32>,
    #[allow(dead_code)]
    pub height: Option<u32>,
}

/// Response from GET /v1/artists/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

impl From<SpotifyAlbum> for CatalogAlbum {
    fn from(album: SpotifyAlbum) -> Self {
        // Spotify lists the primary artist first and the largest image first
        let (artist_name, artist_id) = album
            .artists
            .into_iter()
            .next()
            .map(|artist| (artist.name, artist.id))
            .unwrap_or_else(|| ("Unknown Artist".to_string(), None));

        CatalogAlbum {
            id: album.id,
            name: album.name,
            artist_name,
            artist_id,
            image_url: album
                .images
                .into_iter()
                .next()
                .map(|image| image.url)
                .unwrap_or_default(),
        }
    }
}
