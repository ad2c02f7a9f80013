//! Music catalog abstraction
//!
//! The recommendation loop only talks to the catalog through
//! [`CatalogProvider`], so verification runs the same against Spotify or a
//! test double.
use tracing::instrument;

use crate::{
    error::AppResult,
    models::{CatalogAlbum, RecommendationDraft},
};

pub mod matching;
pub mod spotify;

pub use matching::{names_match, normalize_for_compare, select_best_match};
pub use spotify::SpotifyClient;

/// Default page size for searches issued by the verifier
pub const DEFAULT_SEARCH_LIMIT: u8 = 5;

/// Trait for album catalogs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Search albums by free text. `limit` is clamped to 1..=20.
    async fn search_albums(&self, query: &str, limit: u8) -> AppResult<Vec<CatalogAlbum>>;

    /// Fetch one album by catalog id; `None` when the id does not exist
    async fn get_album(&self, album_id: &str) -> AppResult<Option<CatalogAlbum>>;

    /// Largest artwork URL for an artist; empty when the artist has none
    async fn get_artist_image(&self, artist_id: &str) -> AppResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Clamps a requested page size into the range the catalog accepts
pub fn clamp_limit(limit: u8) -> u8 {
    limit.clamp(1, 20)
}

/// Finds the catalog album for a free-text album/artist pair.
///
/// A field-qualified search runs first; only when it yields no candidates
/// does a broad keyword search run.
#[instrument(skip(catalog), fields(provider = catalog.name()))]
pub async fn find_album(
    catalog: &dyn CatalogProvider,
    album_name: &str,
    artist_name: &str,
) -> AppResult<Option<CatalogAlbum>> {
    let precise = catalog
        .search_albums(
            &format!("album:{} artist:{}", album_name, artist_name),
            DEFAULT_SEARCH_LIMIT,
        )
        .await?;
    if let Some(best) = select_best_match(&precise, album_name, artist_name) {
        tracing::info!(spotify_album_id = %best.id, "Precise catalog match");
        return Ok(Some(best.clone()));
    }

    tracing::info!("Precise search empty, falling back to broad search");
    let broad = catalog
        .search_albums(
            &format!("{} {}", album_name, artist_name),
            DEFAULT_SEARCH_LIMIT,
        )
        .await?;
    let best = select_best_match(&broad, album_name, artist_name).cloned();

    tracing::info!(
        matched = best.is_some(),
        spotify_album_id = best.as_ref().map(|a| a.id.as_str()).unwrap_or(""),
        "Broad catalog search finished"
    );

    Ok(best)
}

/// A draft confirmed against the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedAlbum {
    pub album: CatalogAlbum,
    pub artist_image_url: String,
}

/// Confirms that a drafted album exists and resolves it to its catalog entry.
///
/// A claimed id is checked first and accepted only when the album behind it
/// carries the names the model wrote. Otherwise the names are searched, and
/// the best search result must pass the same name check; a blind
/// first-result fallback does not count as verification.
///
/// Returns `Ok(None)` when the draft cannot be verified; errors are reserved
/// for catalog failures.
#[instrument(
    skip(catalog, draft),
    fields(
        album = %draft.recommended_album_name,
        artist = %draft.recommended_artist_name,
    )
)]
pub async fn verify_draft(
    catalog: &dyn CatalogProvider,
    draft: &RecommendationDraft,
) -> AppResult<Option<VerifiedAlbum>> {
    let album_name = draft.recommended_album_name.trim();
    let artist_name = draft.recommended_artist_name.trim();

    let mut resolved = None;

    if let Some(album_id) = draft.claimed_album_id() {
        match catalog.get_album(album_id).await? {
            Some(album) if names_match(&album, album_name, artist_name) => {
                tracing::info!(spotify_album_id = %album.id, "Claimed album id verified");
                resolved = Some(album);
            }
            Some(album) => {
                tracing::warn!(
                    spotify_album_id = %album.id,
                    catalog_album = %album.name,
                    catalog_artist = %album.artist_name,
                    "Claimed album id points at a different album"
                );
            }
            None => {
                tracing::warn!(spotify_album_id = %album_id, "Claimed album id not found");
            }
        }
    }

    if resolved.is_none() {
        resolved = find_album(catalog, album_name, artist_name)
            .await?
            .filter(|album| names_match(album, album_name, artist_name));
    }

    let Some(album) = resolved else {
        tracing::warn!("Draft could not be verified against the catalog");
        return Ok(None);
    };

    let artist_image_url = match album.artist_id.as_deref() {
        Some(artist_id) => catalog
            .get_artist_image(artist_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, artist_id, "Artist image lookup failed");
                String::new()
            }),
        None => String::new(),
    };

    Ok(Some(VerifiedAlbum {
        album,
        artist_image_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use mockall::predicate::eq;

    fn album(id: &str, name: &str, artist: &str) -> CatalogAlbum {
        CatalogAlbum {
            id: id.to_string(),
            name: name.to_string(),
            artist_name: artist.to_string(),
            artist_id: Some(format!("artist-{}", id)),
            image_url: format!("https://img/{}", id),
        }
    }

    fn draft(album_id: Option<&str>) -> RecommendationDraft {
        RecommendationDraft {
            recommended_album_name: "Kid A".to_string(),
            recommended_artist_name: "Radiohead".to_string(),
            spotify_album_id: album_id.map(str::to_string),
            tagline: "t".to_string(),
            album_description: "d".to_string(),
            why_for_user: "w".to_string(),
        }
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(5), 5);
        assert_eq!(clamp_limit(50), 20);
    }

    #[tokio::test]
    async fn test_find_album_uses_precise_search_first() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_name().return_const("mock");
        catalog
            .expect_search_albums()
            .with(eq("album:Kid A artist:Radiohead"), eq(5u8))
            .times(1)
            .returning(|_, _| Ok(vec![album("kid-a", "Kid A", "Radiohead")]));

        let found = find_album(&catalog, "Kid A", "Radiohead").await.unwrap();
        assert_eq!(found.unwrap().id, "kid-a");
    }

    #[tokio::test]
    async fn test_find_album_falls_back_to_broad_search() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_name().return_const("mock");
        catalog
            .expect_search_albums()
            .with(eq("album:Kid A artist:Radiohead"), eq(5u8))
            .times(1)
            .returning(|_, _| Ok(vec![]));
        catalog
            .expect_search_albums()
            .with(eq("Kid A Radiohead"), eq(5u8))
            .times(1)
            .returning(|_, _| Ok(vec![album("kid-a", "Kid A", "Radiohead")]));

        let found = find_album(&catalog, "Kid A", "Radiohead").await.unwrap();
        assert_eq!(found.unwrap().id, "kid-a");
    }

    #[tokio::test]
    async fn test_verify_accepts_matching_claimed_id() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_get_album()
            .with(eq("kid-a"))
            .returning(|_| Ok(Some(album("kid-a", "Kid A", "Radiohead"))));
        catalog
            .expect_get_artist_image()
            .with(eq("artist-kid-a"))
            .returning(|_| Ok("https://img/radiohead".to_string()));
        catalog.expect_search_albums().never();

        let verified = verify_draft(&catalog, &draft(Some("kid-a")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(verified.album.id, "kid-a");
        assert_eq!(verified.artist_image_url, "https://img/radiohead");
    }

    #[tokio::test]
    async fn test_verify_searches_when_claimed_id_mismatches() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_name().return_const("mock");
        catalog
            .expect_get_album()
            .returning(|_| Ok(Some(album("amnesiac", "Amnesiac", "Radiohead"))));
        catalog
            .expect_search_albums()
            .returning(|_, _| Ok(vec![album("kid-a", "Kid A", "Radiohead")]));
        catalog
            .expect_get_artist_image()
            .returning(|_| Ok(String::new()));

        let verified = verify_draft(&catalog, &draft(Some("amnesiac")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(verified.album.id, "kid-a");
    }

    #[tokio::test]
    async fn test_verify_rejects_unrelated_first_result() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_name().return_const("mock");
        catalog
            .expect_search_albums()
            .returning(|_, _| Ok(vec![album("x", "Greatest Hits", "Somebody Else")]));
        catalog.expect_get_artist_image().never();

        let verified = verify_draft(&catalog, &draft(None)).await.unwrap();
        assert!(verified.is_none());
    }

    #[tokio::test]
    async fn test_verify_tolerates_artist_image_failure() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_name().return_const("mock");
        catalog
            .expect_search_albums()
            .returning(|_, _| Ok(vec![album("kid-a", "Kid A", "Radiohead")]));
        catalog
            .expect_get_artist_image()
            .returning(|_| Err(AppError::ExternalApi("boom".to_string())));

        let verified = verify_draft(&catalog, &draft(None)).await.unwrap().unwrap();
        assert_eq!(verified.artist_image_url, "");
    }

    #[tokio::test]
    async fn test_verify_propagates_catalog_errors() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_get_album()
            .returning(|_| Err(AppError::ExternalApi("Spotify down".to_string())));

        let err = verify_draft(&catalog, &draft(Some("kid-a"))).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
    }
}
