use std::collections::HashMap;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{RatedHistoryEntry, RatingSummary},
};

/// Every past pick, newest first, each with the user's rating if any
pub async fn list_rated_history(store: &dyn Store, uid: &str) -> AppResult<Vec<RatedHistoryEntry>> {
    let (entries, ratings) = tokio::try_join!(store.list_history(uid), store.list_ratings(uid))?;

    // Ratings arrive newest first, so the first one seen per pick wins
    let mut by_recommendation: HashMap<&str, RatingSummary> = HashMap::new();
    for rating in ratings.iter().filter(|r| !r.recommendation_id.is_empty()) {
        by_recommendation
            .entry(rating.recommendation_id.as_str())
            .or_insert_with(|| RatingSummary::from(rating));
    }

    Ok(entries
        .into_iter()
        .map(|entry| {
            let rating = by_recommendation.get(entry.id.as_str()).cloned();
            RatedHistoryEntry { entry, rating }
        })
        .collect())
}

/// One past pick with its rating
pub async fn get_rated_entry(
    store: &dyn Store,
    uid: &str,
    recommendation_id: &str,
) -> AppResult<RatedHistoryEntry> {
    let recommendation_id = recommendation_id.trim();
    if recommendation_id.is_empty() {
        return Err(AppError::InvalidInput(
            "recommendationId is required".to_string(),
        ));
    }

    let (entry, rating) = tokio::try_join!(
        store.get_history_entry(uid, recommendation_id),
        store.rating_for_recommendation(uid, recommendation_id),
    )?;

    let entry = entry.ok_or_else(|| AppError::NotFound("Recommendation not found".to_string()))?;

    Ok(RatedHistoryEntry {
        entry,
        rating: rating.as_ref().map(RatingSummary::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, MockStore};
    use crate::models::{AlbumRatingId, AlbumRatingInput, RecommendationInput};

    fn rating(album: &str, recommendation_id: &str, rating: AlbumRatingId) -> AlbumRatingInput {
        AlbumRatingInput {
            album_name: album.to_string(),
            rating,
            notes: "notes".to_string(),
            recommendation_id: recommendation_id.to_string(),
            spotify_album_id: String::new(),
            spotify_album_image_url: String::new(),
            spotify_artist_name: String::new(),
            spotify_artist_image_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_history_joined_with_ratings() {
        let store = MemoryStore::new();
        let first = store
            .append_history_entry("u1", &RecommendationInput::default())
            .await
            .unwrap();
        let second = store
            .append_history_entry("u1", &RecommendationInput::default())
            .await
            .unwrap();
        store
            .upsert_rating("u1", &rating("Blonde", &first.id, AlbumRatingId::Liked))
            .await
            .unwrap();

        let history = list_rated_history(&store, "u1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].entry.id, second.id);
        assert!(history[0].rating.is_none());
        assert_eq!(history[1].entry.id, first.id);
        assert_eq!(
            history[1].rating.as_ref().map(|r| r.rating),
            Some(AlbumRatingId::Liked)
        );
    }

    #[tokio::test]
    async fn test_detail_blank_id_rejected() {
        let store = MockStore::new();
        let err = get_rated_entry(&store, "u1", "   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_detail_missing_entry_is_not_found() {
        let mut store = MockStore::new();
        store.expect_get_history_entry().returning(|_, _| Ok(None));
        store
            .expect_rating_for_recommendation()
            .returning(|_, _| Ok(None));

        let err = get_rated_entry(&store, "u1", "missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: Recommendation not found");
    }

    #[tokio::test]
    async fn test_detail_includes_rating() {
        let store = MemoryStore::new();
        let entry = store
            .append_history_entry("u1", &RecommendationInput::default())
            .await
            .unwrap();
        store
            .upsert_rating("u1", &rating("Kid A", &entry.id, AlbumRatingId::Loved))
            .await
            .unwrap();

        let detail = get_rated_entry(&store, "u1", &format!(" {} ", entry.id))
            .await
            .unwrap();
        assert_eq!(detail.entry.id, entry.id);
        assert_eq!(detail.rating.unwrap().id, "kid-a");
    }
}
