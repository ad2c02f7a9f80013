use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{
        album_key, AlbumRating, AlbumRatingInput, CurrentRecommendation,
        RecommendationHistoryEntry, RecommendationInput, UserGoals, UserGoalsInput,
    },
};

/// Everything held for one user
#[derive(Default)]
struct UserData {
    ratings: HashMap<String, AlbumRating>,
    goals: Option<UserGoals>,
    current: Option<CurrentRecommendation>,
    /// Insertion order, oldest first
    history: Vec<RecommendationHistoryEntry>,
}

/// Process-local store used by tests and by runs without a database
///
/// A single write lock spans each read-modify-write, which gives the same
/// upsert atomicity the Postgres store gets from `ON CONFLICT`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn upsert_rating(&self, uid: &str, input: &AlbumRatingInput) -> AppResult<AlbumRating> {
        let key = album_key(&input.album_name);
        if key.is_empty() {
            return Err(AppError::InvalidInput(
                "Album name cannot be empty".to_string(),
            ));
        }

        let mut users = self.users.write().await;
        let user = users.entry(uid.to_string()).or_default();
        let now = Utc::now();
        let created_at = user.ratings.get(&key).map_or(now, |r| r.created_at);

        let rating = AlbumRating {
            id: key.clone(),
            album_name: input.album_name.clone(),
            rating: input.rating,
            notes: input.notes.clone(),
            recommendation_id: input.recommendation_id.clone(),
            spotify_album_id: input.spotify_album_id.clone(),
            spotify_album_image_url: input.spotify_album_image_url.clone(),
            spotify_artist_name: input.spotify_artist_name.clone(),
            spotify_artist_image_url: input.spotify_artist_image_url.clone(),
            created_at,
            updated_at: now,
        };
        user.ratings.insert(key, rating.clone());

        Ok(rating)
    }

    async fn list_ratings(&self, uid: &str) -> AppResult<Vec<AlbumRating>> {
        let users = self.users.read().await;
        let mut ratings: Vec<AlbumRating> = users
            .get(uid)
            .map(|user| user.ratings.values().cloned().collect())
            .unwrap_or_default();
        ratings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(ratings)
    }

    async fn rating_for_recommendation(
        &self,
        uid: &str,
        recommendation_id: &str,
    ) -> AppResult<Option<AlbumRating>> {
        let users = self.users.read().await;
        Ok(users.get(uid).and_then(|user| {
            user.ratings
                .values()
                .filter(|r| r.recommendation_id == recommendation_id)
                .max_by_key(|r| r.updated_at)
                .cloned()
        }))
    }

    async fn get_goals(&self, uid: &str) -> AppResult<Option<UserGoals>> {
        let users = self.users.read().await;
        Ok(users.get(uid).and_then(|user| user.goals.clone()))
    }

    async fn upsert_goals(&self, uid: &str, input: &UserGoalsInput) -> AppResult<UserGoals> {
        let mut users = self.users.write().await;
        let user = users.entry(uid.to_string()).or_default();
        let now = Utc::now();

        let goals = UserGoals {
            selected_goals: input.selected_goals.clone(),
            notes: input.notes.clone(),
            created_at: user.goals.as_ref().map_or(now, |g| g.created_at),
            updated_at: now,
        };
        user.goals = Some(goals.clone());

        Ok(goals)
    }

    async fn get_current_recommendation(
        &self,
        uid: &str,
    ) -> AppResult<Option<CurrentRecommendation>> {
        let users = self.users.read().await;
        Ok(users.get(uid).and_then(|user| user.current.clone()))
    }

    async fn upsert_current_recommendation(
        &self,
        uid: &str,
        input: &RecommendationInput,
    ) -> AppResult<CurrentRecommendation> {
        let mut users = self.users.write().await;
        let user = users.entry(uid.to_string()).or_default();
        let now = Utc::now();

        let current = CurrentRecommendation {
            recommendation: input.clone(),
            created_at: user.current.as_ref().map_or(now, |c| c.created_at),
            updated_at: now,
        };
        user.current = Some(current.clone());

        Ok(current)
    }

    async fn append_history_entry(
        &self,
        uid: &str,
        input: &RecommendationInput,
    ) -> AppResult<RecommendationHistoryEntry> {
        let mut users = self.users.write().await;
        let user = users.entry(uid.to_string()).or_default();
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let entry = RecommendationHistoryEntry {
            id: id.clone(),
            recommendation: input.clone().with_recommendation_id(id),
            created_at: now,
            updated_at: now,
        };
        user.history.push(entry.clone());

        Ok(entry)
    }

    async fn list_history(&self, uid: &str) -> AppResult<Vec<RecommendationHistoryEntry>> {
        let users = self.users.read().await;
        let mut history: Vec<RecommendationHistoryEntry> = users
            .get(uid)
            .map(|user| user.history.iter().rev().cloned().collect())
            .unwrap_or_default();
        // Stable sort keeps newest-inserted first among equal timestamps
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(history)
    }

    async fn get_history_entry(
        &self,
        uid: &str,
        recommendation_id: &str,
    ) -> AppResult<Option<RecommendationHistoryEntry>> {
        let users = self.users.read().await;
        Ok(users.get(uid).and_then(|user| {
            user.history
                .iter()
                .find(|entry| entry.id == recommendation_id)
                .cloned()
        }))
    }

    async fn delete_user_data(&self, uid: &str) -> AppResult<()> {
        self.users.write().await.remove(uid);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlbumRatingId, UserGoalId};

    fn rating_input(album: &str, rating: AlbumRatingId) -> AlbumRatingInput {
        AlbumRatingInput {
            album_name: album.to_string(),
            rating,
            notes: String::new(),
            recommendation_id: String::new(),
            spotify_album_id: String::new(),
            spotify_album_image_url: String::new(),
            spotify_artist_name: String::new(),
            spotify_artist_image_url: String::new(),
        }
    }

    fn recommendation(album_id: &str) -> RecommendationInput {
        RecommendationInput {
            spotify_album_id: album_id.to_string(),
            spotify_album_name: format!("Album {}", album_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_rating_upsert_keeps_created_at() {
        let store = MemoryStore::new();
        let first = store
            .upsert_rating("u1", &rating_input("OK Computer", AlbumRatingId::Liked))
            .await
            .unwrap();
        let second = store
            .upsert_rating("u1", &rating_input("ok computer!", AlbumRatingId::Loved))
            .await
            .unwrap();

        assert_eq!(first.id, "ok-computer");
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.rating, AlbumRatingId::Loved);
        assert_eq!(store.list_ratings("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rating_rejects_empty_key() {
        let store = MemoryStore::new();
        let err = store
            .upsert_rating("u1", &rating_input("!!!", AlbumRatingId::Liked))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_ratings_are_per_user() {
        let store = MemoryStore::new();
        store
            .upsert_rating("u1", &rating_input("Blonde", AlbumRatingId::Liked))
            .await
            .unwrap();

        assert!(store.list_ratings("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rating_for_recommendation() {
        let store = MemoryStore::new();
        let mut input = rating_input("Blonde", AlbumRatingId::Loved);
        input.recommendation_id = "rec-1".to_string();
        store.upsert_rating("u1", &input).await.unwrap();

        let found = store.rating_for_recommendation("u1", "rec-1").await.unwrap();
        assert_eq!(found.unwrap().album_name, "Blonde");
        assert!(store
            .rating_for_recommendation("u1", "rec-2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_history_newest_first_and_self_referencing() {
        let store = MemoryStore::new();
        let first = store
            .append_history_entry("u1", &recommendation("a"))
            .await
            .unwrap();
        let second = store
            .append_history_entry("u1", &recommendation("b"))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.recommendation.recommendation_id, first.id);

        let history = store.list_history("u1").await.unwrap();
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);

        let fetched = store.get_history_entry("u1", &first.id).await.unwrap();
        assert_eq!(fetched.unwrap().recommendation.spotify_album_id, "a");
    }

    #[tokio::test]
    async fn test_current_recommendation_overwrites() {
        let store = MemoryStore::new();
        let first = store
            .upsert_current_recommendation("u1", &recommendation("a"))
            .await
            .unwrap();
        let second = store
            .upsert_current_recommendation("u1", &recommendation("b"))
            .await
            .unwrap();

        assert_eq!(second.created_at, first.created_at);
        let current = store.get_current_recommendation("u1").await.unwrap().unwrap();
        assert_eq!(current.recommendation.spotify_album_id, "b");
    }

    #[tokio::test]
    async fn test_delete_user_data_clears_everything() {
        let store = MemoryStore::new();
        store
            .upsert_goals(
                "u1",
                &UserGoalsInput {
                    selected_goals: vec![UserGoalId::ExpandMusicTastes],
                    notes: String::new(),
                },
            )
            .await
            .unwrap();
        store
            .append_history_entry("u1", &recommendation("a"))
            .await
            .unwrap();

        store.delete_user_data("u1").await.unwrap();

        assert!(store.get_goals("u1").await.unwrap().is_none());
        assert!(store.list_history("u1").await.unwrap().is_empty());
    }
}
