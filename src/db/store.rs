use crate::{
    error::AppResult,
    models::{
        AlbumRating, AlbumRatingInput, CurrentRecommendation, RecommendationHistoryEntry,
        RecommendationInput, UserGoals, UserGoalsInput,
    },
};

/// Per-user persistence for ratings, goals and recommendations
///
/// Every write is an atomic upsert: `created_at` is set the first time a
/// document is written and preserved afterwards, `updated_at` moves on every
/// write. History entries are append-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Upserts the rating keyed by the album's normalized name
    async fn upsert_rating(&self, uid: &str, input: &AlbumRatingInput) -> AppResult<AlbumRating>;

    /// All ratings, most recently updated first
    async fn list_ratings(&self, uid: &str) -> AppResult<Vec<AlbumRating>>;

    /// The rating attached to a given recommendation, if the user left one
    async fn rating_for_recommendation(
        &self,
        uid: &str,
        recommendation_id: &str,
    ) -> AppResult<Option<AlbumRating>>;

    async fn get_goals(&self, uid: &str) -> AppResult<Option<UserGoals>>;

    async fn upsert_goals(&self, uid: &str, input: &UserGoalsInput) -> AppResult<UserGoals>;

    async fn get_current_recommendation(
        &self,
        uid: &str,
    ) -> AppResult<Option<CurrentRecommendation>>;

    async fn upsert_current_recommendation(
        &self,
        uid: &str,
        input: &RecommendationInput,
    ) -> AppResult<CurrentRecommendation>;

    /// Appends a ledger entry under a fresh id; the stored
    /// `recommendation_id` always equals that id
    async fn append_history_entry(
        &self,
        uid: &str,
        input: &RecommendationInput,
    ) -> AppResult<RecommendationHistoryEntry>;

    /// All ledger entries, newest first
    async fn list_history(&self, uid: &str) -> AppResult<Vec<RecommendationHistoryEntry>>;

    async fn get_history_entry(
        &self,
        uid: &str,
        recommendation_id: &str,
    ) -> AppResult<Option<RecommendationHistoryEntry>>;

    /// Removes everything stored for the user
    async fn delete_user_data(&self, uid: &str) -> AppResult<()>;

    /// Store name for logging and debugging
    fn name(&self) -> &'static str;
}
