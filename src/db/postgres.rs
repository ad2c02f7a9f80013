use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{
        album_key, AlbumRating, AlbumRatingId, AlbumRatingInput, CurrentRecommendation,
        RecommendationHistoryEntry, RecommendationInput, UserGoalId, UserGoals, UserGoalsInput,
    },
};

/// Creates a PostgreSQL connection pool and brings the schema up to date
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[derive(FromRow)]
struct RatingRow {
    id: String,
    album_name: String,
    rating: String,
    notes: String,
    recommendation_id: String,
    spotify_album_id: String,
    spotify_album_image_url: String,
    spotify_artist_name: String,
    spotify_artist_image_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RatingRow> for AlbumRating {
    type Error = AppError;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        let rating = row.rating.parse::<AlbumRatingId>().map_err(|_| {
            AppError::Internal(format!("Unknown rating '{}' stored for {}", row.rating, row.id))
        })?;

        Ok(AlbumRating {
            id: row.id,
            album_name: row.album_name,
            rating,
            notes: row.notes,
            recommendation_id: row.recommendation_id,
            spotify_album_id: row.spotify_album_id,
            spotify_album_image_url: row.spotify_album_image_url,
            spotify_artist_name: row.spotify_artist_name,
            spotify_artist_image_url: row.spotify_artist_image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct GoalsRow {
    selected_goals: Vec<String>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GoalsRow> for UserGoals {
    fn from(row: GoalsRow) -> Self {
        UserGoals {
            // Goal ids retired since the row was written are dropped
            selected_goals: row
                .selected_goals
                .iter()
                .filter_map(|id| UserGoalId::from_id(id))
                .collect(),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Shared shape of `current_recommendations` and `recommendation_history` rows
#[derive(FromRow)]
struct RecommendationRow {
    recommendation_id: String,
    tagline: String,
    album_description: String,
    why_for_user: String,
    spotify_album_image_url: String,
    spotify_album_id: String,
    spotify_album_name: String,
    spotify_artist_name: String,
    spotify_artist_image_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecommendationRow {
    fn into_input(self) -> (RecommendationInput, DateTime<Utc>, DateTime<Utc>) {
        (
            RecommendationInput {
                recommendation_id: self.recommendation_id,
                tagline: self.tagline,
                album_description: self.album_description,
                why_for_user: self.why_for_user,
                spotify_album_image_url: self.spotify_album_image_url,
                spotify_album_id: self.spotify_album_id,
                spotify_album_name: self.spotify_album_name,
                spotify_artist_name: self.spotify_artist_name,
                spotify_artist_image_url: self.spotify_artist_image_url,
            },
            self.created_at,
            self.updated_at,
        )
    }
}

impl From<RecommendationRow> for CurrentRecommendation {
    fn from(row: RecommendationRow) -> Self {
        let (recommendation, created_at, updated_at) = row.into_input();
        CurrentRecommendation {
            recommendation,
            created_at,
            updated_at,
        }
    }
}

impl From<RecommendationRow> for RecommendationHistoryEntry {
    fn from(row: RecommendationRow) -> Self {
        let (recommendation, created_at, updated_at) = row.into_input();
        RecommendationHistoryEntry {
            id: recommendation.recommendation_id.clone(),
            recommendation,
            created_at,
            updated_at,
        }
    }
}

const RATING_COLUMNS: &str = "id, album_name, rating, notes, recommendation_id, \
     spotify_album_id, spotify_album_image_url, spotify_artist_name, \
     spotify_artist_image_url, created_at, updated_at";

const CURRENT_COLUMNS: &str = "recommendation_id, tagline, album_description, why_for_user, \
     spotify_album_image_url, spotify_album_id, spotify_album_name, spotify_artist_name, \
     spotify_artist_image_url, created_at, updated_at";

const HISTORY_COLUMNS: &str = "id AS recommendation_id, tagline, album_description, \
     why_for_user, spotify_album_image_url, spotify_album_id, spotify_album_name, \
     spotify_artist_name, spotify_artist_image_url, created_at, updated_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn upsert_rating(&self, uid: &str, input: &AlbumRatingInput) -> AppResult<AlbumRating> {
        let key = album_key(&input.album_name);
        if key.is_empty() {
            return Err(AppError::InvalidInput(
                "Album name cannot be empty".to_string(),
            ));
        }

        let sql = format!(
            r#"
            INSERT INTO album_ratings (
                user_id, id, album_name, rating, notes, recommendation_id,
                spotify_album_id, spotify_album_image_url, spotify_artist_name,
                spotify_artist_image_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now())
            ON CONFLICT (user_id, id) DO UPDATE SET
                album_name = EXCLUDED.album_name,
                rating = EXCLUDED.rating,
                notes = EXCLUDED.notes,
                recommendation_id = EXCLUDED.recommendation_id,
                spotify_album_id = EXCLUDED.spotify_album_id,
                spotify_album_image_url = EXCLUDED.spotify_album_image_url,
                spotify_artist_name = EXCLUDED.spotify_artist_name,
                spotify_artist_image_url = EXCLUDED.spotify_artist_image_url,
                updated_at = now()
            RETURNING {}
            "#,
            RATING_COLUMNS
        );

        let row: RatingRow = sqlx::query_as(&sql)
            .bind(uid)
            .bind(&key)
            .bind(&input.album_name)
            .bind(input.rating.as_str())
            .bind(&input.notes)
            .bind(&input.recommendation_id)
            .bind(&input.spotify_album_id)
            .bind(&input.spotify_album_image_url)
            .bind(&input.spotify_artist_name)
            .bind(&input.spotify_artist_image_url)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn list_ratings(&self, uid: &str) -> AppResult<Vec<AlbumRating>> {
        let sql = format!(
            "SELECT {} FROM album_ratings WHERE user_id = $1 ORDER BY updated_at DESC",
            RATING_COLUMNS
        );

        let rows: Vec<RatingRow> = sqlx::query_as(&sql)
            .bind(uid)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AlbumRating::try_from).collect()
    }

    async fn rating_for_recommendation(
        &self,
        uid: &str,
        recommendation_id: &str,
    ) -> AppResult<Option<AlbumRating>> {
        let sql = format!(
            "SELECT {} FROM album_ratings \
             WHERE user_id = $1 AND recommendation_id = $2 \
             ORDER BY updated_at DESC LIMIT 1",
            RATING_COLUMNS
        );

        let row: Option<RatingRow> = sqlx::query_as(&sql)
            .bind(uid)
            .bind(recommendation_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AlbumRating::try_from).transpose()
    }

    async fn get_goals(&self, uid: &str) -> AppResult<Option<UserGoals>> {
        let row: Option<GoalsRow> = sqlx::query_as(
            "SELECT selected_goals, notes, created_at, updated_at FROM user_goals WHERE user_id = $1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserGoals::from))
    }

    async fn upsert_goals(&self, uid: &str, input: &UserGoalsInput) -> AppResult<UserGoals> {
        let goal_ids: Vec<&str> = input.selected_goals.iter().map(|g| g.as_str()).collect();

        let row: GoalsRow = sqlx::query_as(
            r#"
            INSERT INTO user_goals (user_id, selected_goals, notes, created_at, updated_at)
            VALUES ($1, $2, $3, now(), now())
            ON CONFLICT (user_id) DO UPDATE SET
                selected_goals = EXCLUDED.selected_goals,
                notes = EXCLUDED.notes,
                updated_at = now()
            RETURNING selected_goals, notes, created_at, updated_at
            "#,
        )
        .bind(uid)
        .bind(&goal_ids)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_current_recommendation(
        &self,
        uid: &str,
    ) -> AppResult<Option<CurrentRecommendation>> {
        let sql = format!(
            "SELECT {} FROM current_recommendations WHERE user_id = $1",
            CURRENT_COLUMNS
        );

        let row: Option<RecommendationRow> = sqlx::query_as(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CurrentRecommendation::from))
    }

    async fn upsert_current_recommendation(
        &self,
        uid: &str,
        input: &RecommendationInput,
    ) -> AppResult<CurrentRecommendation> {
        let sql = format!(
            r#"
            INSERT INTO current_recommendations (
                user_id, recommendation_id, tagline, album_description, why_for_user,
                spotify_album_image_url, spotify_album_id, spotify_album_name,
                spotify_artist_name, spotify_artist_image_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now())
            ON CONFLICT (user_id) DO UPDATE SET
                recommendation_id = EXCLUDED.recommendation_id,
                tagline = EXCLUDED.tagline,
                album_description = EXCLUDED.album_description,
                why_for_user = EXCLUDED.why_for_user,
                spotify_album_image_url = EXCLUDED.spotify_album_image_url,
                spotify_album_id = EXCLUDED.spotify_album_id,
                spotify_album_name = EXCLUDED.spotify_album_name,
                spotify_artist_name = EXCLUDED.spotify_artist_name,
                spotify_artist_image_url = EXCLUDED.spotify_artist_image_url,
                updated_at = now()
            RETURNING {}
            "#,
            CURRENT_COLUMNS
        );

        let row: RecommendationRow = sqlx::query_as(&sql)
            .bind(uid)
            .bind(&input.recommendation_id)
            .bind(&input.tagline)
            .bind(&input.album_description)
            .bind(&input.why_for_user)
            .bind(&input.spotify_album_image_url)
            .bind(&input.spotify_album_id)
            .bind(&input.spotify_album_name)
            .bind(&input.spotify_artist_name)
            .bind(&input.spotify_artist_image_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn append_history_entry(
        &self,
        uid: &str,
        input: &RecommendationInput,
    ) -> AppResult<RecommendationHistoryEntry> {
        let id = Uuid::new_v4().to_string();
        let sql = format!(
            r#"
            INSERT INTO recommendation_history (
                user_id, id, tagline, album_description, why_for_user,
                spotify_album_image_url, spotify_album_id, spotify_album_name,
                spotify_artist_name, spotify_artist_image_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now())
            RETURNING {}
            "#,
            HISTORY_COLUMNS
        );

        let row: RecommendationRow = sqlx::query_as(&sql)
            .bind(uid)
            .bind(&id)
            .bind(&input.tagline)
            .bind(&input.album_description)
            .bind(&input.why_for_user)
            .bind(&input.spotify_album_image_url)
            .bind(&input.spotify_album_id)
            .bind(&input.spotify_album_name)
            .bind(&input.spotify_artist_name)
            .bind(&input.spotify_artist_image_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn list_history(&self, uid: &str) -> AppResult<Vec<RecommendationHistoryEntry>> {
        let sql = format!(
            "SELECT {} FROM recommendation_history WHERE user_id = $1 ORDER BY created_at DESC",
            HISTORY_COLUMNS
        );

        let rows: Vec<RecommendationRow> = sqlx::query_as(&sql)
            .bind(uid)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(RecommendationHistoryEntry::from).collect())
    }

    async fn get_history_entry(
        &self,
        uid: &str,
        recommendation_id: &str,
    ) -> AppResult<Option<RecommendationHistoryEntry>> {
        let sql = format!(
            "SELECT {} FROM recommendation_history WHERE user_id = $1 AND id = $2",
            HISTORY_COLUMNS
        );

        let row: Option<RecommendationRow> = sqlx::query_as(&sql)
            .bind(uid)
            .bind(recommendation_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(RecommendationHistoryEntry::from))
    }

    async fn delete_user_data(&self, uid: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for table in [
            "album_ratings",
            "user_goals",
            "current_recommendations",
            "recommendation_history",
        ] {
            let sql = format!("DELETE FROM {} WHERE user_id = $1", table);
            let result = sqlx::query(&sql).bind(uid).execute(&mut *tx).await?;
            tracing::debug!(table, rows = result.rows_affected(), "Deleted user rows");
        }

        tx.commit().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
