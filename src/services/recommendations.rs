use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{album_key, RecommendationInput},
    services::{
        agent::{prompt, BoomieAgent, GenerationContext},
        catalog::{verify_draft, CatalogProvider},
    },
    db::Store,
};

/// Runs the generate, verify, persist cycle for one user
pub struct RecommendationService {
    store: Arc<dyn Store>,
    agent: BoomieAgent,
    catalog: Arc<dyn CatalogProvider>,
    max_attempts: usize,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn Store>,
        agent: BoomieAgent,
        catalog: Arc<dyn CatalogProvider>,
        max_attempts: usize,
    ) -> Self {
        Self {
            store,
            agent,
            catalog,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Generates candidates until one is new to the user and exists in the
    /// catalog. Each rejected candidate is excluded from later attempts.
    #[instrument(skip(self, steering))]
    pub async fn generate_verified(
        &self,
        uid: &str,
        steering: Option<&str>,
    ) -> AppResult<RecommendationInput> {
        let ratings = self.store.list_ratings(uid).await?;
        let goals = self.store.get_goals(uid).await?;
        tracing::info!(ratings_count = ratings.len(), has_goals = goals.is_some(), "Ratings loaded");

        let rated: HashSet<String> = ratings.iter().map(|r| r.id.clone()).collect();

        let mut base_instructions = Vec::new();
        if let Some(steering) = steering.map(str::trim).filter(|s| !s.is_empty()) {
            base_instructions.push(prompt::steering_instruction(steering));
        }
        if ratings.is_empty() {
            tracing::info!("No ratings found, continuing with cold start");
            base_instructions.push(prompt::COLD_START_INSTRUCTION.to_string());
        }

        let mut rejections: Vec<String> = Vec::new();

        for attempt in 1..=self.max_attempts {
            let instructions: Vec<String> = base_instructions
                .iter()
                .chain(rejections.iter())
                .cloned()
                .collect();

            let draft = match self
                .agent
                .draft(GenerationContext {
                    ratings: &ratings,
                    goals: goals.as_ref(),
                    extra_instructions: &instructions,
                })
                .await
            {
                Ok(draft) => draft,
                Err(AppError::Generation(reason)) => {
                    tracing::warn!(attempt, reason = %reason, "Generation produced no usable draft");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let album = draft.recommended_album_name.trim();
            let artist = draft.recommended_artist_name.trim();

            if let Err(problem) = draft.validate() {
                tracing::warn!(attempt, problem = %problem, "Draft rejected");
                rejections.push(prompt::rejected_instruction(album, artist, &problem));
                continue;
            }

            if rated.contains(&album_key(album)) {
                tracing::warn!(attempt, album, "Draft repeats a rated album");
                rejections.push(prompt::rejected_instruction(
                    album,
                    artist,
                    "the user already rated it",
                ));
                continue;
            }

            match verify_draft(self.catalog.as_ref(), &draft).await? {
                Some(verified) => {
                    // The catalog's canonical name can differ from the draft's
                    if rated.contains(&album_key(&verified.album.name)) {
                        tracing::warn!(
                            attempt,
                            spotify_album_id = %verified.album.id,
                            "Verified album was already rated"
                        );
                        rejections.push(prompt::rejected_instruction(
                            album,
                            artist,
                            "the user already rated it",
                        ));
                        continue;
                    }

                    tracing::info!(
                        attempt,
                        spotify_album_id = %verified.album.id,
                        spotify_album_name = %verified.album.name,
                        "Recommendation verified"
                    );
                    return Ok(RecommendationInput::from_verified(
                        &draft,
                        &verified.album,
                        verified.artist_image_url,
                    ));
                }
                None => {
                    rejections.push(prompt::rejected_instruction(
                        album,
                        artist,
                        "it could not be found on Spotify",
                    ));
                }
            }
        }

        tracing::error!(attempts = self.max_attempts, "Spotify verification failed");
        Err(AppError::CatalogVerification)
    }

    /// Records a verified pick: history entry first, then the current pick
    /// pointing at it
    async fn persist(&self, uid: &str, input: RecommendationInput) -> AppResult<RecommendationInput> {
        let entry = self.store.append_history_entry(uid, &input).await?;
        let current = self
            .store
            .upsert_current_recommendation(uid, &input.with_recommendation_id(entry.id))
            .await?;

        tracing::info!(
            uid,
            recommendation_id = %current.recommendation.recommendation_id,
            spotify_album_id = %current.recommendation.spotify_album_id,
            "Recommendation persisted"
        );
        Ok(current.recommendation)
    }

    /// Serves the saved pick, generating one when the user has none
    #[instrument(skip(self))]
    pub async fn current_or_generate(&self, uid: &str) -> AppResult<RecommendationInput> {
        if let Some(saved) = self.store.get_current_recommendation(uid).await? {
            if saved.recommendation.recommendation_id.is_empty() {
                tracing::info!("Backfilling history for a saved recommendation");
                return self.persist(uid, saved.recommendation).await;
            }

            tracing::info!(
                spotify_album_id = %saved.recommendation.spotify_album_id,
                "Served saved recommendation"
            );
            return Ok(saved.recommendation);
        }

        let generated = self.generate_verified(uid, None).await?;
        self.persist(uid, generated).await
    }

    /// Always generates and persists a fresh pick
    #[instrument(skip(self, steering))]
    pub async fn generate_new(
        &self,
        uid: &str,
        steering: Option<&str>,
    ) -> AppResult<RecommendationInput> {
        let generated = self.generate_verified(uid, steering).await?;
        self.persist(uid, generated).await
    }
}
