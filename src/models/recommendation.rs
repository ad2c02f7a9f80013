use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CatalogAlbum, RatingSummary};
use crate::error::{AppError, AppResult};

/// Field bounds the model's draft must satisfy
const MAX_NAME_LEN: usize = 200;
const MAX_TAGLINE_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 1200;
const MAX_WHY_LEN: usize = 500;

/// A verified recommendation, as written to the current pick and the history ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationInput {
    pub recommendation_id: String,
    pub tagline: String,
    pub album_description: String,
    pub why_for_user: String,
    pub spotify_album_image_url: String,
    pub spotify_album_id: String,
    pub spotify_album_name: String,
    pub spotify_artist_name: String,
    pub spotify_artist_image_url: String,
}

impl RecommendationInput {
    /// Combines the model's copy with the catalog's canonical album data
    pub fn from_verified(
        draft: &RecommendationDraft,
        album: &CatalogAlbum,
        artist_image_url: String,
    ) -> Self {
        Self {
            recommendation_id: String::new(),
            tagline: draft.tagline.clone(),
            album_description: draft.album_description.clone(),
            why_for_user: draft.why_for_user.clone(),
            spotify_album_image_url: album.image_url.clone(),
            spotify_album_id: album.id.clone(),
            spotify_album_name: album.name.clone(),
            spotify_artist_name: album.artist_name.clone(),
            spotify_artist_image_url: artist_image_url,
        }
    }

    pub fn with_recommendation_id(mut self, recommendation_id: String) -> Self {
        self.recommendation_id = recommendation_id;
        self
    }
}

/// The single mutable pick per user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentRecommendation {
    #[serde(flatten)]
    pub recommendation: RecommendationInput,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable ledger entry; `recommendation.recommendation_id == id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationHistoryEntry {
    pub id: String,
    #[serde(flatten)]
    pub recommendation: RecommendationInput,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A history entry paired with the user's rating of it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedHistoryEntry {
    #[serde(flatten)]
    pub entry: RecommendationHistoryEntry,
    pub rating: Option<RatingSummary>,
}

/// Optional steering sent with a request for a fresh pick
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    #[serde(default)]
    pub next_pick_steering: Option<serde_json::Value>,
}

impl RecommendationRequest {
    /// The trimmed steering text; `None` when absent, null or blank
    pub fn steering(&self) -> AppResult<Option<String>> {
        match &self.next_pick_steering {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => {
                let s = s.trim();
                Ok((!s.is_empty()).then(|| s.to_string()))
            }
            Some(_) => Err(AppError::InvalidInput(
                "nextPickSteering must be a string when provided".to_string(),
            )),
        }
    }
}

/// What the language model proposes before catalog verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationDraft {
    pub recommended_album_name: String,
    pub recommended_artist_name: String,
    #[serde(default)]
    pub spotify_album_id: Option<String>,
    pub tagline: String,
    pub album_description: String,
    pub why_for_user: String,
}

impl RecommendationDraft {
    /// Returns the first bound the draft violates, if any
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            ("recommendedAlbumName", &self.recommended_album_name, MAX_NAME_LEN),
            ("recommendedArtistName", &self.recommended_artist_name, MAX_NAME_LEN),
            ("tagline", &self.tagline, MAX_TAGLINE_LEN),
            ("albumDescription", &self.album_description, MAX_DESCRIPTION_LEN),
            ("whyForUser", &self.why_for_user, MAX_WHY_LEN),
        ];

        for (field, value, max) in checks {
            let len = value.trim().chars().count();
            if len == 0 || len > max {
                return Err(format!("{} must be 1-{} characters", field, max));
            }
        }

        Ok(())
    }

    /// The catalog id the model claims, if it gave a usable one
    pub fn claimed_album_id(&self) -> Option<&str> {
        self.spotify_album_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}
