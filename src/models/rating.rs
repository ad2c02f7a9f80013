use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

const MAX_ALBUM_NAME_LEN: usize = 200;
const MAX_RATING_NOTES_LEN: usize = 2000;

/// A user's reaction to an album
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlbumRatingId {
    Hated,
    Disliked,
    Neutral,
    Liked,
    Loved,
    DidNotListen,
}

impl AlbumRatingId {
    pub const ALL: [AlbumRatingId; 6] = [
        AlbumRatingId::Hated,
        AlbumRatingId::Disliked,
        AlbumRatingId::Neutral,
        AlbumRatingId::Liked,
        AlbumRatingId::Loved,
        AlbumRatingId::DidNotListen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumRatingId::Hated => "hated",
            AlbumRatingId::Disliked => "disliked",
            AlbumRatingId::Neutral => "neutral",
            AlbumRatingId::Liked => "liked",
            AlbumRatingId::Loved => "loved",
            AlbumRatingId::DidNotListen => "did-not-listen",
        }
    }
}

impl Display for AlbumRatingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlbumRatingId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|id| id.as_str()).collect();
                AppError::InvalidInput(format!("rating must be one of: {}", valid.join(", ")))
            })
    }
}

/// Raw rating body as posted by clients. Everything beyond the album name and
/// rating is optional and may arrive as a non-string, so fields stay loose
/// until [`RatingPayload::validate`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPayload {
    pub album_name: Option<serde_json::Value>,
    pub rating: Option<serde_json::Value>,
    pub notes: Option<serde_json::Value>,
    pub recommendation_id: Option<serde_json::Value>,
    pub spotify_album_id: Option<serde_json::Value>,
    pub spotify_album_image_url: Option<serde_json::Value>,
    pub spotify_artist_name: Option<serde_json::Value>,
    pub spotify_artist_image_url: Option<serde_json::Value>,
}

/// Validated rating ready to be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRatingInput {
    pub album_name: String,
    pub rating: AlbumRatingId,
    pub notes: String,
    pub recommendation_id: String,
    pub spotify_album_id: String,
    pub spotify_album_image_url: String,
    pub spotify_artist_name: String,
    pub spotify_artist_image_url: String,
}

/// A stored rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRating {
    pub id: String,
    pub album_name: String,
    pub rating: AlbumRatingId,
    pub notes: String,
    pub recommendation_id: String,
    pub spotify_album_id: String,
    pub spotify_album_image_url: String,
    pub spotify_artist_name: String,
    pub spotify_artist_image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a rating shown next to a recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub id: String,
    pub rating: AlbumRatingId,
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&AlbumRating> for RatingSummary {
    fn from(rating: &AlbumRating) -> Self {
        Self {
            id: rating.id.clone(),
            rating: rating.rating,
            notes: rating.notes.clone(),
            updated_at: rating.updated_at,
        }
    }
}

/// Derives the per-user storage key for an album.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, and trims leading/trailing dashes.
pub fn album_key(album_name: &str) -> String {
    let lowered = album_name.trim().to_lowercase();
    let mut key = String::with_capacity(lowered.len());
    let mut pending_dash = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !key.is_empty() {
                key.push('-');
            }
            pending_dash = false;
            key.push(c);
        } else {
            pending_dash = true;
        }
    }

    key
}

fn optional_string(value: Option<serde_json::Value>, field: &str) -> AppResult<String> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(AppError::InvalidInput(format!(
            "{} must be a string when provided",
            field
        ))),
    }
}

impl RatingPayload {
    /// Checks field types and bounds, trimming every string
    pub fn validate(self) -> AppResult<AlbumRatingInput> {
        let album_name = match self.album_name {
            Some(serde_json::Value::String(name))
                if !name.trim().is_empty() && name.chars().count() <= MAX_ALBUM_NAME_LEN =>
            {
                name.trim().to_string()
            }
            _ => {
                return Err(AppError::InvalidInput(format!(
                    "albumName must be a non-empty string up to {} characters",
                    MAX_ALBUM_NAME_LEN
                )))
            }
        };

        let rating = match self.rating {
            Some(serde_json::Value::String(rating)) => rating.parse::<AlbumRatingId>()?,
            _ => "".parse::<AlbumRatingId>()?,
        };

        let notes = optional_string(self.notes, "notes")?;
        if notes.chars().count() > MAX_RATING_NOTES_LEN {
            return Err(AppError::InvalidInput(format!(
                "notes must be {} characters or fewer",
                MAX_RATING_NOTES_LEN
            )));
        }

        Ok(AlbumRatingInput {
            album_name,
            rating,
            notes,
            recommendation_id: optional_string(self.recommendation_id, "recommendationId")?,
            spotify_album_id: optional_string(self.spotify_album_id, "spotifyAlbumId")?,
            spotify_album_image_url: optional_string(
                self.spotify_album_image_url,
                "spotifyAlbumImageUrl",
            )?,
            spotify_artist_name: optional_string(self.spotify_artist_name, "spotifyArtistName")?,
            spotify_artist_image_url: optional_string(
                self.spotify_artist_image_url,
                "spotifyArtistImageUrl",
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> RatingPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_album_key_collapses_punctuation() {
        assert_eq!(album_key("  OK Computer  "), "ok-computer");
        assert_eq!(album_key("Kid A!!"), "kid-a");
        assert_eq!(album_key("--In Rainbows (2007)--"), "in-rainbows-2007");
    }

    #[test]
    fn test_album_key_empty_for_symbols_only() {
        assert_eq!(album_key("???"), "");
        assert_eq!(album_key("   "), "");
    }

    #[test]
    fn test_rating_id_parse_and_display() {
        assert_eq!(
            "did-not-listen".parse::<AlbumRatingId>().unwrap(),
            AlbumRatingId::DidNotListen
        );
        assert_eq!(AlbumRatingId::Loved.to_string(), "loved");
        assert_eq!(
            serde_json::to_value(AlbumRatingId::DidNotListen).unwrap(),
            json!("did-not-listen")
        );
    }

    #[test]
    fn test_rating_id_unknown_lists_valid_values() {
        let err = "meh".parse::<AlbumRatingId>().unwrap_err();
        assert!(err.to_string().contains("hated, disliked, neutral"));
    }

    #[test]
    fn test_validate_trims_and_defaults() {
        let input = payload(json!({
            "albumName": "  Blonde ",
            "rating": "loved",
            "notes": "  great  "
        }))
        .validate()
        .unwrap();

        assert_eq!(input.album_name, "Blonde");
        assert_eq!(input.rating, AlbumRatingId::Loved);
        assert_eq!(input.notes, "great");
        assert_eq!(input.recommendation_id, "");
        assert_eq!(input.spotify_album_id, "");
    }

    #[test]
    fn test_validate_rejects_blank_album() {
        let err = payload(json!({ "albumName": "   ", "rating": "liked" }))
            .validate()
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_rejects_long_notes() {
        let err = payload(json!({
            "albumName": "Blonde",
            "rating": "liked",
            "notes": "x".repeat(2001)
        }))
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("2000"));
    }

    #[test]
    fn test_validate_rejects_non_string_optional() {
        let err = payload(json!({
            "albumName": "Blonde",
            "rating": "liked",
            "spotifyAlbumId": 42
        }))
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("spotifyAlbumId"));
    }
}
