use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    auth::AuthUser,
    error::AppResult,
    models::RatingPayload,
    routes::{parse_body, AppState},
};

pub async fn list(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
) -> AppResult<Json<Value>> {
    let ratings = state.store.list_ratings(&uid).await?;
    Ok(Json(json!({ "ratings": ratings })))
}

pub async fn upsert(
    State(state): State<AppState>,
    AuthUser(uid): AuthUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Value>)> {
    let input = parse_body::<RatingPayload>(&body)?.validate()?;
    tracing::info!(
        uid = %uid,
        album_name = %input.album_name,
        rating = %input.rating,
        recommendation_id = %input.recommendation_id,
        has_spotify_album_id = !input.spotify_album_id.is_empty(),
        notes_length = input.notes.chars().count(),
        "Rating payload validated"
    );

    let rating = state.store.upsert_rating(&uid, &input).await?;
    tracing::info!(uid = %uid, rating_id = %rating.id, "Rating persisted");

    Ok((StatusCode::CREATED, Json(json!({ "rating": rating }))))
}
